use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241001_000001_create_farmers_table::Migration),
            Box::new(m20241001_000002_create_consumers_table::Migration),
            Box::new(m20241001_000003_create_products_table::Migration),
            Box::new(m20241001_000004_create_product_preferences_table::Migration),
            Box::new(m20241001_000005_create_orders_table::Migration),
        ]
    }
}

// Migration implementations

mod m20241001_000001_create_farmers_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241001_000001_create_farmers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Farmers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Farmers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Farmers::Name).string_len(255).not_null())
                        .col(ColumnDef::new(Farmers::FarmName).string_len(255).not_null())
                        .col(ColumnDef::new(Farmers::Location).string_len(255).not_null())
                        .col(ColumnDef::new(Farmers::Mobile).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Farmers::Experience)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Farmers::Email)
                                .string_len(255)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Farmers::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Farmers::Certificate).string_len(1024).null())
                        .col(ColumnDef::new(Farmers::QrCode).string_len(1024).null())
                        .col(ColumnDef::new(Farmers::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Farmers::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Farmers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Farmers {
        Table,
        Id,
        Name,
        FarmName,
        Location,
        Mobile,
        Experience,
        Email,
        PasswordHash,
        Certificate,
        QrCode,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20241001_000002_create_consumers_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241001_000002_create_consumers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Consumers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Consumers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Consumers::Name).string_len(255).not_null())
                        .col(
                            ColumnDef::new(Consumers::Email)
                                .string_len(255)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Consumers::Mobile).string_len(32).not_null())
                        .col(ColumnDef::new(Consumers::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Consumers::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Consumers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Consumers {
        Table,
        Id,
        Name,
        Email,
        Mobile,
        PasswordHash,
        CreatedAt,
    }
}

mod m20241001_000003_create_products_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241001_000003_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // No foreign key to farmers: the certificate page must tolerate a
            // dangling owner reference instead of failing.
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::FarmerId).uuid().not_null())
                        .col(ColumnDef::new(Products::Name).string_len(255).not_null())
                        .col(ColumnDef::new(Products::Category).string_len(255).null())
                        .col(
                            ColumnDef::new(Products::Price)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::Quantity)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::Location).string_len(255).null())
                        .col(ColumnDef::new(Products::LocationKey).string_len(255).null())
                        .col(ColumnDef::new(Products::Image).string_len(1024).not_null())
                        .col(ColumnDef::new(Products::HarvestDate).date().null())
                        .col(ColumnDef::new(Products::Moisture).decimal_len(16, 4).null())
                        .col(ColumnDef::new(Products::Protein).decimal_len(16, 4).null())
                        .col(
                            ColumnDef::new(Products::PesticideResidue)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(ColumnDef::new(Products::SoilPh).decimal_len(16, 4).null())
                        .col(ColumnDef::new(Products::LabReport).string_len(1024).null())
                        .col(ColumnDef::new(Products::QrPath).string_len(1024).null())
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_farmer_id")
                        .table(Products::Table)
                        .col(Products::FarmerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_category")
                        .table(Products::Table)
                        .col(Products::Category)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_price")
                        .table(Products::Table)
                        .col(Products::Price)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        FarmerId,
        Name,
        Category,
        Price,
        Quantity,
        Location,
        LocationKey,
        Image,
        HarvestDate,
        Moisture,
        Protein,
        PesticideResidue,
        SoilPh,
        LabReport,
        QrPath,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20241001_000004_create_product_preferences_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241001_000004_create_product_preferences_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductPreferences::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductPreferences::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductPreferences::Tag)
                                .string_len(100)
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(ProductPreferences::ProductId)
                                .col(ProductPreferences::Tag),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_preferences_product")
                                .from(ProductPreferences::Table, ProductPreferences::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_preferences_tag")
                        .table(ProductPreferences::Table)
                        .col(ProductPreferences::Tag)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductPreferences::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ProductPreferences {
        Table,
        ProductId,
        Tag,
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
    }
}

mod m20241001_000005_create_orders_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241001_000005_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Orders are historical facts; no foreign keys so deleting a
            // product never touches its orders.
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::ProductId).uuid().not_null())
                        .col(ColumnDef::new(Orders::FarmerId).uuid().not_null())
                        .col(ColumnDef::new(Orders::ConsumerId).uuid().not_null())
                        .col(ColumnDef::new(Orders::ConsumerName).string_len(255).not_null())
                        .col(ColumnDef::new(Orders::ConsumerEmail).string_len(255).not_null())
                        .col(ColumnDef::new(Orders::ConsumerMobile).string_len(32).not_null())
                        .col(ColumnDef::new(Orders::ProductName).string_len(255).not_null())
                        .col(ColumnDef::new(Orders::UnitPrice).decimal_len(16, 4).not_null())
                        .col(ColumnDef::new(Orders::Quantity).decimal_len(16, 4).not_null())
                        .col(ColumnDef::new(Orders::TotalPrice).decimal_len(16, 4).not_null())
                        .col(ColumnDef::new(Orders::Address).text().not_null())
                        .col(ColumnDef::new(Orders::PaymentMethod).string_len(64).not_null())
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_consumer_id")
                        .table(Orders::Table)
                        .col(Orders::ConsumerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_farmer_id")
                        .table(Orders::Table)
                        .col(Orders::FarmerId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        ProductId,
        FarmerId,
        ConsumerId,
        ConsumerName,
        ConsumerEmail,
        ConsumerMobile,
        ProductName,
        UnitPrice,
        Quantity,
        TotalPrice,
        Address,
        PaymentMethod,
        CreatedAt,
    }
}
