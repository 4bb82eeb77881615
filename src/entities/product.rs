use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Product listing owned by exactly one farmer
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Primary key, time-ordered (UUID v7)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning farmer
    pub farmer_id: Uuid,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: String,

    pub category: Option<String>,

    #[validate(custom = "validate_non_negative")]
    pub price: Decimal,

    #[validate(custom = "validate_non_negative")]
    pub quantity: Decimal,

    pub location: Option<String>,

    /// Case-folded `location`, matched by catalog location searches
    #[serde(skip)]
    pub location_key: Option<String>,

    /// Primary image artifact reference
    pub image: String,

    pub harvest_date: Option<NaiveDate>,

    /// Moisture, percent
    pub moisture: Option<Decimal>,

    /// Protein, percent
    pub protein: Option<Decimal>,

    /// Pesticide residue, ppm. Zero is a real reading.
    pub pesticide_residue: Option<Decimal>,

    pub soil_ph: Option<Decimal>,

    /// Lab report artifact reference
    pub lab_report: Option<String>,

    /// Authenticity QR artifact reference; `None` until the QR is bound
    pub qr_path: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::farmer::Entity",
        from = "Column::FarmerId",
        to = "super::farmer::Column::Id"
    )]
    Farmer,
    #[sea_orm(has_many = "super::product_preference::Entity")]
    Preferences,
}

impl Related<super::farmer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Farmer.def()
    }
}

impl Related<super::product_preference::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Preferences.def()
    }
}

/// Folds a location for case-insensitive matching. Full Unicode lowercasing,
/// applied identically to stored values and search input.
pub fn location_search_key(location: &str) -> String {
    location.to_lowercase()
}

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("non_negative"));
    }
    Ok(())
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            active_model.created_at = Set(Utc::now());
        }
        active_model.updated_at = Set(Some(Utc::now()));

        // Partial updates leave columns NotSet; only validate full models.
        if let Ok(model) = Model::try_from(active_model.clone()) {
            if let Err(err) = model.validate() {
                return Err(DbErr::Custom(format!("Validation error: {}", err)));
            }
        }

        Ok(active_model)
    }
}
