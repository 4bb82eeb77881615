use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable order snapshot. Consumer and product fields are copied at
/// order time and never resynchronized with their sources.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub product_id: Uuid,
    pub farmer_id: Uuid,
    pub consumer_id: Uuid,

    pub consumer_name: String,
    pub consumer_email: String,
    pub consumer_mobile: String,

    pub product_name: String,
    pub unit_price: Decimal,

    pub quantity: Decimal,
    pub total_price: Decimal,

    pub address: String,
    pub payment_method: String,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
