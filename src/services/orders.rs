use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{consumer, order, product},
    errors::ServiceError,
    events::{Event, EventSender},
    identifiers,
};

/// Checkout request. Product name and unit price are only used when the
/// product no longer resolves; otherwise the listing's values are captured.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PlaceOrder {
    pub product_id: Uuid,
    pub farmer_id: Uuid,
    pub consumer_id: Uuid,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    pub quantity: Decimal,
    #[serde(default)]
    pub total_price: Option<Decimal>,
    pub address: String,
    pub payment_method: String,
}

/// Order as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderView {
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

impl From<order::Model> for OrderView {
    fn from(model: order::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            farmer_id: model.farmer_id,
            consumer_id: model.consumer_id,
            consumer_name: model.consumer_name,
            consumer_email: model.consumer_email,
            consumer_mobile: model.consumer_mobile,
            product_name: model.product_name,
            unit_price: model.unit_price,
            quantity: model.quantity,
            total_price: model.total_price,
            address: model.address,
            payment_method: model.payment_method,
            created_at: model.created_at,
        }
    }
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Records an order with consumer and product snapshots taken now.
    #[instrument(skip(self, input), fields(product_id = %input.product_id))]
    pub async fn place_order(&self, input: PlaceOrder) -> Result<OrderView, ServiceError> {
        if input.quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "quantity must be greater than zero".to_string(),
            ));
        }
        if input.address.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "address is required".to_string(),
            ));
        }
        if input.payment_method.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "payment_method is required".to_string(),
            ));
        }

        let consumer = consumer::Entity::find_by_id(input.consumer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::ValidationError("Invalid consumer".to_string()))?;

        let listing = product::Entity::find_by_id(input.product_id)
            .one(&*self.db)
            .await?;
        let (product_name, unit_price, farmer_id) = match listing {
            Some(p) => (p.name, p.price, p.farmer_id),
            None => {
                let name = input
                    .product_name
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| {
                        ServiceError::ValidationError("product_name is required".to_string())
                    })?;
                let price = input.unit_price.ok_or_else(|| {
                    ServiceError::ValidationError("unit_price is required".to_string())
                })?;
                (name, price, input.farmer_id)
            }
        };
        if unit_price.is_sign_negative() && !unit_price.is_zero() {
            return Err(ServiceError::ValidationError(
                "unit_price must be non-negative".to_string(),
            ));
        }

        let total_price = input
            .total_price
            .unwrap_or_else(|| unit_price * input.quantity);

        let model = order::ActiveModel {
            id: Set(identifiers::generate()),
            product_id: Set(input.product_id),
            farmer_id: Set(farmer_id),
            consumer_id: Set(consumer.id),
            consumer_name: Set(consumer.name),
            consumer_email: Set(consumer.email),
            consumer_mobile: Set(consumer.mobile),
            product_name: Set(product_name),
            unit_price: Set(unit_price),
            quantity: Set(input.quantity),
            total_price: Set(total_price),
            address: Set(input.address.trim().to_string()),
            payment_method: Set(input.payment_method.trim().to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::OrderPlaced {
                order_id: model.id,
                product_id: model.product_id,
                farmer_id: model.farmer_id,
            })
            .await;
        info!("Placed order: {}", model.id);
        Ok(model.into())
    }

    #[instrument(skip(self))]
    pub async fn list_for_consumer(&self, consumer_id: Uuid) -> Result<Vec<OrderView>, ServiceError> {
        Ok(order::Entity::find()
            .filter(order::Column::ConsumerId.eq(consumer_id))
            .order_by_desc(order::Column::Id)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(OrderView::from)
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn list_for_farmer(&self, farmer_id: Uuid) -> Result<Vec<OrderView>, ServiceError> {
        Ok(order::Entity::find()
            .filter(order::Column::FarmerId.eq(farmer_id))
            .order_by_desc(order::Column::Id)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(OrderView::from)
            .collect())
    }
}
