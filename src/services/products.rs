use crate::{
    entities::{farmer, product, product_preference},
    errors::ServiceError,
    events::{Event, EventSender},
    identifiers,
    services::qr_binder::{qr_artifact_key, QrBinder},
    storage::{discard_uploads, store_upload, ArtifactStore, StoredUpload, UploadedArtifact},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Attributes supplied when a farmer lists a product
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct NewProduct {
    pub name: String,
    pub category: Option<String>,
    #[serde(default)]
    pub preferences: Vec<String>,
    pub price: Decimal,
    pub quantity: Decimal,
    pub location: Option<String>,
    pub harvest_date: Option<NaiveDate>,
    pub moisture: Option<Decimal>,
    pub protein: Option<Decimal>,
    pub pesticide_residue: Option<Decimal>,
    pub soil_ph: Option<Decimal>,
}

/// Editable listing attributes; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub location: Option<String>,
}

impl ProductChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.quantity.is_none()
            && self.location.is_none()
    }
}

/// Product as returned by the API, with its preference tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductDetail {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub preferences: Vec<String>,
    pub price: Decimal,
    pub quantity: Decimal,
    pub location: Option<String>,
    pub image: String,
    pub harvest_date: Option<NaiveDate>,
    pub moisture: Option<Decimal>,
    pub protein: Option<Decimal>,
    pub pesticide_residue: Option<Decimal>,
    pub soil_ph: Option<Decimal>,
    pub lab_report: Option<String>,
    pub qr_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductDetail {
    pub fn from_model(model: product::Model, mut preferences: Vec<String>) -> Self {
        preferences.sort();
        Self {
            id: model.id,
            farmer_id: model.farmer_id,
            name: model.name,
            category: model.category,
            preferences,
            price: model.price,
            quantity: model.quantity,
            location: model.location,
            image: model.image,
            harvest_date: model.harvest_date,
            moisture: model.moisture,
            protein: model.protein,
            pesticide_residue: model.pesticide_residue,
            soil_ph: model.soil_ph,
            lab_report: model.lab_report,
            qr_path: model.qr_path,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Outcome of listing a product. `qr_pending` means the product exists but
/// its authenticity QR could not be bound yet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductCreation {
    pub product: ProductDetail,
    pub qr_pending: bool,
    pub message: String,
}

/// Trims tags, drops blanks and duplicates, keeps first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

fn ensure_non_negative(field: &str, value: Decimal) -> Result<(), ServiceError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ServiceError::ValidationError(format!(
            "{} must be non-negative",
            field
        )));
    }
    Ok(())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Loads preference tags for a set of products in one query.
pub(crate) async fn load_preferences(
    db: &DatabaseConnection,
    product_ids: &[Uuid],
) -> Result<BTreeMap<Uuid, Vec<String>>, ServiceError> {
    let mut by_product: BTreeMap<Uuid, Vec<String>> = BTreeMap::new();
    if product_ids.is_empty() {
        return Ok(by_product);
    }

    let rows = product_preference::Entity::find()
        .filter(product_preference::Column::ProductId.is_in(product_ids.iter().copied()))
        .order_by_asc(product_preference::Column::Tag)
        .all(db)
        .await?;
    for row in rows {
        by_product.entry(row.product_id).or_default().push(row.tag);
    }
    Ok(by_product)
}

/// Product listing lifecycle: create (with QR binding), read, update, delete.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    store: Arc<dyn ArtifactStore>,
    qr_binder: Arc<QrBinder>,
}

impl ProductService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        store: Arc<dyn ArtifactStore>,
        qr_binder: Arc<QrBinder>,
    ) -> Self {
        Self {
            db,
            event_sender,
            store,
            qr_binder,
        }
    }

    /// Lists a product for `farmer_id`, then binds its authenticity QR.
    ///
    /// A failed bind does not undo the listing; the result reports
    /// `qr_pending: true` and the product keeps `qr_path = None`.
    #[instrument(skip(self, input, image, lab_report))]
    pub async fn create_product(
        &self,
        farmer_id: Uuid,
        input: NewProduct,
        image: Option<UploadedArtifact>,
        lab_report: Option<UploadedArtifact>,
    ) -> Result<ProductCreation, ServiceError> {
        let owner = farmer::Entity::find_by_id(farmer_id).one(&*self.db).await?;
        if owner.is_none() {
            return Err(ServiceError::InvalidOwner(farmer_id.to_string()));
        }

        let image = image
            .filter(|upload| !upload.bytes.is_empty())
            .ok_or(ServiceError::MissingImage)?;

        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "Product name is required".to_string(),
            ));
        }
        ensure_non_negative("price", input.price)?;
        ensure_non_negative("quantity", input.quantity)?;

        let mut stored = vec![store_upload(self.store.as_ref(), &image).await?];
        if let Some(upload) = lab_report.filter(|upload| !upload.bytes.is_empty()) {
            match store_upload(self.store.as_ref(), &upload).await {
                Ok(report) => stored.push(report),
                Err(e) => {
                    discard_uploads(self.store.as_ref(), &stored).await;
                    return Err(e.into());
                }
            }
        }

        let product_id = identifiers::generate();
        let tags = normalize_tags(&input.preferences);
        let location = normalize_optional(input.location);
        let listing = product::ActiveModel {
            id: Set(product_id),
            farmer_id: Set(farmer_id),
            name: Set(name),
            category: Set(normalize_optional(input.category)),
            price: Set(input.price),
            quantity: Set(input.quantity),
            location_key: Set(location.as_deref().map(product::location_search_key)),
            location: Set(location),
            image: Set(stored[0].reference.clone()),
            harvest_date: Set(input.harvest_date),
            moisture: Set(input.moisture),
            protein: Set(input.protein),
            pesticide_residue: Set(input.pesticide_residue),
            soil_ph: Set(input.soil_ph),
            lab_report: Set(stored.get(1).map(|report| report.reference.clone())),
            qr_path: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let model = match self.insert_listing(listing, &tags).await {
            Ok(model) => model,
            Err(e) => {
                discard_uploads(self.store.as_ref(), &stored).await;
                return Err(e);
            }
        };

        self.event_sender
            .send_or_log(Event::ProductCreated(product_id))
            .await;
        info!("Created product: {}", product_id);

        let mut detail = ProductDetail::from_model(model, tags);
        let (qr_pending, message) = match self.qr_binder.bind(product_id).await {
            Ok(qr_path) => {
                detail.qr_path = Some(qr_path.clone());
                self.event_sender
                    .send_or_log(Event::ProductQrBound {
                        product_id,
                        qr_path,
                    })
                    .await;
                (false, "Product added successfully with QR".to_string())
            }
            Err(e) => {
                warn!(%product_id, error = %e, "product listed without authenticity QR");
                self.event_sender
                    .send_or_log(Event::ProductQrPending {
                        product_id,
                        reason: e.to_string(),
                    })
                    .await;
                (
                    true,
                    "Product added, but its authenticity QR is pending".to_string(),
                )
            }
        };

        Ok(ProductCreation {
            product: detail,
            qr_pending,
            message,
        })
    }

    /// Get a product by ID
    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductDetail, ServiceError> {
        let model = self.find_model(product_id).await?;
        let mut tags = load_preferences(&self.db, &[product_id]).await?;
        Ok(ProductDetail::from_model(
            model,
            tags.remove(&product_id).unwrap_or_default(),
        ))
    }

    /// Products owned by a farmer, oldest first
    #[instrument(skip(self))]
    pub async fn list_by_farmer(&self, farmer_id: Uuid) -> Result<Vec<ProductDetail>, ServiceError> {
        let models = product::Entity::find()
            .filter(product::Column::FarmerId.eq(farmer_id))
            .order_by_asc(product::Column::Id)
            .all(&*self.db)
            .await?;

        let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let mut tags = load_preferences(&self.db, &ids).await?;
        Ok(models
            .into_iter()
            .map(|m| {
                let product_tags = tags.remove(&m.id).unwrap_or_default();
                ProductDetail::from_model(m, product_tags)
            })
            .collect())
    }

    /// Updates listing attributes and optionally replaces the image.
    /// The QR code is left untouched: it encodes the identifier, not the attributes.
    #[instrument(skip(self, changes, image))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        changes: ProductChanges,
        image: Option<UploadedArtifact>,
    ) -> Result<ProductDetail, ServiceError> {
        let existing = self.find_model(product_id).await?;

        if let Some(price) = changes.price {
            ensure_non_negative("price", price)?;
        }
        if let Some(quantity) = changes.quantity {
            ensure_non_negative("quantity", quantity)?;
        }

        let image = image.filter(|upload| !upload.bytes.is_empty());
        if changes.is_empty() && image.is_none() {
            return self.get_product(product_id).await;
        }

        let mut active: product::ActiveModel = existing.into();
        if let Some(name) = changes.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ServiceError::ValidationError(
                    "Product name is required".to_string(),
                ));
            }
            active.name = Set(name);
        }
        if let Some(category) = changes.category {
            active.category = Set(normalize_optional(Some(category)));
        }
        if let Some(price) = changes.price {
            active.price = Set(price);
        }
        if let Some(quantity) = changes.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(location) = changes.location {
            let location = normalize_optional(Some(location));
            active.location_key = Set(location.as_deref().map(product::location_search_key));
            active.location = Set(location);
        }
        let mut stored: Vec<StoredUpload> = Vec::new();
        if let Some(upload) = image {
            let replacement = store_upload(self.store.as_ref(), &upload).await?;
            active.image = Set(replacement.reference.clone());
            stored.push(replacement);
        }

        if let Err(e) = active.update(&*self.db).await {
            discard_uploads(self.store.as_ref(), &stored).await;
            return Err(e.into());
        }

        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;
        info!("Updated product: {}", product_id);

        self.get_product(product_id).await
    }

    /// Deletes a product and its tags. Orders keep their snapshot.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let existing = self.find_model(product_id).await?;

        let txn = self.db.begin().await?;
        product_preference::Entity::delete_many()
            .filter(product_preference::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?;
        product::Entity::delete_by_id(product_id).exec(&txn).await?;
        txn.commit().await?;

        if existing.qr_path.is_some() {
            if let Err(e) = self.store.delete(&qr_artifact_key(product_id)).await {
                warn!(%product_id, error = %e, "failed to remove QR artifact of deleted product");
            }
        }

        self.event_sender
            .send_or_log(Event::ProductDeleted(product_id))
            .await;
        info!("Deleted product: {}", product_id);
        Ok(())
    }

    /// Public reference of the product's authenticity QR
    #[instrument(skip(self))]
    pub async fn qr_artifact(&self, product_id: Uuid) -> Result<String, ServiceError> {
        self.find_model(product_id)
            .await?
            .qr_path
            .ok_or_else(|| ServiceError::NotFound(format!("QR for product {} not found", product_id)))
    }

    /// Inserts the product row and its preference tags in one transaction.
    async fn insert_listing(
        &self,
        listing: product::ActiveModel,
        tags: &[String],
    ) -> Result<product::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let model = listing.insert(&txn).await?;

        if !tags.is_empty() {
            let rows = tags.iter().map(|tag| product_preference::ActiveModel {
                product_id: Set(model.id),
                tag: Set(tag.clone()),
            });
            product_preference::Entity::insert_many(rows)
                .exec_without_returning(&txn)
                .await?;
        }
        txn.commit().await?;
        Ok(model)
    }

    async fn find_model(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }
}
