//! Binds a product to its authenticity QR code.
//!
//! The QR encodes the public verification URL of the product. Binding runs
//! after the product row exists: the SVG artifact is written first, then the
//! product's `qr_path`. Either step failing leaves `qr_path` unset, which is
//! how callers recognise a product that is not yet verifiable.

use chrono::Utc;
use metrics::counter;
use qrcode::{render::svg, EcLevel, QrCode};
use sea_orm::{
    sea_query::Expr, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    entities::product,
    errors::ServiceError,
    storage::{ArtifactStore, StorageError},
};

/// Canonical verification URL for a product. A single trailing `/` on the
/// base URL is dropped so both `https://x` and `https://x/` give the same URL.
pub fn verification_url(base_url: &str, product_id: Uuid) -> String {
    let base = base_url.strip_suffix('/').unwrap_or(base_url);
    format!("{}/product/{}/view", base, product_id)
}

/// Storage key of a product's QR artifact.
pub fn qr_artifact_key(product_id: Uuid) -> String {
    format!("qrs/{}-authQR.svg", product_id)
}

/// Renders `data` as an SVG QR code with medium error correction.
pub fn render_qr_svg(data: &str) -> Result<String, QrBindError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)
        .map_err(|e| QrBindError::Render(e.to_string()))?;
    Ok(code
        .render()
        .min_dimensions(256, 256)
        .quiet_zone(true)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

#[derive(Debug, Error)]
pub enum QrBindError {
    #[error("Product {0} not found")]
    ProductNotFound(Uuid),

    #[error("QR rendering failed: {0}")]
    Render(String),

    #[error("QR artifact write failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Recording qr_path failed: {0}")]
    Database(#[from] DbErr),
}

impl From<QrBindError> for ServiceError {
    fn from(err: QrBindError) -> Self {
        match err {
            QrBindError::ProductNotFound(id) => {
                ServiceError::NotFound(format!("Product {} not found", id))
            }
            QrBindError::Render(msg) => ServiceError::InternalError(msg),
            QrBindError::Storage(e) => ServiceError::StorageError(e),
            QrBindError::Database(e) => ServiceError::DatabaseError(e),
        }
    }
}

#[derive(Clone)]
pub struct QrBinder {
    config: Arc<AppConfig>,
    store: Arc<dyn ArtifactStore>,
    db: Arc<DatabaseConnection>,
}

impl QrBinder {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn ArtifactStore>,
        db: Arc<DatabaseConnection>,
    ) -> Self {
        Self { config, store, db }
    }

    pub fn verification_url(&self, product_id: Uuid) -> String {
        verification_url(self.config.base_url(), product_id)
    }

    /// Writes the QR artifact for `product_id` and records its public
    /// reference on that product. Safe to repeat: the artifact is
    /// overwritten in place and `qr_path` is set to the same value.
    #[instrument(skip(self))]
    pub async fn bind(&self, product_id: Uuid) -> Result<String, QrBindError> {
        let result = self.try_bind(product_id).await;
        match &result {
            Ok(qr_path) => {
                counter!("agridirect_qr.bind.success", 1);
                info!(%product_id, %qr_path, "QR bound");
            }
            Err(e) => {
                counter!("agridirect_qr.bind.failure", 1);
                warn!(%product_id, error = %e, "QR bind failed");
            }
        }
        result
    }

    async fn try_bind(&self, product_id: Uuid) -> Result<String, QrBindError> {
        let exists = product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .is_some();
        if !exists {
            return Err(QrBindError::ProductNotFound(product_id));
        }

        let svg = render_qr_svg(&self.verification_url(product_id))?;
        let key = qr_artifact_key(product_id);
        let qr_path = self.store.put(&key, svg.as_bytes()).await?;

        let recorded = product::Entity::update_many()
            .col_expr(product::Column::QrPath, Expr::value(qr_path.clone()))
            .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product::Column::Id.eq(product_id))
            .exec(&*self.db)
            .await?;

        // Product deleted after the existence check.
        if recorded.rows_affected == 0 {
            if let Err(e) = self.store.delete(&key).await {
                warn!(%product_id, error = %e, "failed to remove QR artifact of vanished product");
            }
            return Err(QrBindError::ProductNotFound(product_id));
        }

        Ok(qr_path)
    }
}
