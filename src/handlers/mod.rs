pub mod certificates;
pub mod common;
pub mod consumers;
pub mod farmers;
pub mod orders;
pub mod products;

use crate::{
    config::AppConfig,
    events::EventSender,
    services::{
        accounts::AccountService, catalog::CatalogService, certificate::CertificateRenderer,
        orders::OrderService, products::ProductService, qr_binder::QrBinder,
    },
    storage::ArtifactStore,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<AccountService>,
    pub products: Arc<ProductService>,
    pub catalog: Arc<CatalogService>,
    pub orders: Arc<OrderService>,
    pub certificates: Arc<CertificateRenderer>,
    pub qr_binder: Arc<QrBinder>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<AppConfig>,
        event_sender: Arc<EventSender>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        let qr_binder = Arc::new(QrBinder::new(config.clone(), store.clone(), db.clone()));
        let accounts = Arc::new(AccountService::new(
            db.clone(),
            event_sender.clone(),
            store.clone(),
        ));
        let products = Arc::new(ProductService::new(
            db.clone(),
            event_sender.clone(),
            store,
            qr_binder.clone(),
        ));
        let catalog = Arc::new(CatalogService::new(db.clone()));
        let orders = Arc::new(OrderService::new(db.clone(), event_sender));
        let certificates = Arc::new(CertificateRenderer::new(config, db));

        Self {
            accounts,
            products,
            catalog,
            orders,
            certificates,
            qr_binder,
        }
    }
}
