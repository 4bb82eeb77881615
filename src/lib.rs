//! AgriDirect API Library
//!
//! Farm-to-consumer marketplace backend: farmer and consumer accounts,
//! product listings bound to authenticity QR codes, public certificate
//! pages, a filterable catalog and order placement.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod identifiers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod storage;
pub mod tracing;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<config::AppConfig>,
    pub event_sender: Arc<events::EventSender>,
    pub store: Arc<dyn storage::ArtifactStore>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<config::AppConfig>,
        event_sender: Arc<events::EventSender>,
        store: Arc<dyn storage::ArtifactStore>,
    ) -> Self {
        let services = handlers::AppServices::new(
            db.clone(),
            config.clone(),
            event_sender.clone(),
            store.clone(),
        );
        Self {
            db,
            config,
            event_sender,
            store,
            services,
        }
    }
}

pub fn api_v1_routes() -> Router<AppState> {
    let farmers = Router::new()
        .route(
            "/farmers/register",
            post(handlers::farmers::register_farmer),
        )
        .route("/farmers/login", post(handlers::farmers::login_farmer))
        .route("/farmers/:id/qr", get(handlers::farmers::farmer_qr))
        .route(
            "/farmers/:id/products",
            get(handlers::farmers::farmer_products).post(handlers::products::create_product),
        )
        .route("/farmers/:id/orders", get(handlers::farmers::farmer_orders));

    let products = Router::new()
        .route("/products", get(handlers::products::search_products))
        .route(
            "/products/:id",
            put(handlers::products::update_product).delete(handlers::products::delete_product),
        )
        .route("/products/:id/qr", get(handlers::products::product_qr));

    let consumers = Router::new()
        .route(
            "/consumers/check-email",
            post(handlers::consumers::check_email),
        )
        .route(
            "/consumers/register",
            post(handlers::consumers::register_consumer),
        )
        .route("/consumers/login", post(handlers::consumers::login_consumer));

    let orders = Router::new().route(
        "/orders",
        get(handlers::orders::list_orders).post(handlers::orders::place_order),
    );

    Router::new()
        .merge(farmers)
        .merge(products)
        .merge(consumers)
        .merge(orders)
}

/// CORS from configuration: explicit origins win, otherwise permissive
/// only where the configuration allows it.
pub fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.should_allow_permissive_cors() {
        ::tracing::info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

/// Full application router: JSON API, certificate pages, uploaded
/// artifacts, health and API docs.
pub fn app_router(state: AppState) -> Router {
    let upload_dir = state.config.upload_dir.clone();
    let body_limit = state.config.max_upload_bytes;
    let cors = cors_layer(&state.config);

    Router::<AppState>::new()
        .route("/", get(|| async { "agridirect-api up" }))
        .nest("/api/v1", api_v1_routes())
        .route(
            "/product/:id/view",
            get(handlers::certificates::view_certificate),
        )
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .merge(health::health_routes(state.db.clone()))
        .merge(openapi::swagger_ui())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(crate::tracing::configure_http_tracing())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors)
        .layer(axum::middleware::from_fn(
            crate::tracing::request_id_middleware,
        ))
        .with_state(state)
}
