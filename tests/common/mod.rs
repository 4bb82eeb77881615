#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agridirect_api::{
    app_router,
    config::AppConfig,
    db,
    events::{self, EventSender},
    services::{
        accounts::{ConsumerProfile, ConsumerRegistration, FarmerProfile, FarmerRegistration},
        products::{NewProduct, ProductCreation},
    },
    storage::{ArtifactStore, LocalArtifactStore, UploadedArtifact},
    AppState,
};
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const BASE_URL: &str = "http://agri.test";
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-image";

/// Helper harness: a fresh SQLite file and upload directory per test.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(None).await
    }

    /// Same as [`TestApp::new`] but with a caller-supplied artifact store.
    pub async fn with_store(store: Arc<dyn ArtifactStore>) -> Self {
        Self::build(Some(store)).await
    }

    async fn build(store: Option<Arc<dyn ArtifactStore>>) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("agridirect_test.db");
        let upload_dir = dir.path().join("uploads");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            format!("{}/", BASE_URL),
            upload_dir.display().to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let store = match store {
            Some(store) => store,
            None => Arc::new(
                LocalArtifactStore::new(&upload_dir)
                    .await
                    .expect("create upload dir"),
            ),
        };

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), Arc::new(cfg), event_sender, store);
        let router = app_router(state.clone());

        Self {
            router,
            state,
            dir,
            _event_task: event_task,
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    /// Send a request with an optional JSON body.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.send(request).await
    }

    pub async fn multipart(&self, method: Method, uri: &str, form: MultipartBody) -> Response {
        let (content_type, bytes) = form.finish();
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", content_type)
            .body(Body::from(bytes))
            .expect("failed to build request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn seed_farmer(&self, email: &str) -> FarmerProfile {
        self.state
            .services
            .accounts
            .register_farmer(
                FarmerRegistration {
                    name: "Asha Patil".to_string(),
                    farm_name: "Green Acres".to_string(),
                    location: "Nashik".to_string(),
                    mobile: "9000000000".to_string(),
                    experience: 12,
                    email: email.to_string(),
                    password: "harvest-2024".to_string(),
                },
                None,
                None,
            )
            .await
            .expect("seed farmer for tests")
    }

    pub async fn seed_consumer(&self, email: &str) -> ConsumerProfile {
        self.state
            .services
            .accounts
            .register_consumer(ConsumerRegistration {
                name: "Ravi Kumar".to_string(),
                email: email.to_string(),
                mobile: "9111111111".to_string(),
                password: "basket-99".to_string(),
            })
            .await
            .expect("seed consumer for tests")
    }

    pub async fn seed_product(&self, farmer_id: Uuid, input: NewProduct) -> ProductCreation {
        self.state
            .services
            .products
            .create_product(farmer_id, input, Some(image_upload()), None)
            .await
            .expect("seed product for tests")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub fn image_upload() -> UploadedArtifact {
    UploadedArtifact {
        filename: "crop photo.png".to_string(),
        content_type: Some("image/png".to_string()),
        bytes: PNG_BYTES.to_vec(),
    }
}

pub fn new_product(name: &str, price: Decimal) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        category: Some("grains".to_string()),
        price,
        quantity: Decimal::from(100),
        ..Default::default()
    }
}

pub async fn json_body(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response body")
}

pub async fn text_body(response: Response) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 response body")
}

/// Number of regular files directly under `dir`.
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.path().is_file())
                .count()
        })
        .unwrap_or(0)
}

/// Minimal multipart/form-data encoder for driving upload endpoints.
pub struct MultipartBody {
    boundary: String,
    buf: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: format!("agridirect-{}", Uuid::new_v4().simple()),
            buf: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, filename, content_type
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(bytes);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.buf
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.buf,
        )
    }
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}
