//! Artifact storage for uploaded files and generated QR images.
//!
//! Artifacts are addressed by a relative key (`qrs/{id}-authQR.svg`,
//! `1728979200000-photo.jpg`) and published under a public reference
//! prefix that the HTTP layer serves statically.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid artifact key: {0}")]
    InvalidKey(String),

    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Backend-agnostic artifact storage.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write (or overwrite) the artifact at `key` and return its public reference.
    async fn put(&self, key: &str, data: &[u8]) -> StorageResult<String>;

    async fn read(&self, key: &str) -> StorageResult<Vec<u8>>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Removing a missing artifact is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Public reference for `key`, e.g. `/uploads/qrs/x.svg`.
    fn public_ref(&self, key: &str) -> String;
}

/// Filesystem-backed store rooted at the configured upload directory.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalArtifactStore {
    pub const DEFAULT_PUBLIC_PREFIX: &'static str = "/uploads";

    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create directory {:?}: {}", root, e))
        })?;

        info!("Initialized local artifact store at {:?}", root);

        Ok(Self {
            root,
            public_prefix: Self::DEFAULT_PUBLIC_PREFIX.to_string(),
        })
    }

    fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

/// Keys are relative, slash-separated and may not escape the root.
fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.contains('\\') {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    let path = Path::new(key);
    let all_normal = path
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if !all_normal {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn put(&self, key: &str, data: &[u8]) -> StorageResult<String> {
        let path = self.resolve(key)?;
        debug!("Writing artifact {} ({} bytes)", key, data.len());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::WriteFailed(format!("Failed to create directory: {}", e))
            })?;
        }

        // Write to a sibling temp file and rename so concurrent writers of
        // the same key never leave a torn file behind.
        let tmp_path = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
        let mut file = fs::File::create(&tmp_path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file: {}", e))
        })?;
        file.write_all(data)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("Failed to write data: {}", e)))?;
        file.sync_all()
            .await
            .map_err(|e| StorageError::WriteFailed(format!("Failed to sync file: {}", e)))?;
        drop(file);

        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::WriteFailed(format!(
                "Failed to move artifact into place: {}",
                e
            )));
        }

        Ok(self.public_ref(key))
    }

    async fn read(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::ReadFailed(format!("Failed to read file: {}", e))),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.resolve(key)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::ReadFailed(e.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::WriteFailed(format!(
                "Failed to remove file: {}",
                e
            ))),
        }
    }

    fn public_ref(&self, key: &str) -> String {
        format!("{}/{}", self.public_prefix, key)
    }
}

/// A file received from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedArtifact {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Reduces an uploaded filename to `[A-Za-z0-9._-]`, dropping any path.
pub fn sanitize_filename(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Key under which an upload is stored: `{unix_millis}-{sanitized name}`.
pub fn upload_key(original_filename: &str) -> String {
    format!(
        "{}-{}",
        chrono::Utc::now().timestamp_millis(),
        sanitize_filename(original_filename)
    )
}

/// An upload persisted under `key` and published as `reference`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub key: String,
    pub reference: String,
}

/// Persists an upload under a fresh key.
pub async fn store_upload(
    store: &dyn ArtifactStore,
    upload: &UploadedArtifact,
) -> StorageResult<StoredUpload> {
    let key = upload_key(&upload.filename);
    let reference = store.put(&key, &upload.bytes).await?;
    Ok(StoredUpload { key, reference })
}

/// Removes uploads written for a request that did not complete.
pub async fn discard_uploads(store: &dyn ArtifactStore, uploads: &[StoredUpload]) {
    for upload in uploads {
        match store.delete(&upload.key).await {
            Ok(()) => debug!(key = %upload.key, "discarded upload"),
            Err(e) => warn!(key = %upload.key, error = %e, "failed to discard upload"),
        }
    }
}
