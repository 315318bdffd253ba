//! Storage abstraction trait.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage gateway used by the conversion pipeline.
///
/// Exactly two operations: fetch the source document into the job workspace,
/// and store the result PDF under a fresh key. Everything else about the
/// object store is outside the pipeline's concern.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Stream the object body to a local file. Returns the number of bytes
    /// written. A missing object or an object with no body is an error.
    async fn download_to_file(&self, storage_key: &str, local_path: &Path)
        -> StorageResult<u64>;

    /// Upload a PDF under a freshly generated key with `application/pdf`
    /// content type. Returns `(storage_key, public_url)`.
    async fn upload_pdf(&self, local_path: &Path) -> StorageResult<(String, String)>;
}
