//! Storage backend selection from configuration.

use std::sync::Arc;

use docpreview_core::{Config, StorageBackend};

use crate::local::LocalStorage;
use crate::s3::S3Storage;
use crate::traits::{Storage, StorageError, StorageResult};

/// Build the storage gateway named by the configuration.
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend {
        StorageBackend::S3 => {
            let bucket = config.s3_bucket.clone().ok_or_else(|| {
                StorageError::ConfigError("S3_BUCKET must be set".to_string())
            })?;
            let storage = S3Storage::new(
                bucket,
                config.s3_region.clone(),
                config.s3_endpoint.clone(),
                config.s3_public_endpoint.clone(),
            )?;
            Ok(Arc::new(storage))
        }
        StorageBackend::Local => {
            let path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH must be set".to_string())
            })?;
            let base_url = config
                .local_storage_base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:3000/files".to_string());
            let storage = LocalStorage::new(path, base_url).await?;
            Ok(Arc::new(storage))
        }
    }
}
