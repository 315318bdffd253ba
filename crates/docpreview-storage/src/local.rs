use crate::keys::generate_preview_key;
use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem storage, used in development and tests.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// # Arguments
    /// * `base_path` - Root directory for stored objects
    /// * `base_url` - Base URL previews are served from
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Convert a storage key to a filesystem path, rejecting keys that could
    /// escape the base directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.contains("..") || storage_key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }
        Ok(self.base_path.join(storage_key))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn download_to_file(
        &self,
        storage_key: &str,
        local_path: &Path,
    ) -> StorageResult<u64> {
        let source = self.key_to_path(storage_key)?;

        if !source.exists() {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let written = fs::copy(&source, local_path).await.map_err(|e| {
            StorageError::DownloadFailed(format!(
                "Failed to copy {} to {}: {}",
                source.display(),
                local_path.display(),
                e
            ))
        })?;

        if written == 0 {
            return Err(StorageError::DownloadFailed(format!(
                "Object '{}' has no body",
                storage_key
            )));
        }

        tracing::debug!(key = %storage_key, size_bytes = written, "Local download successful");
        Ok(written)
    }

    async fn upload_pdf(&self, local_path: &Path) -> StorageResult<(String, String)> {
        let key = generate_preview_key();
        let target = self.key_to_path(&key)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(local_path, &target)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        let url = format!("{}/{}", self.base_url, key);
        tracing::debug!(key = %key, "Local upload successful");
        Ok((key, url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn storage(dir: &TempDir) -> LocalStorage {
        LocalStorage::new(dir.path(), "http://localhost:3000/files".to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn download_of_missing_key_is_not_found() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        let out = dir.path().join("out.doc");
        let err = storage
            .download_to_file("documents/missing.doc", &out)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        let out = dir.path().join("out");
        for key in ["../secret", "/etc/passwd", "a/../../b"] {
            let err = storage.download_to_file(key, &out).await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey(_)), "{key}");
        }
    }

    #[tokio::test]
    async fn upload_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;

        let pdf = dir.path().join("result.pdf");
        tokio::fs::write(&pdf, b"%PDF-1.4 fake").await.unwrap();

        let (key, url) = storage.upload_pdf(&pdf).await.unwrap();
        assert!(key.starts_with("previews/"));
        assert_eq!(url, format!("http://localhost:3000/files/{}", key));

        let fetched = dir.path().join("fetched.pdf");
        let size = storage.download_to_file(&key, &fetched).await.unwrap();
        assert_eq!(size, 13);
    }
}
