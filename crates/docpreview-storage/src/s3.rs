use crate::keys::generate_preview_key;
use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};
use std::path::Path;
use tokio::io::AsyncWriteExt;

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// S3 storage gateway.
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    endpoint_url: Option<String>,
    public_endpoint_url: Option<String>,
}

impl S3Storage {
    /// Create a new S3Storage instance.
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `public_endpoint_url` - Optional publicly reachable base used to build
    ///   preview URLs; falls back to `endpoint_url` when unset
    pub fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        public_endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        // Credentials come from the standard AWS env vars via from_env.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            endpoint_url,
            public_endpoint_url,
        })
    }

    /// Publicly addressable URL for an object, path-style:
    /// `{base}/{bucket}/{key}` where base is the public endpoint, falling
    /// back to the internal endpoint. Neither configured is a configuration
    /// error: there is no base the resulting URL could be reached on.
    fn generate_url(&self, key: &str) -> StorageResult<String> {
        let base = self
            .public_endpoint_url
            .as_deref()
            .or(self.endpoint_url.as_deref())
            .ok_or_else(|| {
                StorageError::ConfigError(
                    "No public or internal S3 endpoint configured to build preview URLs"
                        .to_string(),
                )
            })?;
        Ok(format!("{}/{}/{}", base.trim_end_matches('/'), self.bucket, key))
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn download_to_file(
        &self,
        storage_key: &str,
        local_path: &Path,
    ) -> StorageResult<u64> {
        let start = std::time::Instant::now();
        let location = ObjectPath::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.get(&location).await;
        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(storage_key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %storage_key,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let mut file = tokio::fs::File::create(local_path).await?;
        let mut stream = result.into_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk: Bytes =
                chunk.map_err(|e| StorageError::DownloadFailed(e.to_string()))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written == 0 {
            return Err(StorageError::DownloadFailed(format!(
                "Object '{}' has no body",
                storage_key
            )));
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = written,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(written)
    }

    async fn upload_pdf(&self, local_path: &Path) -> StorageResult<(String, String)> {
        let key = generate_preview_key();
        // Build the URL first so a missing endpoint fails before any bytes move.
        let url = self.generate_url(&key)?;

        let data = tokio::fs::read(local_path).await?;
        let size = data.len() as u64;
        let location = ObjectPath::from(key.clone());
        let start = std::time::Instant::now();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, PDF_CONTENT_TYPE.into());

        let result: ObjectResult<_> = self
            .store
            .put_opts(
                &location,
                PutPayload::from(Bytes::from(data)),
                PutOptions::from(attributes),
            )
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok((key, url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_with(
        endpoint: Option<&str>,
        public_endpoint: Option<&str>,
    ) -> S3Storage {
        S3Storage::new(
            "documents".to_string(),
            "us-east-1".to_string(),
            endpoint.map(String::from),
            public_endpoint.map(String::from),
        )
        .unwrap()
    }

    #[test]
    fn url_prefers_public_endpoint() {
        let storage = storage_with(
            Some("http://minio:9000"),
            Some("https://files.example.com"),
        );
        assert_eq!(
            storage.generate_url("previews/a.pdf").unwrap(),
            "https://files.example.com/documents/previews/a.pdf"
        );
    }

    #[test]
    fn url_falls_back_to_internal_endpoint() {
        let storage = storage_with(Some("http://minio:9000/"), None);
        assert_eq!(
            storage.generate_url("previews/a.pdf").unwrap(),
            "http://minio:9000/documents/previews/a.pdf"
        );
    }

    #[test]
    fn url_without_any_endpoint_is_a_config_error() {
        let storage = storage_with(None, None);
        assert!(matches!(
            storage.generate_url("previews/a.pdf"),
            Err(StorageError::ConfigError(_))
        ));
    }
}
