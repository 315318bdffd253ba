//! Configuration module
//!
//! All configuration comes from environment variables, read once at startup.
//! Required values fail fast with a `PreviewError::Configuration` so a
//! misconfigured worker never starts consuming jobs.

use std::env;
use std::str::FromStr;

use crate::error::PreviewError;

const DEFAULT_SOFFICE_PATH: &str = "soffice";
const DEFAULT_MAX_CONCURRENT_JOBS: usize = 2;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_MAX_RETRIES: i32 = 3;
const DEFAULT_S3_REGION: &str = "us-east-1";

/// Which storage backend holds source documents and generated previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Local,
}

impl FromStr for StorageBackend {
    type Err = PreviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "local" => Ok(StorageBackend::Local),
            other => Err(PreviewError::Configuration(format!(
                "Unknown STORAGE_BACKEND '{}', expected 's3' or 'local'",
                other
            ))),
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string; doubles as the queue connection and the
    /// durable preview record store.
    pub database_url: String,
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    /// Publicly addressable base for preview URLs. Falls back to the internal
    /// endpoint when unset.
    pub s3_public_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    /// Base URL of the external rendering service.
    pub renderer_base_url: String,
    /// Headless office-suite executable; resolved from PATH by default.
    pub soffice_path: String,
    pub max_concurrent_jobs: usize,
    pub poll_interval_ms: u64,
    pub max_retries: i32,
}

fn require_env(key: &str) -> Result<String, PreviewError> {
    env::var(key)
        .map_err(|_| PreviewError::Configuration(format!("{} must be set", key)))
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, PreviewError> {
        let storage_backend = env::var("STORAGE_BACKEND")
            .map(|v| v.parse())
            .unwrap_or(Ok(StorageBackend::S3))?;

        let config = Config {
            database_url: require_env("DATABASE_URL")?,
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| DEFAULT_S3_REGION.to_string()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            s3_public_endpoint: env::var("S3_PUBLIC_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            renderer_base_url: require_env("RENDERER_BASE_URL")?,
            soffice_path: env::var("SOFFICE_PATH")
                .unwrap_or_else(|_| DEFAULT_SOFFICE_PATH.to_string()),
            max_concurrent_jobs: env_or("WORKER_MAX_CONCURRENT_JOBS", DEFAULT_MAX_CONCURRENT_JOBS)
                .max(1),
            poll_interval_ms: env_or("WORKER_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS),
            max_retries: env_or("WORKER_MAX_RETRIES", DEFAULT_MAX_RETRIES),
        };

        config.validate()?;
        Ok(config)
    }

    /// Backend-specific required values.
    pub fn validate(&self) -> Result<(), PreviewError> {
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(PreviewError::Configuration(
                        "S3_BUCKET must be set when STORAGE_BACKEND is s3".to_string(),
                    ));
                }
                if self.s3_endpoint.is_none() {
                    return Err(PreviewError::Configuration(
                        "S3_ENDPOINT must be set when STORAGE_BACKEND is s3".to_string(),
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(PreviewError::Configuration(
                        "LOCAL_STORAGE_PATH must be set when STORAGE_BACKEND is local"
                            .to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}
