//! Status reporting seam.
//!
//! The orchestrator reports the job outcome through this trait instead of
//! talking to the database directly, so the conversion crate stays
//! independent of the persistence layer and tests can observe outcomes
//! in memory.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Persists the terminal outcome of one conversion attempt.
///
/// Both writes are full overwrites of the preview record: READY sets
/// key/url/mime and clears the error, ERROR sets the message and clears the
/// preview fields. This is what makes at-least-once redelivery safe.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn mark_ready(&self, document_id: Uuid, preview_key: &str, preview_url: &str)
        -> Result<()>;

    async fn mark_error(&self, document_id: Uuid, message: &str) -> Result<()>;
}
