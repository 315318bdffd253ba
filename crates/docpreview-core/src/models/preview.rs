use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

/// Lifecycle of a document's preview, as visible to consumers of the record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "preview_status", rename_all = "lowercase")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum PreviewStatus {
    Pending,
    Ready,
    Error,
}

impl Display for PreviewStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PreviewStatus::Pending => write!(f, "PENDING"),
            PreviewStatus::Ready => write!(f, "READY"),
            PreviewStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Durable preview record, keyed by document id.
///
/// Invariant: after a job finishes, either status is READY with key/url set
/// and error null, or status is ERROR with error set and the preview fields
/// null. Never both. Only the Status Reporter mutates this record, one full
/// overwrite per job attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DocumentPreviewRecord {
    pub document_id: Uuid,
    pub preview_key: Option<String>,
    pub preview_url: Option<String>,
    pub preview_mime_type: Option<String>,
    pub preview_status: PreviewStatus,
    pub preview_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}
