use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Queue message describing one conversion request.
///
/// Delivered at-least-once: the pipeline must be safe to run twice for the
/// same `document_id` (status writes are full overwrites, every job resource
/// is created fresh per attempt).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionJob {
    pub document_id: Uuid,
    pub owner_id: Uuid,
    pub storage_key: String,
    pub mime_type: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "job_status", rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// One row of the `conversion_jobs` queue table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct QueuedJob {
    pub id: Uuid,
    pub payload: serde_json::Value,
    pub status: JobStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub last_error: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QueuedJob {
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Deserialize the payload into the conversion job it carries.
    pub fn conversion_job(&self) -> Result<ConversionJob, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_round_trips_with_camel_case_keys() {
        let payload = json!({
            "documentId": "7d4e2c1a-9f3b-4c5d-8e6f-0a1b2c3d4e5f",
            "ownerId": "00000000-0000-0000-0000-000000000001",
            "storageKey": "documents/relatorio.doc",
            "mimeType": "application/msword",
            "fileName": "relatorio.doc",
        });
        let job: ConversionJob = serde_json::from_value(payload).unwrap();
        assert_eq!(job.file_name, "relatorio.doc");
        assert_eq!(job.storage_key, "documents/relatorio.doc");

        let value = serde_json::to_value(&job).unwrap();
        assert!(value.get("documentId").is_some());
        assert!(value.get("document_id").is_none());
    }

    #[test]
    fn retry_is_bounded_by_max_retries() {
        let mut job = QueuedJob {
            id: Uuid::new_v4(),
            payload: json!({}),
            status: JobStatus::Pending,
            retry_count: 0,
            max_retries: 3,
            last_error: None,
            scheduled_at: Utc::now(),
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(job.can_retry());
        job.retry_count = 3;
        assert!(!job.can_retry());
    }
}
