//! Conversion job queue.
//!
//! The queue is a Postgres table claimed with FOR UPDATE SKIP LOCKED, which
//! gives at-least-once delivery and lets concurrent workers claim without
//! stepping on each other. Retry/backoff bookkeeping lives here, not in the
//! pipeline.

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use docpreview_core::models::{ConversionJob, QueuedJob};

/// Channel name for Postgres LISTEN/NOTIFY when a new job is enqueued.
pub const JOB_NOTIFY_CHANNEL: &str = "docpreview_new_job";

const QUEUED_JOB_COLUMNS: &str = r#"
    id,
    payload,
    status,
    retry_count,
    max_retries,
    last_error,
    scheduled_at,
    started_at,
    completed_at,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct JobQueueRepository {
    pool: PgPool,
}

impl JobQueueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new conversion job and notify listening workers.
    ///
    /// Used by producers and tests; the worker itself only consumes.
    #[tracing::instrument(skip(self, job), fields(document.id = %job.document_id))]
    pub async fn enqueue(&self, job: &ConversionJob, max_retries: i32) -> Result<Uuid> {
        let payload = serde_json::to_value(job).context("Failed to serialize job payload")?;

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction for enqueue")?;

        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO conversion_jobs (payload, max_retries)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(payload)
        .bind(max_retries)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to insert conversion job")?;

        // Wake workers immediately instead of waiting for the poll interval.
        // Non-fatal: workers discover the job via polling if NOTIFY fails.
        if let Err(e) = sqlx::query("SELECT pg_notify($1, '')")
            .bind(JOB_NOTIFY_CHANNEL)
            .execute(&mut *tx)
            .await
        {
            tracing::warn!(error = %e, job_id = %id, "pg_notify failed, workers will poll");
        }

        tx.commit()
            .await
            .context("Failed to commit enqueue transaction")?;

        tracing::info!(job_id = %id, document_id = %job.document_id, "Conversion job enqueued");
        Ok(id)
    }

    /// Claim the next due job, marking it running.
    ///
    /// Returns `None` when nothing is due. SKIP LOCKED means two workers never
    /// claim the same row.
    #[tracing::instrument(skip(self))]
    pub async fn claim_next_job(&self) -> Result<Option<QueuedJob>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin claim transaction")?;

        let job: Option<QueuedJob> = sqlx::query_as::<Postgres, QueuedJob>(&format!(
            r#"
            SELECT {QUEUED_JOB_COLUMNS}
            FROM conversion_jobs
            WHERE status = 'pending'
                AND scheduled_at <= NOW()
            ORDER BY scheduled_at ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#
        ))
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch next job")?;

        let Some(job) = job else {
            tx.commit().await.context("Failed to commit empty claim")?;
            return Ok(None);
        };

        let claimed: QueuedJob = sqlx::query_as::<Postgres, QueuedJob>(&format!(
            r#"
            UPDATE conversion_jobs
            SET status = 'running', started_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {QUEUED_JOB_COLUMNS}
            "#
        ))
        .bind(job.id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to mark job running")?;

        tx.commit()
            .await
            .context("Failed to commit claim transaction")?;

        tracing::debug!(job_id = %claimed.id, retry_count = claimed.retry_count, "Job claimed");
        Ok(Some(claimed))
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_completed(&self, job_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE conversion_jobs
            SET status = 'completed', completed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .context("Failed to mark job completed")?;
        Ok(())
    }

    /// Terminal failure: retries exhausted (or none allowed).
    #[tracing::instrument(skip(self, error))]
    pub async fn mark_failed(&self, job_id: Uuid, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE conversion_jobs
            SET status = 'failed', last_error = $2, completed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(error)
        .execute(&self.pool)
        .await
        .context("Failed to mark job failed")?;
        Ok(())
    }

    /// Reschedule a failed attempt: increment the retry counter and push the
    /// row back to pending after the backoff delay.
    #[tracing::instrument(skip(self, error))]
    pub async fn schedule_retry(
        &self,
        job_id: Uuid,
        backoff_seconds: u64,
        error: &str,
    ) -> Result<()> {
        let run_at = Utc::now() + ChronoDuration::seconds(backoff_seconds as i64);

        sqlx::query(
            r#"
            UPDATE conversion_jobs
            SET status = 'pending',
                retry_count = retry_count + 1,
                last_error = $2,
                scheduled_at = $3,
                started_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(error)
        .bind(run_at)
        .execute(&self.pool)
        .await
        .context("Failed to schedule job retry")?;

        tracing::info!(job_id = %job_id, backoff_seconds, "Job retry scheduled");
        Ok(())
    }

    /// Fetch a job row by id. Used by tests and operational tooling.
    pub async fn get_job(&self, job_id: Uuid) -> Result<Option<QueuedJob>> {
        let job = sqlx::query_as::<Postgres, QueuedJob>(&format!(
            r#"
            SELECT {QUEUED_JOB_COLUMNS}
            FROM conversion_jobs
            WHERE id = $1
            "#
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch job")?;
        Ok(job)
    }
}
