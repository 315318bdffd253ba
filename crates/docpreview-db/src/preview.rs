//! Preview status records (the Status Reporter's persistence).
//!
//! Both terminal writes are full upserts keyed by document id, so a crashed
//! and redelivered job simply overwrites whatever the previous attempt left.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use docpreview_core::models::DocumentPreviewRecord;
use docpreview_core::StatusReporter;

const PDF_MIME: &str = "application/pdf";

#[derive(Clone)]
pub struct PreviewRepository {
    pool: PgPool,
}

impl PreviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create (or reset) the record in PENDING state. Producer-side
    /// operation, used when a conversion is first requested.
    #[tracing::instrument(skip(self))]
    pub async fn upsert_pending(&self, document_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO document_previews (document_id, preview_status, updated_at)
            VALUES ($1, 'pending', NOW())
            ON CONFLICT (document_id) DO UPDATE SET
                preview_key = NULL,
                preview_url = NULL,
                preview_mime_type = NULL,
                preview_status = 'pending',
                preview_error = NULL,
                updated_at = NOW()
            "#,
        )
        .bind(document_id)
        .execute(&self.pool)
        .await
        .context("Failed to upsert pending preview record")?;
        Ok(())
    }

    pub async fn get(&self, document_id: Uuid) -> Result<Option<DocumentPreviewRecord>> {
        let record = sqlx::query_as::<Postgres, DocumentPreviewRecord>(
            r#"
            SELECT document_id, preview_key, preview_url, preview_mime_type,
                   preview_status, preview_error, updated_at
            FROM document_previews
            WHERE document_id = $1
            "#,
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch preview record")?;
        Ok(record)
    }
}

#[async_trait]
impl StatusReporter for PreviewRepository {
    #[tracing::instrument(skip(self, preview_key, preview_url))]
    async fn mark_ready(
        &self,
        document_id: Uuid,
        preview_key: &str,
        preview_url: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO document_previews
                (document_id, preview_key, preview_url, preview_mime_type,
                 preview_status, preview_error, updated_at)
            VALUES ($1, $2, $3, $4, 'ready', NULL, NOW())
            ON CONFLICT (document_id) DO UPDATE SET
                preview_key = EXCLUDED.preview_key,
                preview_url = EXCLUDED.preview_url,
                preview_mime_type = EXCLUDED.preview_mime_type,
                preview_status = 'ready',
                preview_error = NULL,
                updated_at = NOW()
            "#,
        )
        .bind(document_id)
        .bind(preview_key)
        .bind(preview_url)
        .bind(PDF_MIME)
        .execute(&self.pool)
        .await
        .context("Failed to mark preview ready")?;

        tracing::info!(document_id = %document_id, preview_key, "Preview marked READY");
        Ok(())
    }

    #[tracing::instrument(skip(self, message))]
    async fn mark_error(&self, document_id: Uuid, message: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO document_previews
                (document_id, preview_key, preview_url, preview_mime_type,
                 preview_status, preview_error, updated_at)
            VALUES ($1, NULL, NULL, NULL, 'error', $2, NOW())
            ON CONFLICT (document_id) DO UPDATE SET
                preview_key = NULL,
                preview_url = NULL,
                preview_mime_type = NULL,
                preview_status = 'error',
                preview_error = EXCLUDED.preview_error,
                updated_at = NOW()
            "#,
        )
        .bind(document_id)
        .bind(message)
        .execute(&self.pool)
        .await
        .context("Failed to mark preview errored")?;

        tracing::info!(document_id = %document_id, "Preview marked ERROR");
        Ok(())
    }
}
