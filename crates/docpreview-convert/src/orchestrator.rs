//! Per-job pipeline orchestration: download → route → (legacy hop) → render
//! → upload → report, with the temp workspace spanning the whole attempt.

use std::sync::Arc;

use anyhow::{Context, Result};

use docpreview_core::models::ConversionJob;
use docpreview_core::{
    needs_legacy_conversion, pdf_file_name, sanitize_file_name, PreviewError, StatusReporter,
};
use docpreview_storage::Storage;

use crate::legacy::LegacyConverter;
use crate::renderer::RendererClient;
use crate::workspace::JobWorkspace;

const FALLBACK_FILE_NAME: &str = "document";

pub struct PreviewOrchestrator {
    storage: Arc<dyn Storage>,
    reporter: Arc<dyn StatusReporter>,
    converter: LegacyConverter,
    renderer: RendererClient,
}

impl PreviewOrchestrator {
    pub fn new(
        storage: Arc<dyn Storage>,
        reporter: Arc<dyn StatusReporter>,
        converter: LegacyConverter,
        renderer: RendererClient,
    ) -> Self {
        Self {
            storage,
            reporter,
            converter,
            renderer,
        }
    }

    /// Run one conversion attempt to its terminal status.
    ///
    /// Every failure is caught exactly once here: the ERROR status is written
    /// best-effort (a failed status write is logged, never masks the original
    /// error), the workspace is torn down on every exit path, and the error
    /// is re-raised so the queue's own retry bookkeeping engages.
    #[tracing::instrument(skip(self, job), fields(document.id = %job.document_id))]
    pub async fn process_job(&self, job: &ConversionJob) -> Result<()> {
        let workspace = JobWorkspace::create().context("Failed to create job workspace")?;

        let result = self.run_pipeline(job, &workspace).await;

        match result {
            Ok((preview_key, preview_url)) => {
                self.reporter
                    .mark_ready(job.document_id, &preview_key, &preview_url)
                    .await
                    .context("Failed to record READY status")?;
                tracing::info!(
                    document_id = %job.document_id,
                    preview_key = %preview_key,
                    "Conversion job done"
                );
                Ok(())
            }
            Err(e) => {
                let message = format!("{:#}", e);
                if let Err(report_err) = self
                    .reporter
                    .mark_error(job.document_id, &message)
                    .await
                {
                    tracing::error!(
                        document_id = %job.document_id,
                        error = %report_err,
                        "Failed to record ERROR status; original error preserved"
                    );
                }
                tracing::error!(document_id = %job.document_id, error = %message, "Conversion job failed");
                Err(e)
            }
        }
        // workspace dropped here: the directory is removed on success and
        // failure alike
    }

    async fn run_pipeline(
        &self,
        job: &ConversionJob,
        workspace: &JobWorkspace,
    ) -> Result<(String, String)> {
        let safe_name = sanitize_file_name(Some(&job.file_name), FALLBACK_FILE_NAME);
        let source_path = workspace.path().join(&safe_name);

        tracing::info!(
            document_id = %job.document_id,
            storage_key = %job.storage_key,
            "Downloading source document"
        );
        self.storage
            .download_to_file(&job.storage_key, &source_path)
            .await
            .map_err(|e| PreviewError::Download(e.to_string()))?;

        let legacy = needs_legacy_conversion(Some(&job.mime_type), &[&job.file_name]);

        let render_input = if legacy {
            tracing::info!(document_id = %job.document_id, "Legacy format detected, converting to docx");
            let profile_dir = workspace
                .unique_dir("profile")
                .context("Failed to create office profile directory")?;
            self.converter
                .convert_to_docx(&source_path, workspace.path(), &profile_dir)
                .await?
        } else {
            source_path
        };

        let output_path = workspace.path().join(pdf_file_name(&safe_name));
        tracing::info!(document_id = %job.document_id, "Rendering to PDF");
        self.renderer
            .render_to_pdf(&render_input, &output_path)
            .await?;

        tracing::info!(document_id = %job.document_id, "Uploading preview PDF");
        let (preview_key, preview_url) = self
            .storage
            .upload_pdf(&output_path)
            .await
            .map_err(|e| PreviewError::Upload(e.to_string()))?;

        Ok((preview_key, preview_url))
    }
}
