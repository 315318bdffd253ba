//! Error types module
//!
//! All pipeline failures are represented by `PreviewError`. Each variant maps
//! to one failure domain of the conversion pipeline so the durable status
//! record always carries a message naming where the job died.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    /// Missing or invalid environment configuration. Fatal at startup, never
    /// raised per job.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Source object could not be fetched from object storage.
    #[error("Download failed: {0}")]
    Download(String),

    /// The headless office process exited non-zero or produced no output.
    /// The message carries the captured stderr/stdout for postmortem
    /// diagnosis without re-running the job.
    #[error("Legacy conversion failed: {0}")]
    LegacyConversion(String),

    /// One of the three renderer protocol calls returned non-2xx.
    #[error("Render step '{step}' failed with status {status}: {body}")]
    RenderStep {
        step: &'static str,
        status: u16,
        body: String,
    },

    /// The result PDF could not be stored.
    #[error("Upload failed: {0}")]
    Upload(String),

    /// A repository operation (queue or status record) failed.
    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl PreviewError {
    /// Variant name, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            PreviewError::Configuration(_) => "Configuration",
            PreviewError::Download(_) => "Download",
            PreviewError::LegacyConversion(_) => "LegacyConversion",
            PreviewError::RenderStep { .. } => "RenderStep",
            PreviewError::Upload(_) => "Upload",
            PreviewError::Database(_) => "Database",
            PreviewError::Io(_) => "Io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_step_message_carries_status_and_body() {
        let err = PreviewError::RenderStep {
            step: "upload template",
            status: 500,
            body: "internal error".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("upload template"));
        assert!(msg.contains("internal error"));
    }

    #[test]
    fn kind_names_the_failure_domain() {
        assert_eq!(
            PreviewError::Download("missing".into()).kind(),
            "Download"
        );
        assert_eq!(
            PreviewError::LegacyConversion("soffice".into()).kind(),
            "LegacyConversion"
        );
    }
}
