//! Legacy format conversion.
//!
//! Wraps the headless office-suite binary that turns the legacy binary `.doc`
//! format into the modern zipped-XML `.docx` the renderer accepts. The
//! surrounding pipeline never touches process spawning directly; this is the
//! whole interface.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use docpreview_core::PreviewError;

const INTERMEDIATE_EXTENSION: &str = "docx";

/// Subprocess wrapper around `soffice --headless`.
#[derive(Clone)]
pub struct LegacyConverter {
    soffice_path: String,
}

impl LegacyConverter {
    pub fn new(soffice_path: impl Into<String>) -> Self {
        Self {
            soffice_path: soffice_path.into(),
        }
    }

    /// Expected output path: the office suite names the converted file after
    /// the input's stem, in the output directory.
    pub fn output_path(input: &Path, output_dir: &Path) -> Result<PathBuf, PreviewError> {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                PreviewError::LegacyConversion(format!(
                    "Input path has no usable file name: {}",
                    input.display()
                ))
            })?;
        Ok(output_dir.join(format!("{}.{}", stem, INTERMEDIATE_EXTENSION)))
    }

    /// Convert a legacy-format file to docx.
    ///
    /// `profile_dir` must be a freshly created job-private directory: the
    /// office suite keeps process-wide lock state keyed by its user profile,
    /// and concurrent conversions sharing one can deadlock or corrupt each
    /// other. On non-zero exit or missing output the error message carries
    /// the captured stderr/stdout so the failure can be diagnosed without
    /// re-running the job.
    #[tracing::instrument(skip(self, input, output_dir, profile_dir))]
    pub async fn convert_to_docx(
        &self,
        input: &Path,
        output_dir: &Path,
        profile_dir: &Path,
    ) -> Result<PathBuf, PreviewError> {
        let expected = Self::output_path(input, output_dir)?;
        let user_installation =
            format!("-env:UserInstallation=file://{}", profile_dir.display());

        tracing::info!(
            input = %input.display(),
            output = %expected.display(),
            "Converting legacy document to docx"
        );

        let output = Command::new(&self.soffice_path)
            .arg("--headless")
            .arg("--convert-to")
            .arg(INTERMEDIATE_EXTENSION)
            .arg("--outdir")
            .arg(output_dir)
            .arg(&user_installation)
            .arg(input)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                PreviewError::LegacyConversion(format!(
                    "Failed to spawn '{}': {}",
                    self.soffice_path, e
                ))
            })?;

        if !output.status.success() {
            return Err(PreviewError::LegacyConversion(format!(
                "'{}' exited with {}: {}",
                self.soffice_path,
                output.status,
                captured_output(&output.stderr, &output.stdout),
            )));
        }

        if !expected.exists() {
            return Err(PreviewError::LegacyConversion(format!(
                "Converted file missing at {}: {}",
                expected.display(),
                captured_output(&output.stderr, &output.stdout),
            )));
        }

        tracing::info!(output = %expected.display(), "Legacy conversion complete");
        Ok(expected)
    }
}

/// Whichever of stderr/stdout is non-empty, for postmortem diagnosis.
fn captured_output(stderr: &[u8], stdout: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stdout = String::from_utf8_lossy(stdout);
    match (stderr.trim().is_empty(), stdout.trim().is_empty()) {
        (false, false) => format!("stderr: {} | stdout: {}", stderr.trim(), stdout.trim()),
        (false, true) => format!("stderr: {}", stderr.trim()),
        (true, false) => format!("stdout: {}", stdout.trim()),
        (true, true) => "no output captured".to_string(),
    }
}
