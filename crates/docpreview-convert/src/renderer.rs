//! Remote renderer client.
//!
//! Drives the rendering service's three-step stateful protocol: upload the
//! document as a template, trigger a render keyed by the returned template
//! id, download the artifact by render id. The pipeline sees one atomic
//! `render_to_pdf`; any step failing aborts the whole job, and the enclosing
//! queue retry is the only retry mechanism.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use docpreview_core::PreviewError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct TemplateResponse {
    data: TemplateData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateData {
    template_id: String,
}

#[derive(Debug, Deserialize)]
struct RenderResponse {
    data: RenderData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderData {
    render_id: String,
}

#[derive(Clone)]
pub struct RendererClient {
    client: Client,
    base_url: String,
}

impl RendererClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, PreviewError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                PreviewError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Render a document to PDF, writing the artifact to `output`.
    #[tracing::instrument(skip(self, input, output))]
    pub async fn render_to_pdf(&self, input: &Path, output: &Path) -> Result<(), PreviewError> {
        let template_id = self.upload_template(input).await?;
        tracing::debug!(template_id = %template_id, "Template uploaded");

        let render_id = self.trigger_render(&template_id).await?;
        tracing::debug!(render_id = %render_id, "Render triggered");

        self.download_artifact(&render_id, output).await?;

        if !output.exists() {
            return Err(PreviewError::RenderStep {
                step: "download artifact",
                status: 0,
                body: format!("Rendered file missing at {}", output.display()),
            });
        }

        tracing::info!(output = %output.display(), "Render complete");
        Ok(())
    }

    /// Step 1: multipart upload of the file as a template.
    async fn upload_template(&self, input: &Path) -> Result<String, PreviewError> {
        let bytes = tokio::fs::read(input).await?;
        let file_name = input
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();

        let form = reqwest::multipart::Form::new().part(
            "template",
            reqwest::multipart::Part::bytes(bytes).file_name(file_name),
        );

        let response = self
            .client
            .post(format!("{}/template", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| step_transport_error("upload template", e))?;

        let response = check_status("upload template", response).await?;
        let body: TemplateResponse = response
            .json()
            .await
            .map_err(|e| step_decode_error("upload template", e))?;
        Ok(body.data.template_id)
    }

    /// Step 2: trigger the render. No template variables are substituted;
    /// documents are rendered as-is, only format-converted.
    async fn trigger_render(&self, template_id: &str) -> Result<String, PreviewError> {
        let response = self
            .client
            .post(format!("{}/render/{}", self.base_url, template_id))
            .json(&json!({ "data": {}, "convertTo": "pdf" }))
            .send()
            .await
            .map_err(|e| step_transport_error("trigger render", e))?;

        let response = check_status("trigger render", response).await?;
        let body: RenderResponse = response
            .json()
            .await
            .map_err(|e| step_decode_error("trigger render", e))?;
        Ok(body.data.render_id)
    }

    /// Step 3: fetch the artifact bytes and write them to the output path.
    async fn download_artifact(
        &self,
        render_id: &str,
        output: &Path,
    ) -> Result<(), PreviewError> {
        let response = self
            .client
            .get(format!("{}/render/{}", self.base_url, render_id))
            .send()
            .await
            .map_err(|e| step_transport_error("download artifact", e))?;

        let response = check_status("download artifact", response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| step_decode_error("download artifact", e))?;

        tokio::fs::write(output, &bytes).await?;
        Ok(())
    }
}

/// Non-2xx responses abort the job; the message embeds status and body.
async fn check_status(
    step: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, PreviewError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(PreviewError::RenderStep {
        step,
        status: status.as_u16(),
        body,
    })
}

fn step_transport_error(step: &'static str, err: reqwest::Error) -> PreviewError {
    PreviewError::RenderStep {
        step,
        status: 0,
        body: err.to_string(),
    }
}

fn step_decode_error(step: &'static str, err: reqwest::Error) -> PreviewError {
    PreviewError::RenderStep {
        step,
        status: 0,
        body: format!("Failed to decode response: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn input_file(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("plano.docx");
        std::fs::write(&path, b"zipped xml bytes").unwrap();
        path
    }

    #[tokio::test]
    async fn full_protocol_produces_the_artifact() {
        let mut server = mockito::Server::new_async().await;
        let upload = server
            .mock("POST", "/template")
            .with_status(200)
            .with_body(r#"{"data":{"templateId":"tpl-123"}}"#)
            .create_async()
            .await;
        let render = server
            .mock("POST", "/render/tpl-123")
            .with_status(200)
            .with_body(r#"{"data":{"renderId":"rnd-456"}}"#)
            .create_async()
            .await;
        let download = server
            .mock("GET", "/render/rnd-456")
            .with_status(200)
            .with_body(b"%PDF-1.7 rendered")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let input = input_file(&dir);
        let output = dir.path().join("plano.pdf");

        let client = RendererClient::new(server.url()).unwrap();
        client.render_to_pdf(&input, &output).await.unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"%PDF-1.7 rendered");
        upload.assert_async().await;
        render.assert_async().await;
        download.assert_async().await;
    }

    #[tokio::test]
    async fn upload_failure_aborts_with_status_in_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/template")
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let input = input_file(&dir);
        let output = dir.path().join("plano.pdf");

        let client = RendererClient::new(server.url()).unwrap();
        let err = client.render_to_pdf(&input, &output).await.unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("500"), "{msg}");
        assert!(msg.contains("upstream exploded"), "{msg}");
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn render_failure_aborts_before_download() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/template")
            .with_status(200)
            .with_body(r#"{"data":{"templateId":"tpl-123"}}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/render/tpl-123")
            .with_status(422)
            .with_body("unsupported format")
            .create_async()
            .await;
        let download = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let input = input_file(&dir);
        let output = dir.path().join("plano.pdf");

        let client = RendererClient::new(server.url()).unwrap();
        let err = client.render_to_pdf(&input, &output).await.unwrap_err();

        assert!(matches!(
            err,
            PreviewError::RenderStep { status: 422, .. }
        ));
        download.assert_async().await;
    }

    #[tokio::test]
    async fn download_failure_carries_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/template")
            .with_status(200)
            .with_body(r#"{"data":{"templateId":"tpl-123"}}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/render/tpl-123")
            .with_status(200)
            .with_body(r#"{"data":{"renderId":"rnd-456"}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/render/rnd-456")
            .with_status(404)
            .with_body("render expired")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let input = input_file(&dir);
        let output = dir.path().join("plano.pdf");

        let client = RendererClient::new(server.url()).unwrap();
        let err = client.render_to_pdf(&input, &output).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
