//! HTTP client for the tailoring backend. The only module that talks to the network.
//!
//! Endpoints:
//! - `POST /tailor`         multipart: resume_file, job_description, target_match_percentage
//! - `POST /latex-to-pdf`   multipart: latex_code → PDF bytes (or a JSON error body)
//! - `POST /latex-to-text`  multipart: latex_code → `{"text_content": "..."}`
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::AppError;
use crate::models::{ResumeFile, SubmissionRequest};
use crate::services::{
    service_error, DocumentRenderingService, RenderPayload, TailoringService,
    TextRenderingService,
};

pub const TAILOR_PATH: &str = "/tailor";
pub const RENDER_DOCUMENT_PATH: &str = "/latex-to-pdf";
pub const RENDER_TEXT_PATH: &str = "/latex-to-text";

#[derive(Debug, Deserialize)]
struct PlainTextResponse {
    text_content: String,
}

/// Implements all three backend operations over one connection pool.
#[derive(Clone)]
pub struct HttpServiceClient {
    client: Client,
    base_url: String,
}

impl HttpServiceClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_source(&self, path: &str, source: &str) -> Result<reqwest::Response, AppError> {
        let form = Form::new().text("latex_code", source.to_string());
        let response = self.client.post(self.url(path)).multipart(form).send().await?;
        Ok(response)
    }
}

fn resume_part(file: &ResumeFile) -> Part {
    let part = || Part::bytes(file.bytes.to_vec()).file_name(file.name.clone());
    part().mime_str(&file.mime).unwrap_or_else(|_| {
        warn!("Ignoring unparseable MIME type '{}' for {}", file.mime, file.name);
        part()
    })
}

#[async_trait]
impl TailoringService for HttpServiceClient {
    async fn submit_tailoring(&self, request: &SubmissionRequest) -> Result<Value, AppError> {
        let form = Form::new()
            .part("resume_file", resume_part(&request.file))
            .text("job_description", request.job_description.clone())
            .text(
                "target_match_percentage",
                request.target.percentage().to_string(),
            );

        debug!(
            request_id = %request.request_id,
            generation = request.generation,
            "POST {TAILOR_PATH} ({} bytes)",
            request.file.len()
        );

        let response = self
            .client
            .post(self.url(TAILOR_PATH))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            warn!("Tailoring service returned {status}");
            return Err(service_error(status.as_u16(), &body));
        }

        serde_json::from_slice(&body).map_err(|e| AppError::Service {
            status: status.as_u16(),
            message: "The tailoring service returned an unreadable response.".to_string(),
            details: Some(e.to_string()),
        })
    }
}

#[async_trait]
impl DocumentRenderingService for HttpServiceClient {
    async fn render_document(&self, source: &str) -> Result<RenderPayload, AppError> {
        let response = self.post_source(RENDER_DOCUMENT_PATH, source).await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        debug!(
            "POST {RENDER_DOCUMENT_PATH} -> {status} {:?} ({} bytes)",
            content_type,
            body.len()
        );

        Ok(RenderPayload {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl TextRenderingService for HttpServiceClient {
    async fn render_plain_text(&self, source: &str) -> Result<String, AppError> {
        let response = self.post_source(RENDER_TEXT_PATH, source).await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(service_error(status.as_u16(), &body));
        }

        serde_json::from_slice::<PlainTextResponse>(&body)
            .map(|r| r.text_content)
            .map_err(|e| AppError::Service {
                status: status.as_u16(),
                message: "The text renderer returned an unreadable response.".to_string(),
                details: Some(e.to_string()),
            })
    }
}
