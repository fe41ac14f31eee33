//! Network boundary: the three backend operations the workflow consumes.
//!
//! The controller and the export pipeline only ever see these traits. The
//! reqwest implementation lives in `http`; tests swap in scripted fakes.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::SubmissionRequest;

pub mod http;

pub use http::HttpServiceClient;

/// Longest raw (non-JSON) error body echoed back into messages.
const MAX_RAW_ERROR_CHARS: usize = 200;

/// Unclassified response from the document renderer.
///
/// Success is decided by the export pipeline from `content_type`, not `status`.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[async_trait]
pub trait TailoringService: Send + Sync {
    /// Returns the raw analysis payload. `Err` is `Network` or `Service`.
    async fn submit_tailoring(&self, request: &SubmissionRequest) -> Result<Value, AppError>;
}

#[async_trait]
pub trait DocumentRenderingService: Send + Sync {
    /// Returns whatever the renderer answered. `Err` only for transport failures.
    async fn render_document(&self, source: &str) -> Result<RenderPayload, AppError>;
}

#[async_trait]
pub trait TextRenderingService: Send + Sync {
    async fn render_plain_text(&self, source: &str) -> Result<String, AppError>;
}

/// Pulls a human-readable message out of an `{error, details?}` body.
///
/// Accepts both `"error": "..."` and `"error": {"message": "..."}`. Non-JSON
/// bodies are returned trimmed and truncated; empty bodies yield `None`.
pub fn error_message_from_body(body: &[u8]) -> Option<(String, Option<String>)> {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => {
            let message = match value.get("error") {
                Some(Value::String(msg)) => Some(msg.clone()),
                Some(Value::Object(obj)) => obj
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            }
            .or_else(|| {
                value
                    .get("detail")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })?;
            let details = value
                .get("details")
                .and_then(Value::as_str)
                .map(str::to_string);
            Some((message, details))
        }
        Err(_) => {
            let text = String::from_utf8_lossy(body);
            let text = text.trim();
            if text.is_empty() {
                None
            } else {
                Some((text.chars().take(MAX_RAW_ERROR_CHARS).collect(), None))
            }
        }
    }
}

/// Builds a `Service` error from a non-success response.
pub fn service_error(status: u16, body: &[u8]) -> AppError {
    let (message, details) = error_message_from_body(body)
        .unwrap_or_else(|| (format!("Request failed with status {status}"), None));
    AppError::Service {
        status,
        message,
        details,
    }
}
