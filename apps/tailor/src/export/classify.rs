//! Render response classification.
//!
//! The renderer may answer 200 with a JSON error body, so success is decided
//! by the payload's declared content type, never by status alone.

use bytes::Bytes;
use tracing::debug;

use crate::errors::AppError;
use crate::models::document::PRIMARY_CONTENT_TYPE;
use crate::services::{error_message_from_body, RenderPayload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    PrimarySuccess {
        body: Bytes,
    },
    /// The renderer answered, but not with a document.
    DisguisedError {
        status: u16,
        content_type: String,
        message: String,
    },
    TransportError(String),
}

impl RenderOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RenderOutcome::PrimarySuccess { .. })
    }

    /// The internal failure signal for a non-success outcome.
    pub fn failure(&self) -> Option<AppError> {
        match self {
            RenderOutcome::PrimarySuccess { .. } => None,
            RenderOutcome::DisguisedError {
                content_type,
                message,
                ..
            } => Some(AppError::RenderFormat {
                content_type: content_type.clone(),
                message: message.clone(),
            }),
            RenderOutcome::TransportError(msg) => Some(AppError::Network(msg.clone())),
        }
    }

    /// Short reason for logs and degraded-result notices.
    pub fn reason(&self) -> String {
        match self {
            RenderOutcome::PrimarySuccess { .. } => "rendered".to_string(),
            RenderOutcome::DisguisedError { message, .. } => message.clone(),
            RenderOutcome::TransportError(msg) => format!("renderer unreachable: {msg}"),
        }
    }
}

/// Media type without parameters, lowercased: `Application/PDF; x=y` → `application/pdf`.
fn media_type(content_type: Option<&str>) -> String {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

pub fn classify_render_response(response: Result<RenderPayload, AppError>) -> RenderOutcome {
    let payload = match response {
        Ok(payload) => payload,
        Err(AppError::Network(msg)) => return RenderOutcome::TransportError(msg),
        Err(other) => return RenderOutcome::TransportError(other.to_string()),
    };

    let media = media_type(payload.content_type.as_deref());
    let is_success_status = (200..300).contains(&payload.status);

    if is_success_status && media == PRIMARY_CONTENT_TYPE && !payload.body.is_empty() {
        return RenderOutcome::PrimarySuccess { body: payload.body };
    }

    let message = error_message_from_body(&payload.body)
        .map(|(message, details)| match details {
            Some(details) if !details.trim().is_empty() => format!("{message} {details}"),
            _ => message,
        })
        .unwrap_or_else(|| {
            if media == PRIMARY_CONTENT_TYPE {
                format!("Renderer responded with status {} and an empty document", payload.status)
            } else {
                format!(
                    "Renderer responded with status {} and content type '{}'",
                    payload.status,
                    if media.is_empty() { "none" } else { media.as_str() }
                )
            }
        });

    debug!(
        status = payload.status,
        content_type = %media,
        "Render response is not a document: {message}"
    );

    RenderOutcome::DisguisedError {
        status: payload.status,
        content_type: media,
        message,
    }
}
