use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PRIMARY_CONTENT_TYPE: &str = "application/pdf";
pub const PLAIN_TEXT_CONTENT_TYPE: &str = "text/plain";
pub const SOURCE_CONTENT_TYPE: &str = "text/x-tex";
pub const DEFAULT_SOURCE_FILENAME: &str = "tailored_resume.tex";

const DEFAULT_STEM: &str = "tailored_resume";

/// Markup source of the tailored resume, as returned by the tailoring service.
/// Input to every export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSource {
    pub content: String,
    pub filename: String,
}

impl DocumentSource {
    /// Filename without extension, used to name rendered exports.
    pub fn stem(&self) -> &str {
        Path::new(&self.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_STEM)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentFormat {
    /// Rendered PDF.
    Primary,
    /// Plain text produced when primary rendering fails.
    PlainTextFallback,
}

impl DocumentFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            DocumentFormat::Primary => PRIMARY_CONTENT_TYPE,
            DocumentFormat::PlainTextFallback => PLAIN_TEXT_CONTENT_TYPE,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Primary => "pdf",
            DocumentFormat::PlainTextFallback => "txt",
        }
    }
}

/// An exported document, bound to the submission generation it was rendered for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailoredDocument {
    pub format: DocumentFormat,
    pub content: Bytes,
    pub filename: String,
    pub generation: u64,
}

impl TailoredDocument {
    pub fn new(
        format: DocumentFormat,
        content: impl Into<Bytes>,
        source: &DocumentSource,
        generation: u64,
    ) -> Self {
        Self {
            format,
            content: content.into(),
            filename: format!("{}.{}", source.stem(), format.extension()),
            generation,
        }
    }

    /// The content as text, for fallback documents.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    Success,
    /// Failed, but another format may still succeed.
    FailedRetryable,
    /// Failed with nothing left to try.
    FailedFatal,
}

/// Log record for one rendering call. Never replayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportAttempt {
    pub id: Uuid,
    pub format: DocumentFormat,
    pub outcome: AttemptOutcome,
    pub fallback_triggered: bool,
    pub detail: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl ExportAttempt {
    pub fn new(
        format: DocumentFormat,
        outcome: AttemptOutcome,
        fallback_triggered: bool,
        detail: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            format,
            outcome,
            fallback_triggered,
            detail,
            attempted_at: Utc::now(),
        }
    }
}
