use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// The resume artifact as picked by the user. Treated as an opaque blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeFile {
    pub name: String,
    /// Declared MIME type, as reported by the file picker.
    pub mime: String,
    pub bytes: Bytes,
}

impl ResumeFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Requested enhancement goal. `None` (0%) asks the service for analysis only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TargetMatch {
    #[default]
    None,
    Seventy,
    Eighty,
    Ninety,
    Full,
}

impl TargetMatch {
    pub const ALL: [TargetMatch; 5] = [
        TargetMatch::None,
        TargetMatch::Seventy,
        TargetMatch::Eighty,
        TargetMatch::Ninety,
        TargetMatch::Full,
    ];

    pub fn percentage(self) -> u8 {
        match self {
            TargetMatch::None => 0,
            TargetMatch::Seventy => 70,
            TargetMatch::Eighty => 80,
            TargetMatch::Ninety => 90,
            TargetMatch::Full => 100,
        }
    }

    /// Whether this target asks the service to enhance the resume.
    pub fn is_enhancement(self) -> bool {
        self != TargetMatch::None
    }
}

impl TryFrom<u8> for TargetMatch {
    type Error = AppError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        TargetMatch::ALL
            .into_iter()
            .find(|t| t.percentage() == value)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Target match must be one of 0, 70, 80, 90 or 100 (got {value})"
                ))
            })
    }
}

impl From<TargetMatch> for u8 {
    fn from(target: TargetMatch) -> Self {
        target.percentage()
    }
}

/// An accepted submission. Built once when the controller accepts `start` and
/// shared read-only with the task that talks to the tailoring service.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    /// Correlates log lines for one submission.
    pub request_id: Uuid,
    /// Generation token; responses are applied only while this is current.
    pub generation: u64,
    pub file: ResumeFile,
    pub job_description: String,
    pub target: TargetMatch,
}

impl SubmissionRequest {
    pub fn new(
        generation: u64,
        file: ResumeFile,
        job_description: String,
        target: TargetMatch,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            generation,
            file,
            job_description,
            target,
        }
    }
}
