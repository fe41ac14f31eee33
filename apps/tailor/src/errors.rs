use thiserror::Error;

/// Shown when the tailoring backend cannot be reached at all.
pub const NETWORK_FAILURE_MESSAGE: &str = "Something went wrong. Is your backend running?";

/// Crate-level error type shared by the controller, the export pipeline and the
/// service clients.
///
/// `Validation` and `Busy` are synchronous rejections and never change workflow
/// state. `Network` and `Service` move the workflow to `Failed`.
/// `RenderFormat` stays inside the export pipeline unless the fallback fails too,
/// at which point it surfaces as `FatalExport`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("A submission is already in flight")]
    Busy,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Service error (status {status}): {message}")]
    Service {
        status: u16,
        message: String,
        details: Option<String>,
    },

    #[error("Unexpected render payload ({content_type}): {message}")]
    RenderFormat {
        content_type: String,
        message: String,
    },

    #[error("Export failed: primary rendering ({primary}); plain-text fallback ({fallback})")]
    FatalExport { primary: String, fallback: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for errors that reject a call outright without touching workflow state.
    pub fn is_rejection(&self) -> bool {
        matches!(self, AppError::Validation(_) | AppError::Busy)
    }

    /// Text suitable for a notification banner.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Busy => "Please wait for the current request to finish.".to_string(),
            AppError::Network(_) => NETWORK_FAILURE_MESSAGE.to_string(),
            AppError::Service {
                message, details, ..
            } => match details {
                Some(details) if !details.trim().is_empty() => format!("{message} {details}"),
                _ => message.clone(),
            },
            AppError::RenderFormat { message, .. } => message.clone(),
            AppError::FatalExport { .. } => "Failed to generate the tailored document.".to_string(),
            AppError::Io(e) => format!("Could not save the file: {e}"),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal error occurred".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Network(e.to_string())
    }
}
