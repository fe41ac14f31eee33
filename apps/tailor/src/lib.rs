//! Client-side core of the resume tailoring workflow.
//!
//! Submits a resume and job description for tailoring, normalizes the
//! analysis, renders the tailored document (PDF, falling back to plain text)
//! and hands results to a download backend. Presentation is left to whoever
//! consumes `TailorWorkflow` and implements `NotificationSink`.

pub mod config;
pub mod errors;
pub mod export;
pub mod models;
pub mod notify;
pub mod services;
pub mod state;
pub mod submission;
pub mod telemetry;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use errors::AppError;
pub use notify::{BroadcastSink, NotificationSink, TracingSink, WorkflowEvent};
pub use state::{SessionSnapshot, WorkflowState};
pub use workflow::TailorWorkflow;
