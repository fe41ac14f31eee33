//! Notification events for the presentation layer.
//!
//! The core only emits; rendering banners, spinners or toasts is up to whoever
//! implements `NotificationSink`.

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::models::DocumentFormat;
use crate::state::{StateChange, WorkflowState};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    StateChanged {
        from: WorkflowState,
        to: WorkflowState,
        generation: u64,
    },
    SubmissionFailed {
        generation: u64,
        message: String,
    },
    ExportSucceeded {
        format: DocumentFormat,
        filename: String,
    },
    /// Primary rendering failed but the plain-text fallback worked.
    ExportDegraded {
        filename: String,
        reason: String,
    },
    ExportFailed {
        message: String,
    },
    DownloadSaved {
        filename: String,
        path: PathBuf,
    },
}

impl From<StateChange> for WorkflowEvent {
    fn from(change: StateChange) -> Self {
        WorkflowEvent::StateChanged {
            from: change.from,
            to: change.to,
            generation: change.generation,
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: WorkflowEvent);
}

/// Writes every event to the log and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, event: WorkflowEvent) {
        match &event {
            WorkflowEvent::StateChanged {
                from,
                to,
                generation,
            } => info!(generation, "state changed: {from} -> {to}"),
            WorkflowEvent::SubmissionFailed {
                generation,
                message,
            } => error!(generation, "submission failed: {message}"),
            WorkflowEvent::ExportSucceeded { format, filename } => {
                info!("export succeeded: {filename} ({format:?})")
            }
            WorkflowEvent::ExportDegraded { filename, reason } => {
                warn!("export degraded to plain text ({filename}): {reason}")
            }
            WorkflowEvent::ExportFailed { message } => error!("export failed: {message}"),
            WorkflowEvent::DownloadSaved { filename, path } => {
                info!("saved {filename} to {}", path.display())
            }
        }
    }
}

/// Fans events out to any number of subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<WorkflowEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.tx.subscribe()
    }
}

impl NotificationSink for BroadcastSink {
    fn notify(&self, event: WorkflowEvent) {
        if self.tx.send(event).is_err() {
            debug!("no notification subscribers; event dropped");
        }
    }
}
