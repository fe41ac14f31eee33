//! Submission controller: single-flight tailoring requests with stale-response
//! suppression.
//!
//! Flow: start() validates → bumps generation → Submitting → spawns the
//! service call → on response, applies the normalized result only if its
//! generation is still current → ResultsReady | Failed.
//!
//! Requests are never cancelled on the wire. reset()/clear() bump the
//! generation instead, so a late response finds itself stale and is dropped.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::models::{ResumeFile, SubmissionRequest, TargetMatch};
use crate::notify::{NotificationSink, WorkflowEvent};
use crate::services::TailoringService;
use crate::state::{SessionSnapshot, SharedSession, WorkflowState};
use crate::submission::normalizer::{embedded_error, extract_document_source, normalize_for_target};

/// Handle to an accepted submission. Dropping it does not cancel anything.
#[derive(Debug)]
pub struct SubmissionHandle {
    generation: u64,
    task: JoinHandle<()>,
}

impl SubmissionHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Waits until the response has been applied or discarded.
    pub async fn wait(self) -> Result<(), AppError> {
        self.task
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("submission task failed: {e}")))
    }
}

#[derive(Clone)]
pub struct SubmissionController {
    session: SharedSession,
    tailoring: Arc<dyn TailoringService>,
    sink: Arc<dyn NotificationSink>,
}

impl SubmissionController {
    pub fn new(
        session: SharedSession,
        tailoring: Arc<dyn TailoringService>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            session,
            tailoring,
            sink,
        }
    }

    /// Accepts a submission and returns as soon as the request is in flight.
    ///
    /// Rejected with `Validation` when no (or an empty) file is given and with
    /// `Busy` while another submission is outstanding. Rejections leave the
    /// workflow untouched.
    pub async fn start(
        &self,
        file: Option<ResumeFile>,
        job_description: impl Into<String>,
        target: TargetMatch,
    ) -> Result<SubmissionHandle, AppError> {
        let file = file.ok_or_else(|| AppError::Validation("Please upload a resume.".to_string()))?;
        if file.is_empty() {
            return Err(AppError::Validation(format!(
                "The selected resume '{}' is empty.",
                file.name
            )));
        }

        let job_description = job_description.into();
        if job_description.trim().is_empty() {
            warn!("Submitting without a job description");
        }

        let (request, change) = {
            let mut session = self.session.lock().await;
            if session.state == WorkflowState::Submitting {
                warn!(
                    generation = session.generation,
                    "Rejected submission: request already in flight"
                );
                return Err(AppError::Busy);
            }

            let generation = session.begin_submission(file.clone());
            let change = session.transition(WorkflowState::Submitting);
            (
                Arc::new(SubmissionRequest::new(generation, file, job_description, target)),
                change,
            )
        };

        info!(
            request_id = %request.request_id,
            generation = request.generation,
            "Submitting {} ({} bytes, target {}%)",
            request.file.name,
            request.file.len(),
            request.target.percentage()
        );
        self.sink.notify(change.into());

        let generation = request.generation;
        let task = tokio::spawn(run_submission(
            self.session.clone(),
            self.tailoring.clone(),
            self.sink.clone(),
            request,
        ));

        Ok(SubmissionHandle { generation, task })
    }

    /// Selects a new file (or none), discarding results and documents.
    /// Any in-flight response becomes stale.
    pub async fn reset(&self, file: Option<ResumeFile>) {
        let to = if file.is_some() {
            WorkflowState::FileSelected
        } else {
            WorkflowState::Idle
        };

        let change = {
            let mut session = self.session.lock().await;
            session.invalidate();
            session.selected_file = file;
            session.transition(to)
        };

        info!(generation = change.generation, "Workflow reset to {to}");
        self.sink.notify(change.into());
    }

    /// Drops the selected file and everything derived from it.
    pub async fn clear(&self) {
        self.reset(None).await;
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }
}

async fn run_submission(
    session: SharedSession,
    tailoring: Arc<dyn TailoringService>,
    sink: Arc<dyn NotificationSink>,
    request: Arc<SubmissionRequest>,
) {
    let response = tailoring.submit_tailoring(&request).await;

    let outcome = response.and_then(|raw| match embedded_error(&raw) {
        Some(err) => Err(err),
        None => Ok((
            normalize_for_target(&raw, Some(request.target)),
            extract_document_source(&raw),
        )),
    });

    let events: Vec<WorkflowEvent> = {
        let mut session = session.lock().await;

        if !session.is_current(request.generation) {
            debug!(
                request_id = %request.request_id,
                "Discarding stale response for generation {} (current {})",
                request.generation,
                session.generation
            );
            return;
        }

        match outcome {
            Ok((analysis, source)) => {
                info!(
                    request_id = %request.request_id,
                    matched = analysis.matched_skills.len(),
                    missing = analysis.missing_skills.len(),
                    enhanced = analysis.enhancement().is_some(),
                    has_source = source.is_some(),
                    "Tailoring results ready"
                );
                session.apply_results(analysis, source);
                vec![session.transition(WorkflowState::ResultsReady).into()]
            }
            Err(err) => {
                warn!(request_id = %request.request_id, "Tailoring failed: {err}");
                let message = err.user_message();
                session.apply_failure(message.clone());
                vec![
                    session.transition(WorkflowState::Failed).into(),
                    WorkflowEvent::SubmissionFailed {
                        generation: request.generation,
                        message,
                    },
                ]
            }
        }
    };

    for event in events {
        sink.notify(event);
    }
}
