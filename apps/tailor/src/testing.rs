//! Scripted fakes for the service traits and the notification sink.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::errors::AppError;
use crate::models::{ResumeFile, SubmissionRequest, TargetMatch};
use crate::notify::{NotificationSink, WorkflowEvent};
use crate::services::{
    DocumentRenderingService, RenderPayload, TailoringService, TextRenderingService,
};
use crate::state::WorkflowState;

enum Step<T> {
    Ready(Result<T, AppError>),
    Gated(oneshot::Receiver<Result<T, AppError>>),
}

/// Queue of canned responses. Gated steps block until the test releases them.
pub struct Script<T> {
    calls: AtomicUsize,
    steps: Mutex<VecDeque<Step<T>>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            steps: Mutex::new(VecDeque::new()),
        }
    }
}

impl<T> Script<T> {
    pub fn push(&self, result: Result<T, AppError>) {
        self.steps.lock().unwrap().push_back(Step::Ready(result));
    }

    pub fn gate(&self) -> oneshot::Sender<Result<T, AppError>> {
        let (tx, rx) = oneshot::channel();
        self.steps.lock().unwrap().push_back(Step::Gated(rx));
        tx
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Yields until at least `n` calls have reached the script.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.calls() < n {
            tokio::task::yield_now().await;
        }
    }

    async fn next(&self, default: impl FnOnce() -> Result<T, AppError>) -> Result<T, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Ready(result)) => result,
            Some(Step::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(AppError::Network("gate dropped".to_string()))),
            None => default(),
        }
    }
}

#[derive(Default)]
pub struct FakeTailoring {
    pub script: Script<Value>,
    targets: Mutex<Vec<TargetMatch>>,
}

impl FakeTailoring {
    pub fn targets(&self) -> Vec<TargetMatch> {
        self.targets.lock().unwrap().clone()
    }
}

#[async_trait]
impl TailoringService for FakeTailoring {
    async fn submit_tailoring(&self, request: &SubmissionRequest) -> Result<Value, AppError> {
        self.targets.lock().unwrap().push(request.target);
        self.script
            .next(|| Ok(json!({"matched_skills": [], "missing_skills": []})))
            .await
    }
}

#[derive(Default)]
pub struct FakeRenderer {
    pub script: Script<RenderPayload>,
}

#[async_trait]
impl DocumentRenderingService for FakeRenderer {
    async fn render_document(&self, _source: &str) -> Result<RenderPayload, AppError> {
        self.script.next(|| Ok(pdf_payload())).await
    }
}

#[derive(Default)]
pub struct FakeTextRenderer {
    pub script: Script<String>,
}

#[async_trait]
impl TextRenderingService for FakeTextRenderer {
    async fn render_plain_text(&self, source: &str) -> Result<String, AppError> {
        let text = format!("plain: {source}");
        self.script.next(|| Ok(text)).await
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<WorkflowEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Target states of every recorded transition, in order.
    pub fn states(&self) -> Vec<WorkflowState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                WorkflowEvent::StateChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, event: WorkflowEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn resume(name: &str) -> ResumeFile {
    ResumeFile::new(name, "application/pdf", Bytes::from_static(b"%PDF-1.4 resume"))
}

pub fn pdf_payload() -> RenderPayload {
    RenderPayload {
        status: 200,
        content_type: Some("application/pdf".to_string()),
        body: Bytes::from_static(b"%PDF-1.7 rendered"),
    }
}

pub fn json_payload(status: u16, body: Value) -> RenderPayload {
    RenderPayload {
        status,
        content_type: Some("application/json".to_string()),
        body: Bytes::from(body.to_string()),
    }
}
