use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::models::{
    AnalysisResult, DocumentFormat, DocumentSource, ResumeFile, TailoredDocument,
};

/// Lifecycle of the tailoring workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowState {
    #[default]
    Idle,
    FileSelected,
    Submitting,
    ResultsReady,
    Failed,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkflowState::Idle => "idle",
            WorkflowState::FileSelected => "file_selected",
            WorkflowState::Submitting => "submitting",
            WorkflowState::ResultsReady => "results_ready",
            WorkflowState::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub from: WorkflowState,
    pub to: WorkflowState,
    pub generation: u64,
}

/// Everything derived from the current submission plus the selected file.
///
/// Shared by the controller and the export pipeline behind one mutex. Writers
/// hold the lock only between suspension points and check `generation` before
/// applying anything that was computed while unlocked.
#[derive(Debug, Default)]
pub struct Session {
    pub state: WorkflowState,
    pub generation: u64,
    pub selected_file: Option<ResumeFile>,
    pub analysis: Option<Arc<AnalysisResult>>,
    pub source: Option<DocumentSource>,
    pub primary: Option<TailoredDocument>,
    pub fallback: Option<TailoredDocument>,
    pub last_error: Option<String>,
}

pub type SharedSession = Arc<Mutex<Session>>;

pub fn new_shared_session() -> SharedSession {
    Arc::new(Mutex::new(Session::default()))
}

impl Session {
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn transition(&mut self, to: WorkflowState) -> StateChange {
        let from = self.state;
        self.state = to;
        tracing::debug!(generation = self.generation, "workflow {from} -> {to}");
        StateChange {
            from,
            to,
            generation: self.generation,
        }
    }

    /// Bumps the generation so any outstanding response or export goes stale,
    /// and drops everything derived from earlier submissions.
    pub fn invalidate(&mut self) -> u64 {
        self.generation += 1;
        self.analysis = None;
        self.source = None;
        self.last_error = None;
        self.clear_documents();
        self.generation
    }

    /// Starts a new generation for `file`. Caller transitions to `Submitting`.
    pub fn begin_submission(&mut self, file: ResumeFile) -> u64 {
        self.selected_file = Some(file);
        self.invalidate()
    }

    pub fn apply_results(&mut self, analysis: AnalysisResult, source: Option<DocumentSource>) {
        self.clear_documents();
        self.analysis = Some(Arc::new(analysis));
        self.source = source;
        self.last_error = None;
    }

    pub fn apply_failure(&mut self, message: String) {
        self.clear_documents();
        self.analysis = None;
        self.source = None;
        self.last_error = Some(message);
    }

    pub fn clear_documents(&mut self) {
        self.primary = None;
        self.fallback = None;
    }

    /// Stores `document` in its format's slot, replacing any earlier one.
    pub fn store_document(&mut self, document: TailoredDocument) {
        match document.format {
            DocumentFormat::Primary => self.primary = Some(document),
            DocumentFormat::PlainTextFallback => self.fallback = Some(document),
        }
    }

    pub fn document(&self, format: DocumentFormat) -> Option<&TailoredDocument> {
        match format {
            DocumentFormat::Primary => self.primary.as_ref(),
            DocumentFormat::PlainTextFallback => self.fallback.as_ref(),
        }
    }

    pub fn documents(&self) -> Vec<TailoredDocument> {
        self.primary
            .iter()
            .chain(self.fallback.iter())
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            generation: self.generation,
            selected_file: self.selected_file.as_ref().map(|f| f.name.clone()),
            analysis: self.analysis.clone(),
            source: self.source.clone(),
            documents: self.documents(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Read-only view handed to presentation code.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: WorkflowState,
    pub generation: u64,
    pub selected_file: Option<String>,
    pub analysis: Option<Arc<AnalysisResult>>,
    pub source: Option<DocumentSource>,
    pub documents: Vec<TailoredDocument>,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn source() -> DocumentSource {
        DocumentSource {
            content: "\\begin{document}\\end{document}".to_string(),
            filename: "tailored_resume.tex".to_string(),
        }
    }

    #[test]
    fn test_begin_submission_discards_derived_state() {
        let mut session = Session::default();
        session.apply_results(AnalysisResult::default(), Some(source()));
        session.store_document(TailoredDocument::new(
            DocumentFormat::Primary,
            Bytes::from_static(b"%PDF"),
            &source(),
            0,
        ));

        let generation =
            session.begin_submission(ResumeFile::new("cv.pdf", "application/pdf", vec![1u8]));

        assert_eq!(generation, 1);
        assert!(session.analysis.is_none());
        assert!(session.source.is_none());
        assert!(session.documents().is_empty());
        assert_eq!(session.selected_file.as_ref().unwrap().name, "cv.pdf");
    }

    #[test]
    fn test_store_document_keeps_one_per_format() {
        let mut session = Session::default();
        for body in ["first", "second"] {
            session.store_document(TailoredDocument::new(
                DocumentFormat::PlainTextFallback,
                body,
                &source(),
                0,
            ));
        }
        let docs = session.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].as_text(), Some("second"));
    }

    #[test]
    fn test_failure_keeps_selected_file() {
        let mut session = Session::default();
        session.begin_submission(ResumeFile::new("cv.tex", "text/x-tex", "x"));
        session.apply_failure("Service down".to_string());
        assert!(session.selected_file.is_some());
        assert_eq!(session.last_error.as_deref(), Some("Service down"));
    }

    #[test]
    fn test_transition_reports_previous_state() {
        let mut session = Session::default();
        let change = session.transition(WorkflowState::FileSelected);
        assert_eq!(change.from, WorkflowState::Idle);
        assert_eq!(change.to, WorkflowState::FileSelected);
        assert_eq!(session.snapshot().state, WorkflowState::FileSelected);
    }
}
