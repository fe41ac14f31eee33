//! Export pipeline: primary rendering with a single plain-text fallback.
//!
//! Per invocation:
//!   Ready → RenderingPrimary → Succeeded(Primary)
//!                            → FailedPrimary → RenderingFallback → Succeeded(Fallback)
//!                                                                → FailedFatal
//!
//! Nothing is retried. Documents are stored only if the submission they were
//! rendered for is still current when rendering finishes.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::errors::AppError;
use crate::export::classify::{classify_render_response, RenderOutcome};
use crate::models::{
    AttemptOutcome, DocumentFormat, DocumentSource, ExportAttempt, TailoredDocument,
};
use crate::notify::{NotificationSink, WorkflowEvent};
use crate::services::{DocumentRenderingService, TextRenderingService};
use crate::state::SharedSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExportStage {
    Ready,
    RenderingPrimary,
    FailedPrimary,
    RenderingFallback,
    Succeeded,
    FailedFatal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Rendered(TailoredDocument),
    /// Plain text stands in for the failed primary document.
    Degraded {
        document: TailoredDocument,
        reason: String,
    },
    /// A newer submission started while rendering; the result was dropped.
    Superseded,
}

impl ExportOutcome {
    pub fn document(&self) -> Option<&TailoredDocument> {
        match self {
            ExportOutcome::Rendered(document) | ExportOutcome::Degraded { document, .. } => {
                Some(document)
            }
            ExportOutcome::Superseded => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub outcome: ExportOutcome,
    pub attempts: Vec<ExportAttempt>,
}

/// Tracks one export invocation for logging.
struct ExportRun {
    generation: u64,
    stage: ExportStage,
    attempts: Vec<ExportAttempt>,
}

impl ExportRun {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            stage: ExportStage::Ready,
            attempts: Vec::new(),
        }
    }

    fn advance(&mut self, to: ExportStage) {
        debug!(generation = self.generation, "export {:?} -> {:?}", self.stage, to);
        self.stage = to;
    }

    fn record(&mut self, attempt: ExportAttempt) {
        info!(
            generation = self.generation,
            attempt_id = %attempt.id,
            format = ?attempt.format,
            outcome = ?attempt.outcome,
            fallback_triggered = attempt.fallback_triggered,
            detail = attempt.detail.as_deref().unwrap_or(""),
            "export attempt recorded"
        );
        self.attempts.push(attempt);
    }
}

#[derive(Clone)]
pub struct ExportPipeline {
    session: SharedSession,
    renderer: Arc<dyn DocumentRenderingService>,
    text_renderer: Arc<dyn TextRenderingService>,
    sink: Arc<dyn NotificationSink>,
}

impl ExportPipeline {
    pub fn new(
        session: SharedSession,
        renderer: Arc<dyn DocumentRenderingService>,
        text_renderer: Arc<dyn TextRenderingService>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            session,
            renderer,
            text_renderer,
            sink,
        }
    }

    /// Renders the current submission's source document.
    ///
    /// Fails with `Validation` when there is nothing to export and with
    /// `FatalExport` when both renderers fail. Earlier documents are left in
    /// place on failure.
    pub async fn export(&self) -> Result<ExportReport, AppError> {
        let (generation, source) = {
            let session = self.session.lock().await;
            match &session.source {
                Some(source) => (session.generation, source.clone()),
                None => {
                    return Err(AppError::Validation(
                        "There is no tailored document to export yet.".to_string(),
                    ))
                }
            }
        };

        let mut run = ExportRun::new(generation);
        let result = self.render(&mut run, &source).await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                if !self.session.lock().await.is_current(generation) {
                    warn!(
                        generation,
                        "Discarding failed export for a replaced submission: {err}"
                    );
                    return Ok(ExportReport {
                        outcome: ExportOutcome::Superseded,
                        attempts: run.attempts,
                    });
                }
                error!(generation, "Export failed: {err}");
                self.sink.notify(WorkflowEvent::ExportFailed {
                    message: err.user_message(),
                });
                return Err(err);
            }
        };

        let stored = {
            let mut session = self.session.lock().await;
            if session.is_current(generation) {
                if let Some(document) = outcome.document() {
                    session.store_document(document.clone());
                }
                true
            } else {
                false
            }
        };

        if !stored {
            warn!(
                generation,
                "Discarding export: a newer submission started while rendering"
            );
            return Ok(ExportReport {
                outcome: ExportOutcome::Superseded,
                attempts: run.attempts,
            });
        }

        match &outcome {
            ExportOutcome::Rendered(document) => {
                self.sink.notify(WorkflowEvent::ExportSucceeded {
                    format: document.format,
                    filename: document.filename.clone(),
                })
            }
            ExportOutcome::Degraded { document, reason } => {
                self.sink.notify(WorkflowEvent::ExportDegraded {
                    filename: document.filename.clone(),
                    reason: reason.clone(),
                })
            }
            ExportOutcome::Superseded => {}
        }

        Ok(ExportReport {
            outcome,
            attempts: run.attempts,
        })
    }

    async fn render(
        &self,
        run: &mut ExportRun,
        source: &DocumentSource,
    ) -> Result<ExportOutcome, AppError> {
        run.advance(ExportStage::RenderingPrimary);
        let response = self.renderer.render_document(&source.content).await;
        let primary = classify_render_response(response);

        let primary_failure = match primary {
            RenderOutcome::PrimarySuccess { body } => {
                run.record(ExportAttempt::new(
                    DocumentFormat::Primary,
                    AttemptOutcome::Success,
                    false,
                    None,
                ));
                run.advance(ExportStage::Succeeded);
                return Ok(ExportOutcome::Rendered(TailoredDocument::new(
                    DocumentFormat::Primary,
                    body,
                    source,
                    run.generation,
                )));
            }
            failed => failed,
        };

        let reason = primary_failure.reason();
        if let Some(signal) = primary_failure.failure() {
            warn!(generation = run.generation, "Primary rendering failed: {signal}");
        }
        run.record(ExportAttempt::new(
            DocumentFormat::Primary,
            AttemptOutcome::FailedRetryable,
            true,
            Some(reason.clone()),
        ));
        run.advance(ExportStage::FailedPrimary);

        run.advance(ExportStage::RenderingFallback);
        let fallback = self
            .text_renderer
            .render_plain_text(&source.content)
            .await
            .and_then(|text| {
                if text.trim().is_empty() {
                    Err(AppError::Service {
                        status: 200,
                        message: "The text renderer returned no content.".to_string(),
                        details: None,
                    })
                } else {
                    Ok(text)
                }
            });

        match fallback {
            Ok(text) => {
                run.record(ExportAttempt::new(
                    DocumentFormat::PlainTextFallback,
                    AttemptOutcome::Success,
                    false,
                    None,
                ));
                run.advance(ExportStage::Succeeded);
                Ok(ExportOutcome::Degraded {
                    document: TailoredDocument::new(
                        DocumentFormat::PlainTextFallback,
                        text,
                        source,
                        run.generation,
                    ),
                    reason,
                })
            }
            Err(err) => {
                let fallback_reason = err.user_message();
                run.record(ExportAttempt::new(
                    DocumentFormat::PlainTextFallback,
                    AttemptOutcome::FailedFatal,
                    false,
                    Some(fallback_reason.clone()),
                ));
                run.advance(ExportStage::FailedFatal);
                Err(AppError::FatalExport {
                    primary: reason,
                    fallback: fallback_reason,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisResult;
    use crate::state::new_shared_session;
    use crate::testing::{
        json_payload, pdf_payload, resume, FakeRenderer, FakeTextRenderer, RecordingSink,
    };
    use serde_json::json;

    struct Harness {
        session: SharedSession,
        renderer: Arc<FakeRenderer>,
        text_renderer: Arc<FakeTextRenderer>,
        sink: Arc<RecordingSink>,
        pipeline: ExportPipeline,
    }

    fn source() -> DocumentSource {
        DocumentSource {
            content: "\\documentclass{article}".to_string(),
            filename: "jane_tailored.tex".to_string(),
        }
    }

    async fn harness_with_source() -> Harness {
        let session = new_shared_session();
        {
            let mut s = session.lock().await;
            s.begin_submission(resume("cv.pdf"));
            s.apply_results(AnalysisResult::default(), Some(source()));
        }
        let renderer = Arc::new(FakeRenderer::default());
        let text_renderer = Arc::new(FakeTextRenderer::default());
        let sink = Arc::new(RecordingSink::default());
        let pipeline = ExportPipeline::new(
            session.clone(),
            renderer.clone(),
            text_renderer.clone(),
            sink.clone(),
        );
        Harness {
            session,
            renderer,
            text_renderer,
            sink,
            pipeline,
        }
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let h = harness_with_source().await;

        let report = h.pipeline.export().await.unwrap();

        let document = match &report.outcome {
            ExportOutcome::Rendered(document) => document,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(document.format, DocumentFormat::Primary);
        assert_eq!(document.filename, "jane_tailored.pdf");
        assert_eq!(h.text_renderer.script.calls(), 0);
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(report.attempts[0].outcome, AttemptOutcome::Success);

        let session = h.session.lock().await;
        assert!(session.primary.is_some());
        assert!(session.fallback.is_none());
    }

    #[tokio::test]
    async fn test_json_body_with_ok_status_falls_back_once() {
        let h = harness_with_source().await;
        h.renderer
            .script
            .push(Ok(json_payload(200, json!({"error": "compile failed"}))));

        let report = h.pipeline.export().await.unwrap();

        match &report.outcome {
            ExportOutcome::Degraded { document, reason } => {
                assert_eq!(document.format, DocumentFormat::PlainTextFallback);
                assert_eq!(document.filename, "jane_tailored.txt");
                assert_eq!(
                    document.as_text(),
                    Some("plain: \\documentclass{article}")
                );
                assert_eq!(reason, "compile failed");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(h.renderer.script.calls(), 1);
        assert_eq!(h.text_renderer.script.calls(), 1);

        let outcomes: Vec<_> = report
            .attempts
            .iter()
            .map(|a| (a.format, a.outcome, a.fallback_triggered))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                (DocumentFormat::Primary, AttemptOutcome::FailedRetryable, true),
                (DocumentFormat::PlainTextFallback, AttemptOutcome::Success, false),
            ]
        );
        assert!(h.sink.events().contains(&WorkflowEvent::ExportDegraded {
            filename: "jane_tailored.txt".to_string(),
            reason: "compile failed".to_string(),
        }));
        assert!(h.session.lock().await.fallback.is_some());
    }

    #[tokio::test]
    async fn test_unreachable_renderer_falls_back() {
        let h = harness_with_source().await;
        h.renderer
            .script
            .push(Err(AppError::Network("connection refused".to_string())));

        let report = h.pipeline.export().await.unwrap();

        assert!(matches!(report.outcome, ExportOutcome::Degraded { .. }));
        assert_eq!(h.text_renderer.script.calls(), 1);
    }

    #[tokio::test]
    async fn test_both_renderers_failing_is_fatal_and_keeps_prior_documents() {
        let h = harness_with_source().await;
        h.pipeline.export().await.unwrap();

        h.renderer
            .script
            .push(Ok(json_payload(500, json!({"error": "PDF compilation failed."}))));
        h.text_renderer.script.push(Err(AppError::Service {
            status: 500,
            message: "Text extraction failed".to_string(),
            details: None,
        }));

        let err = h.pipeline.export().await.unwrap_err();

        match err {
            AppError::FatalExport { primary, fallback } => {
                assert_eq!(primary, "PDF compilation failed.");
                assert_eq!(fallback, "Text extraction failed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(h.text_renderer.script.calls(), 1);

        let session = h.session.lock().await;
        assert!(session.primary.is_some());
        assert!(session.fallback.is_none());
        drop(session);
        assert!(h
            .sink
            .events()
            .iter()
            .any(|e| matches!(e, WorkflowEvent::ExportFailed { .. })));
    }

    #[tokio::test]
    async fn test_empty_fallback_text_is_failure() {
        let h = harness_with_source().await;
        h.renderer
            .script
            .push(Ok(json_payload(200, json!({"error": "compile failed"}))));
        h.text_renderer.script.push(Ok("   ".to_string()));

        let err = h.pipeline.export().await.unwrap_err();

        assert!(matches!(err, AppError::FatalExport { .. }));
        assert!(h.session.lock().await.documents().is_empty());
    }

    #[tokio::test]
    async fn test_nothing_to_export_is_validation_error() {
        let session = new_shared_session();
        let renderer = Arc::new(FakeRenderer::default());
        let pipeline = ExportPipeline::new(
            session,
            renderer.clone(),
            Arc::new(FakeTextRenderer::default()),
            Arc::new(RecordingSink::default()),
        );

        let err = pipeline.export().await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(renderer.script.calls(), 0);
    }

    #[tokio::test]
    async fn test_new_submission_during_export_discards_documents() {
        let h = harness_with_source().await;
        let gate = h.renderer.script.gate();

        let pipeline = h.pipeline.clone();
        let export = tokio::spawn(async move { pipeline.export().await });
        h.renderer.script.wait_for_calls(1).await;

        {
            let mut session = h.session.lock().await;
            session.begin_submission(resume("newer.pdf"));
        }
        gate.send(Ok(pdf_payload())).unwrap();

        let report = export.await.unwrap().unwrap();

        assert_eq!(report.outcome, ExportOutcome::Superseded);
        assert!(h.session.lock().await.documents().is_empty());
        assert!(!h
            .sink
            .events()
            .iter()
            .any(|e| matches!(e, WorkflowEvent::ExportSucceeded { .. })));
    }

    #[tokio::test]
    async fn test_failed_export_for_replaced_submission_is_silent() {
        let h = harness_with_source().await;
        let gate = h.renderer.script.gate();
        h.text_renderer
            .script
            .push(Err(AppError::Network("connection refused".to_string())));

        let pipeline = h.pipeline.clone();
        let export = tokio::spawn(async move { pipeline.export().await });
        h.renderer.script.wait_for_calls(1).await;

        {
            let mut session = h.session.lock().await;
            session.begin_submission(resume("newer.pdf"));
        }
        gate.send(Ok(json_payload(500, json!({"error": "PDF compilation failed."}))))
            .unwrap();

        let report = export.await.unwrap().unwrap();

        assert_eq!(report.outcome, ExportOutcome::Superseded);
        assert_eq!(report.attempts.len(), 2);
        assert!(!h
            .sink
            .events()
            .iter()
            .any(|e| matches!(e, WorkflowEvent::ExportFailed { .. })));
    }

    #[tokio::test]
    async fn test_reexport_replaces_document_of_same_format() {
        let h = harness_with_source().await;
        h.pipeline.export().await.unwrap();
        h.pipeline.export().await.unwrap();

        let session = h.session.lock().await;
        assert_eq!(session.documents().len(), 1);
    }
}
