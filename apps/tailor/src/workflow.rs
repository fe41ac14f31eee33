//! Entry point for presentation code: one session, one controller, one
//! export pipeline and one download emitter wired together.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::errors::AppError;
use crate::export::{
    DownloadBackend, DownloadEmitter, Downloadable, ExportPipeline, ExportReport, TempFileBackend,
};
use crate::models::{DocumentFormat, ResumeFile, TargetMatch};
use crate::notify::{NotificationSink, WorkflowEvent};
use crate::services::{
    DocumentRenderingService, HttpServiceClient, TailoringService, TextRenderingService,
};
use crate::state::{new_shared_session, SessionSnapshot, SharedSession};
use crate::submission::{SubmissionController, SubmissionHandle};

#[derive(Clone)]
pub struct TailorWorkflow {
    session: SharedSession,
    controller: SubmissionController,
    pipeline: ExportPipeline,
    emitter: DownloadEmitter,
    sink: Arc<dyn NotificationSink>,
}

impl TailorWorkflow {
    pub fn new(
        tailoring: Arc<dyn TailoringService>,
        renderer: Arc<dyn DocumentRenderingService>,
        text_renderer: Arc<dyn TextRenderingService>,
        backend: Arc<dyn DownloadBackend>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let session = new_shared_session();
        Self {
            controller: SubmissionController::new(session.clone(), tailoring, sink.clone()),
            pipeline: ExportPipeline::new(session.clone(), renderer, text_renderer, sink.clone()),
            emitter: DownloadEmitter::new(backend),
            session,
            sink,
        }
    }

    /// Wires the HTTP client and temp-file downloads from `config`.
    pub fn from_config(
        config: &Config,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, AppError> {
        let client = Arc::new(HttpServiceClient::new(config)?);
        let backend = Arc::new(TempFileBackend::new(
            config.staging_dir.clone(),
            config.download_dir.clone(),
        ));
        info!(api = %config.api_base_url, "Tailor workflow ready");
        Ok(Self::new(
            client.clone(),
            client.clone(),
            client,
            backend,
            sink,
        ))
    }

    /// Selecting a file (or none) discards every earlier result.
    pub async fn select_file(&self, file: Option<ResumeFile>) {
        self.controller.reset(file).await;
    }

    pub async fn start(
        &self,
        file: Option<ResumeFile>,
        job_description: impl Into<String>,
        target: TargetMatch,
    ) -> Result<SubmissionHandle, AppError> {
        self.controller.start(file, job_description, target).await
    }

    /// Submits the currently selected file.
    pub async fn submit(
        &self,
        job_description: impl Into<String>,
        target: TargetMatch,
    ) -> Result<SubmissionHandle, AppError> {
        let file = self.session.lock().await.selected_file.clone();
        self.controller.start(file, job_description, target).await
    }

    pub async fn export(&self) -> Result<ExportReport, AppError> {
        self.pipeline.export().await
    }

    /// Saves the stored document of `format`.
    pub async fn download(&self, format: DocumentFormat) -> Result<PathBuf, AppError> {
        let document = {
            let session = self.session.lock().await;
            session
                .document(format)
                .filter(|document| session.is_current(document.generation))
                .cloned()
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "No {} document is available to download.",
                        format.extension()
                    ))
                })?
        };
        self.save(document).await
    }

    /// Saves the markup source returned by the last successful submission.
    pub async fn download_source(&self) -> Result<PathBuf, AppError> {
        let source = self.session.lock().await.source.clone().ok_or_else(|| {
            AppError::Validation("No tailored source is available to download.".to_string())
        })?;
        self.save(source).await
    }

    pub async fn clear(&self) {
        self.controller.clear().await;
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    async fn save<D>(&self, item: D) -> Result<PathBuf, AppError>
    where
        D: Downloadable + Send + 'static,
    {
        let emitter = self.emitter.clone();
        let filename = item.download_name().to_string();
        let path = tokio::task::spawn_blocking(move || emitter.emit(&item))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("download task failed: {e}")))??;

        self.sink.notify(WorkflowEvent::DownloadSaved {
            filename,
            path: path.clone(),
        });
        Ok(path)
    }
}
