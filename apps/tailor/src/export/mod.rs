pub mod classify;
pub mod download;
pub mod pipeline;

pub use classify::{classify_render_response, RenderOutcome};
pub use download::{BlobRef, DownloadBackend, DownloadEmitter, Downloadable, TempFileBackend};
pub use pipeline::{ExportOutcome, ExportPipeline, ExportReport, ExportStage};
