//! Hands documents to the user's save mechanism.
//!
//! Every emission acquires a temporary blob, triggers the save, and releases
//! the blob exactly once, whether the save succeeded, failed or panicked.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::document::SOURCE_CONTENT_TYPE;
use crate::models::{DocumentSource, TailoredDocument};

const FALLBACK_DOWNLOAD_NAME: &str = "download";

/// Anything that can be saved as a named file.
pub trait Downloadable {
    fn download_name(&self) -> &str;
    fn mime_type(&self) -> &str;
    fn payload(&self) -> Bytes;
}

impl Downloadable for TailoredDocument {
    fn download_name(&self) -> &str {
        &self.filename
    }

    fn mime_type(&self) -> &str {
        self.format.content_type()
    }

    fn payload(&self) -> Bytes {
        self.content.clone()
    }
}

impl Downloadable for DocumentSource {
    fn download_name(&self) -> &str {
        &self.filename
    }

    fn mime_type(&self) -> &str {
        SOURCE_CONTENT_TYPE
    }

    fn payload(&self) -> Bytes {
        Bytes::from(self.content.clone())
    }
}

/// Handle to a temporary blob owned by a `DownloadBackend`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    pub id: Uuid,
    pub path: PathBuf,
    pub mime_type: String,
}

/// The platform side of a download.
pub trait DownloadBackend: Send + Sync {
    fn acquire(&self, item: &dyn Downloadable) -> Result<BlobRef, AppError>;
    /// Saves the blob under `filename` and returns where it landed.
    fn trigger_save(&self, blob: &BlobRef, filename: &str) -> Result<PathBuf, AppError>;
    fn release(&self, blob: BlobRef);
}

struct BlobGuard<'a> {
    backend: &'a dyn DownloadBackend,
    blob: Option<BlobRef>,
}

impl Drop for BlobGuard<'_> {
    fn drop(&mut self) {
        if let Some(blob) = self.blob.take() {
            debug!(blob_id = %blob.id, "releasing download blob");
            self.backend.release(blob);
        }
    }
}

#[derive(Clone)]
pub struct DownloadEmitter {
    backend: Arc<dyn DownloadBackend>,
}

impl DownloadEmitter {
    pub fn new(backend: Arc<dyn DownloadBackend>) -> Self {
        Self { backend }
    }

    pub fn emit(&self, item: &dyn Downloadable) -> Result<PathBuf, AppError> {
        let blob = self.backend.acquire(item)?;
        let guard = BlobGuard {
            backend: self.backend.as_ref(),
            blob: Some(blob.clone()),
        };

        let saved = self.backend.trigger_save(&blob, item.download_name());
        drop(guard);

        let path = saved?;
        info!(filename = item.download_name(), path = %path.display(), "download saved");
        Ok(path)
    }
}

/// Stages blobs as temp files and saves by copying into a download directory.
#[derive(Debug, Clone)]
pub struct TempFileBackend {
    staging_dir: PathBuf,
    download_dir: PathBuf,
}

impl TempFileBackend {
    pub fn new(staging_dir: impl Into<PathBuf>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            download_dir: download_dir.into(),
        }
    }
}

/// Strips any directory components so a save can't escape the download dir.
fn sanitize_filename(filename: &str) -> &str {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(FALLBACK_DOWNLOAD_NAME)
}

impl DownloadBackend for TempFileBackend {
    fn acquire(&self, item: &dyn Downloadable) -> Result<BlobRef, AppError> {
        fs::create_dir_all(&self.staging_dir)?;
        let mut file = tempfile::Builder::new()
            .prefix("tailor-")
            .tempfile_in(&self.staging_dir)?;
        file.write_all(&item.payload())?;
        file.flush()?;
        let (_, path) = file.keep().map_err(|e| AppError::Io(e.error))?;

        Ok(BlobRef {
            id: Uuid::new_v4(),
            path,
            mime_type: item.mime_type().to_string(),
        })
    }

    fn trigger_save(&self, blob: &BlobRef, filename: &str) -> Result<PathBuf, AppError> {
        fs::create_dir_all(&self.download_dir)?;
        let target = self.download_dir.join(sanitize_filename(filename));
        fs::copy(&blob.path, &target)?;
        Ok(target)
    }

    fn release(&self, blob: BlobRef) {
        if let Err(e) = fs::remove_file(&blob.path) {
            warn!(blob_id = %blob.id, "failed to remove staged blob {}: {e}", blob.path.display());
        }
    }
}
