//! Transient staging of bundles on disk.
//!
//! A staged bundle is what providers read from. `StageGuard` ties the staging
//! artifact to a scope: dropping the guard releases it exactly once, whether
//! the scope ends normally, through a panic or because the enclosing future
//! was cancelled.

use crate::bundle::LocalizationBundle;
use crate::error::StagingError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Opaque handle to a staged bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageHandle {
    path: PathBuf,
}

impl StageHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Storage medium for staged bundles.
///
/// `release` must not fail: cleanup problems are logged, never returned.
pub trait ResourceStage: Send + Sync {
    fn acquire(&self, bundle: &LocalizationBundle) -> Result<StageHandle, StagingError>;

    fn release(&self, handle: &StageHandle);
}

/// Stages bundles as uniquely named `.arb` files in a directory.
#[derive(Debug, Clone)]
pub struct TempFileStage {
    dir: PathBuf,
}

impl TempFileStage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ResourceStage for TempFileStage {
    fn acquire(&self, bundle: &LocalizationBundle) -> Result<StageHandle, StagingError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StagingError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let json = bundle.to_pretty_json()?;
        let write_error = |source| StagingError::Write {
            path: self.dir.clone(),
            source,
        };

        let mut file = tempfile::Builder::new()
            .prefix("source_")
            .suffix(".arb")
            .tempfile_in(&self.dir)
            .map_err(write_error)?;
        file.write_all(json.as_bytes()).map_err(write_error)?;
        file.flush().map_err(write_error)?;

        let path = file
            .into_temp_path()
            .keep()
            .map_err(|e| write_error(e.error))?;

        debug!("Staged bundle at {}", path.display());
        Ok(StageHandle::new(path))
    }

    fn release(&self, handle: &StageHandle) {
        match std::fs::remove_file(handle.path()) {
            Ok(()) => debug!("Released staged bundle {}", handle.path().display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Staged bundle {} already removed", handle.path().display())
            }
            Err(e) => warn!(
                "Failed to remove staged bundle {}: {}",
                handle.path().display(),
                e
            ),
        }
    }
}

/// Scoped ownership of a staged bundle.
pub struct StageGuard<'a> {
    stage: &'a dyn ResourceStage,
    handle: StageHandle,
}

impl<'a> StageGuard<'a> {
    /// Stage `bundle`; the artifact lives until the guard is dropped.
    pub fn acquire(
        stage: &'a dyn ResourceStage,
        bundle: &LocalizationBundle,
    ) -> Result<Self, StagingError> {
        let handle = stage.acquire(bundle)?;
        Ok(Self { stage, handle })
    }

    pub fn handle(&self) -> &StageHandle {
        &self.handle
    }
}

impl Drop for StageGuard<'_> {
    fn drop(&mut self) {
        self.stage.release(&self.handle);
    }
}
