// Scratch workspace - temporary files the engine reads from and writes to

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::domain::errors::DomainError;

/// Private temporary directory for one encode run
pub struct ScratchSpace {
    dir: TempDir,
}

impl ScratchSpace {
    /// Create a fresh scratch directory under the system temp dir
    pub fn new() -> Result<Self, DomainError> {
        Self::new_in(&std::env::temp_dir())
    }

    /// Create a fresh scratch directory under `root`
    pub fn new_in(root: &Path) -> Result<Self, DomainError> {
        let dir = tempfile::Builder::new()
            .prefix("eproc-")
            .tempdir_in(root)
            .map_err(|e| DomainError::FsFail(format!("Failed to create scratch dir: {}", e)))?;
        debug!("Scratch directory: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write the source bytes
    pub async fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, DomainError> {
        let path = self.file(name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| DomainError::FsFail(format!("Failed to write {}: {}", name, e)))?;
        Ok(path)
    }

    /// Read what the engine produced
    pub async fn read(&self, name: &str) -> Result<Vec<u8>, DomainError> {
        tokio::fs::read(self.file(name)).await.map_err(|e| {
            DomainError::ProcessingError(format!("Encoder produced no {}: {}", name, e))
        })
    }

    /// Remove the directory; failure is ignored
    pub fn cleanup(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            debug!("Ignoring scratch cleanup failure for {}: {}", path.display(), e);
        }
    }
}
