//! Result file writer

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;

use crate::domain::errors::DomainError;
use crate::utils::path::output_file_name;

/// Saves encoded results next to each other in an output directory
pub struct ResultWriter;

impl ResultWriter {
    /// Write `bytes` as `EPROC_<source stem>.mp4` inside `dir`.
    ///
    /// The file is written to a temporary sibling and renamed into place, so
    /// an interrupted save never leaves a truncated result. An existing file
    /// with the same name is replaced.
    pub fn save(dir: &Path, source_name: &str, bytes: &[u8]) -> Result<PathBuf, DomainError> {
        if bytes.is_empty() {
            return Err(DomainError::BadArgs("Nothing to save: result is empty".to_string()));
        }

        std::fs::create_dir_all(dir).map_err(|e| {
            DomainError::FsFail(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        let target = dir.join(output_file_name(source_name));
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| {
            DomainError::FsFail(format!("Failed to create temp file in {}: {}", dir.display(), e))
        })?;
        temp.write_all(bytes)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| DomainError::FsFail(format!("Failed to write result: {}", e)))?;
        temp.persist(&target).map_err(|e| {
            DomainError::FsFail(format!("Failed to move result to {}: {}", target.display(), e.error))
        })?;

        info!("Result written: {} ({} bytes)", target.display(), bytes.len());
        Ok(target)
    }
}
