//! Writing fetched artifacts to disk.

use std::path::PathBuf;

use super::validate::{sanitize_filename, ValidationError};
use crate::models::{ArtifactFile, ArtifactKind};

/// Errors raised while writing an artifact
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("Invalid file name: {0}")]
    InvalidFileName(#[from] ValidationError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes artifacts into one output directory, truncating existing files
#[derive(Debug, Clone)]
pub struct Persister {
    output_dir: PathBuf,
}

impl Persister {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Write `bytes` to `{output_dir}/{file_name}`
    pub fn persist(
        &self,
        bytes: &[u8],
        file_name: &str,
        kind: ArtifactKind,
        strategy: &str,
    ) -> Result<ArtifactFile, PersistError> {
        let file_name = sanitize_filename(file_name)?;

        std::fs::create_dir_all(&self.output_dir).map_err(|source| PersistError::Io {
            path: self.output_dir.clone(),
            source,
        })?;

        let path = self.output_dir.join(&file_name);
        std::fs::write(&path, bytes).map_err(|source| PersistError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), %kind, "wrote artifact");

        Ok(ArtifactFile {
            path,
            bytes: bytes.len() as u64,
            kind,
            strategy: strategy.to_string(),
        })
    }
}
