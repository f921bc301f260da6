//! Storage of uploaded archives awaiting review.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::domain::WorkloadKey;
use crate::error::Result;

/// Owns `<pending_dir>/<tenant>/<name>.zip`.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root: PathBuf,
}

impl ArchiveStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Where the archive for `key` is kept.
    #[must_use]
    pub fn path(&self, key: &WorkloadKey) -> PathBuf {
        self.root
            .join(key.tenant.as_str())
            .join(format!("{}.zip", key.name))
    }

    /// Persist archive bytes for `key`, replacing any previous upload.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be written.
    pub async fn save(&self, key: &WorkloadKey, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Remove an archive; a missing file is not an error.
    ///
    /// # Errors
    /// Returns any other I/O error.
    pub async fn remove(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove an archive, logging instead of failing.
    pub async fn discard(&self, path: &Path) {
        if let Err(e) = self.remove(path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove archive");
        }
    }
}
