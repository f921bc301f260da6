//! Archive extraction port.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Failure to unpack an uploaded archive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("archive not found: {0}")]
    NotFound(String),

    #[error("extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error("archive could not be extracted: {0}")]
    Corrupt(String),

    #[error("extractor unavailable: {0}")]
    Unavailable(String),
}

/// Unpacks an uploaded archive into a directory.
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    /// Extract `archive` into `dest`, overwriting existing files.
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ExtractError>;
}
