//! Archive extraction via the `unzip` tool.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::adapter::outbound::docker::command::exec;
use crate::port::outbound::archive::{ArchiveExtractor, ExtractError};
use crate::port::outbound::runtime::RuntimeError;

/// Extracts zip archives by shelling out to `unzip -o`.
#[derive(Debug, Clone)]
pub struct UnzipExtractor {
    binary: String,
    timeout: Duration,
}

impl UnzipExtractor {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            binary: "unzip".to_string(),
            timeout,
        }
    }

    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

#[async_trait]
impl ArchiveExtractor for UnzipExtractor {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ExtractError> {
        if !archive.is_file() {
            return Err(ExtractError::NotFound(archive.display().to_string()));
        }

        let args = vec![
            "-o".to_string(),
            "-q".to_string(),
            archive.display().to_string(),
            "-d".to_string(),
            dest.display().to_string(),
        ];
        let output = exec(&self.binary, &args, None, self.timeout, "unzip")
            .await
            .map_err(|e| match e {
                RuntimeError::Timeout { after, .. } => ExtractError::Timeout(after),
                other => ExtractError::Unavailable(other.to_string()),
            })?;

        if output.success {
            Ok(())
        } else {
            Err(ExtractError::Corrupt(output.combined().trim().to_string()))
        }
    }
}
