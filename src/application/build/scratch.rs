//! Scratch build directories.

use std::path::{Path, PathBuf};

use tracing::warn;

/// A build context directory removed when dropped.
///
/// Removal on drop covers every exit path of a build, including errors
/// and cancellation of the build future.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create `path` fresh, removing anything a crashed build left behind.
    ///
    /// # Errors
    /// Returns the I/O error if the directory cannot be reset.
    pub fn create(path: PathBuf) -> std::io::Result<Self> {
        if path.exists() {
            std::fs::remove_dir_all(&path)?;
        }
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove scratch directory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("alice").join("bot");
        {
            let scratch = ScratchDir::create(path.clone()).unwrap();
            std::fs::write(scratch.path().join("file"), b"x").unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn stale_contents_are_cleared() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("bot");
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("stale"), b"old").unwrap();

        let scratch = ScratchDir::create(path.clone()).unwrap();
        assert!(!scratch.path().join("stale").exists());
    }
}
