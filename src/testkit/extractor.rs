//! Scripted [`ArchiveExtractor`] for tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::port::outbound::archive::{ArchiveExtractor, ExtractError};

/// Writes a fixed file tree instead of unpacking the archive.
pub struct FakeExtractor {
    files: Vec<(PathBuf, String)>,
    failure: Mutex<Option<ExtractError>>,
    calls: AtomicUsize,
}

impl FakeExtractor {
    /// An extractor producing the given `(relative path, contents)` files.
    pub fn with_files<P: Into<PathBuf>, S: Into<String>>(files: Vec<(P, S)>) -> Self {
        Self {
            files: files
                .into_iter()
                .map(|(path, body)| (path.into(), body.into()))
                .collect(),
            failure: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// A minimal Node project without a lockfile.
    pub fn node_project() -> Self {
        Self::with_files(vec![
            ("package.json", r#"{"name":"bot","main":"index.js"}"#),
            ("index.js", "console.log('hello');\n"),
        ])
    }

    /// A Node project pinned by `package-lock.json`.
    pub fn locked_node_project() -> Self {
        Self::with_files(vec![
            ("package.json", r#"{"name":"bot","main":"index.js"}"#),
            ("package-lock.json", r#"{"lockfileVersion":3}"#),
            ("index.js", "console.log('hello');\n"),
        ])
    }

    /// A Node project wrapped in a single top-level directory.
    pub fn nested_node_project(dir: &str) -> Self {
        Self::with_files(vec![
            (format!("{dir}/package.json"), r#"{"name":"bot"}"#.to_string()),
            (format!("{dir}/index.js"), "console.log('hello');\n".to_string()),
        ])
    }

    /// Make the next extraction fail.
    pub fn fail_next(&self, error: ExtractError) {
        *self.failure.lock() = Some(error);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArchiveExtractor for FakeExtractor {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failure.lock().take() {
            return Err(err);
        }
        if !archive.is_file() {
            return Err(ExtractError::NotFound(archive.display().to_string()));
        }

        for (path, body) in &self.files {
            let target = dest.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ExtractError::Corrupt(e.to_string()))?;
            }
            std::fs::write(&target, body).map_err(|e| ExtractError::Corrupt(e.to_string()))?;
        }
        Ok(())
    }
}
