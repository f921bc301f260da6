//! Archive-to-image build pipeline.
//!
//! ```text
//! pending archive --extract--> scratch dir --Dockerfile--> build context
//!                                                              |
//!                                       ContainerRuntime::build_image
//!                                                              v
//!                                                    <tenant>/<name> image
//! ```
//!
//! The pipeline never touches the registry. The scratch directory is removed
//! on every exit path; the archive is left for the caller to dispose of once
//! the outcome has been recorded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::descriptor::{BuildDescriptor, InstallStep, DOCKERIGNORE, LOCKFILE};
use super::scratch::ScratchDir;
use crate::domain::{ImageRef, Workload};
use crate::error::{BuildError, BuildStep};
use crate::infrastructure::config::EnvInjection;
use crate::port::outbound::archive::ArchiveExtractor;
use crate::port::outbound::runtime::{ContainerRuntime, RuntimeError};

/// Manifest every project root must contain.
pub const MANIFEST: &str = "package.json";

/// Directory entries archivers add that are not part of the project.
const IGNORED_ENTRIES: [&str; 1] = ["__MACOSX"];

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct BuildArtifact {
    pub image: ImageRef,
    pub descriptor: BuildDescriptor,
    /// Runtime build log.
    pub log: String,
}

/// Turns a pending workload's archive into a runnable image.
pub struct BuildPipeline {
    runtime: Arc<dyn ContainerRuntime>,
    extractor: Arc<dyn ArchiveExtractor>,
    build_root: PathBuf,
    injection: EnvInjection,
}

impl BuildPipeline {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        extractor: Arc<dyn ArchiveExtractor>,
        build_root: PathBuf,
        injection: EnvInjection,
    ) -> Self {
        Self {
            runtime,
            extractor,
            build_root,
            injection,
        }
    }

    /// Scratch directory used for a workload's build context.
    #[must_use]
    pub fn scratch_path(&self, workload: &Workload) -> PathBuf {
        self.build_root
            .join(workload.tenant.as_str())
            .join(workload.name.as_str())
    }

    /// Build the workload's image.
    ///
    /// Callers must hold the workload's build lock.
    ///
    /// # Errors
    /// Returns a [`BuildError`] naming the step that failed.
    #[instrument(skip(self, workload), fields(workload = %workload.key()))]
    pub async fn build(&self, workload: &Workload) -> Result<BuildArtifact, BuildError> {
        let archive = workload.archive_path.as_deref().ok_or_else(|| {
            BuildError::new(BuildStep::Prepare, "no archive recorded for workload")
        })?;

        let scratch = ScratchDir::create(self.scratch_path(workload)).map_err(|e| {
            BuildError::new(BuildStep::Prepare, "failed to create build directory")
                .with_diagnostics(e.to_string())
        })?;
        debug!(path = %scratch.path().display(), "Build directory ready");

        self.extractor
            .extract(archive, scratch.path())
            .await
            .map_err(|e| {
                BuildError::new(BuildStep::Extract, "failed to extract archive")
                    .with_diagnostics(e.to_string())
            })?;
        let project = locate_project(scratch.path()).await?;

        let install = InstallStep::for_lockfile(
            tokio::fs::try_exists(project.join(LOCKFILE))
                .await
                .unwrap_or(false),
        );
        let descriptor = BuildDescriptor::new(workload, install, self.injection);
        write_context(&project, &descriptor).await?;

        let image = workload.image();
        let output = self
            .runtime
            .build_image(&project, &image)
            .await
            .map_err(|e| image_error(&e))?;

        info!(image = %image, install = install.command(), "Image built");
        Ok(BuildArtifact {
            image,
            descriptor,
            log: output.log,
        })
    }
}

/// Find the project root inside an extraction directory.
///
/// Accepts the manifest at the top level or inside a single top-level
/// directory.
async fn locate_project(root: &Path) -> Result<PathBuf, BuildError> {
    if is_file(&root.join(MANIFEST)).await {
        return Ok(root.to_path_buf());
    }

    let io_error = |e: std::io::Error| {
        BuildError::new(BuildStep::Extract, "failed to read extracted archive")
            .with_diagnostics(e.to_string())
    };
    let mut entries = tokio::fs::read_dir(root).await.map_err(io_error)?;
    let mut dirs = Vec::new();
    let mut files = 0usize;
    while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
        let name = entry.file_name();
        if IGNORED_ENTRIES.iter().any(|ignored| name == *ignored) {
            continue;
        }
        if entry.file_type().await.map_err(io_error)?.is_dir() {
            dirs.push(entry.path());
        } else {
            files += 1;
        }
    }

    match dirs.as_slice() {
        [single] if files == 0 && is_file(&single.join(MANIFEST)).await => Ok(single.clone()),
        _ => Err(BuildError::new(
            BuildStep::Extract,
            format!("archive must contain a single project with {MANIFEST} at its root"),
        )),
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn write_context(project: &Path, descriptor: &BuildDescriptor) -> Result<(), BuildError> {
    let descriptor_error = |e: std::io::Error| {
        BuildError::new(BuildStep::Descriptor, "failed to write build context")
            .with_diagnostics(e.to_string())
    };
    tokio::fs::write(project.join("Dockerfile"), descriptor.render())
        .await
        .map_err(descriptor_error)?;
    tokio::fs::write(project.join(".dockerignore"), DOCKERIGNORE)
        .await
        .map_err(descriptor_error)?;
    Ok(())
}

fn image_error(err: &RuntimeError) -> BuildError {
    match err {
        RuntimeError::Timeout { after, .. } => {
            BuildError::new(BuildStep::Image, format!("image build timed out after {after:?}"))
        }
        RuntimeError::CommandFailed { stderr, .. } => {
            BuildError::new(BuildStep::Image, "image build failed").with_diagnostics(stderr.clone())
        }
        other => BuildError::new(BuildStep::Image, "container runtime unavailable")
            .with_diagnostics(other.to_string()),
    }
}
