//! Image build pipeline and its build-context artifacts.

pub mod descriptor;
pub mod pipeline;
pub mod scratch;

pub use descriptor::{BuildDescriptor, InstallStep};
pub use pipeline::{BuildArtifact, BuildPipeline};
