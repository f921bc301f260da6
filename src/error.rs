use std::fmt;

use thiserror::Error;

use crate::domain::error::ValidationError;
use crate::port::outbound::runtime::RuntimeError;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Stage of the build pipeline at which a build failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    /// Scratch directory allocation and build-lock acquisition.
    Prepare,
    /// Archive extraction and project discovery.
    Extract,
    /// Dockerfile / build-context materialization.
    Descriptor,
    /// Image build in the container runtime.
    Image,
}

impl BuildStep {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Extract => "extract",
            Self::Descriptor => "descriptor",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed build. The workload stays awaiting review and its archive is kept.
#[derive(Error, Debug, Clone)]
#[error("build failed at {step}: {message}")]
pub struct BuildError {
    pub step: BuildStep,
    pub message: String,
    /// Diagnostic output of the failing tool, if any.
    pub diagnostics: String,
}

impl BuildError {
    pub fn new(step: BuildStep, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
            diagnostics: String::new(),
        }
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: impl Into<String>) -> Self {
        self.diagnostics = diagnostics.into();
        self
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(#[from] RuntimeError),

    #[error("workload '{name}' not found for tenant '{tenant}'")]
    NotFound { tenant: String, name: String },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Build a [`Error::NotFound`] for a registry key.
    pub fn not_found(key: &crate::domain::WorkloadKey) -> Self {
        Self::NotFound {
            tenant: key.tenant.to_string(),
            name: key.name.to_string(),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Error::Database(err.to_string())
    }
}
