//! Workload record and its review/runtime state.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::id::{ImageRef, RuntimeHandle, TenantId, WorkloadKey, WorkloadName};

/// Runtime version used when the tenant does not declare one.
pub const DEFAULT_RUNTIME_VERSION: &str = "current";

/// Review state of a workload.
///
/// Rejection is not a state: a rejected workload is removed from the
/// registry together with its archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// Uploaded, waiting for an operator decision.
    AwaitingReview,
    /// Image built successfully; runnable.
    Built,
}

impl ReviewState {
    /// Stable identifier used in persistence and output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingReview => "awaiting_review",
            Self::Built => "built",
        }
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting_review" => Ok(Self::AwaitingReview),
            "built" => Ok(Self::Built),
            other => Err(format!("unknown review state '{other}'")),
        }
    }
}

/// Declared base-runtime version tag (e.g. `20`, `lts`, `current`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuntimeVersion(String);

impl RuntimeVersion {
    /// Validate a version tag; `None` yields [`DEFAULT_RUNTIME_VERSION`].
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidRuntimeVersion`] if the tag contains
    /// characters other than ASCII alphanumerics, `.`, `_` and `-`.
    pub fn parse(version: Option<&str>) -> Result<Self, ValidationError> {
        let raw = version.map(str::trim).unwrap_or(DEFAULT_RUNTIME_VERSION);
        let raw = if raw.is_empty() { DEFAULT_RUNTIME_VERSION } else { raw };
        if raw.len() > 64
            || !raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(ValidationError::InvalidRuntimeVersion {
                version: raw.to_string(),
            });
        }
        Ok(Self(raw.to_string()))
    }

    /// Get the version tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RuntimeVersion {
    fn default() -> Self {
        Self(DEFAULT_RUNTIME_VERSION.to_string())
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single environment variable injected into the running workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

impl EnvVar {
    /// Validate a key/value pair.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidEnvKey`] when the key is empty or
    /// contains `=`, whitespace or control characters.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self, ValidationError> {
        let key = key.into();
        if key.is_empty() || key.chars().any(|c| c == '=' || c.is_whitespace() || c.is_control()) {
            return Err(ValidationError::InvalidEnvKey { key });
        }
        Ok(Self {
            key,
            value: value.into(),
        })
    }

    /// Parse a `KEY=value` token.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidEnvKey`] when there is no `=` or
    /// the key is invalid.
    pub fn parse_assignment(token: &str) -> Result<Self, ValidationError> {
        match token.split_once('=') {
            Some((key, value)) => Self::new(key, value),
            None => Err(ValidationError::InvalidEnvKey {
                key: token.to_string(),
            }),
        }
    }

    /// Render as a `KEY=value` token.
    #[must_use]
    pub fn assignment(&self) -> String {
        format!("{}={}", self.key, self.value)
    }
}

/// A tenant's workload as recorded in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    pub tenant: TenantId,
    pub name: WorkloadName,
    pub runtime_version: RuntimeVersion,
    /// Ordered; may be empty.
    pub environment: Vec<EnvVar>,
    pub state: ReviewState,
    /// Advisory cache of the last observed process count.
    pub running: bool,
    /// `None` until the runtime has created a container.
    pub runtime_handle: Option<RuntimeHandle>,
    /// Uploaded archive; present only while awaiting review.
    pub archive_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workload {
    /// Create a freshly uploaded workload awaiting review.
    #[must_use]
    pub fn pending(
        key: WorkloadKey,
        runtime_version: RuntimeVersion,
        environment: Vec<EnvVar>,
        archive_path: PathBuf,
    ) -> Self {
        let now = Utc::now();
        Self {
            tenant: key.tenant,
            name: key.name,
            runtime_version,
            environment,
            state: ReviewState::AwaitingReview,
            running: false,
            runtime_handle: None,
            archive_path: Some(archive_path),
            created_at: now,
            updated_at: now,
        }
    }

    /// Registry key for this workload.
    #[must_use]
    pub fn key(&self) -> WorkloadKey {
        WorkloadKey::new(self.tenant.clone(), self.name.clone())
    }

    /// Image tag this workload builds into.
    #[must_use]
    pub fn image(&self) -> ImageRef {
        self.key().image()
    }

    /// Whether an image has been built for this workload.
    #[must_use]
    pub fn has_build_artifact(&self) -> bool {
        self.state == ReviewState::Built
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state == ReviewState::AwaitingReview
    }
}
