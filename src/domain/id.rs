//! Domain identifier types with proper encapsulation.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

const MAX_TENANT_LEN: usize = 32;
const MAX_NAME_LEN: usize = 128;

/// Tenant handle - newtype for type safety.
///
/// The handle doubles as the unprivileged OS user inside built images and as
/// the image namespace, so it is lowercased and restricted to
/// `[a-z_][a-z0-9_-]*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(String);

impl TenantId {
    /// Parse and normalize a tenant handle.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidTenant`] if the handle is empty, too
    /// long, or contains characters outside the allowed set.
    pub fn parse(handle: &str) -> Result<Self, ValidationError> {
        let normalized = handle.trim().to_lowercase();
        let invalid = |reason| ValidationError::InvalidTenant {
            tenant: handle.to_string(),
            reason,
        };

        let mut chars = normalized.chars();
        let Some(first) = chars.next() else {
            return Err(invalid("handle is empty"));
        };
        if normalized.len() > MAX_TENANT_LEN {
            return Err(invalid("handle is longer than 32 characters"));
        }
        if !(first.is_ascii_lowercase() || first == '_') {
            return Err(invalid("handle must start with a letter or underscore"));
        }
        if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-') {
            return Err(invalid("handle may only contain a-z, 0-9, '_' and '-'"));
        }

        Ok(Self(normalized))
    }

    /// Get the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Workload name, unique within its tenant.
///
/// Names become a component of the image reference (`<tenant>/<name>`) and
/// the file name of pending archives and scratch directories, so they follow
/// the image repository grammar `[a-z0-9]+([._-][a-z0-9]+)*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkloadName(String);

fn is_name_separator(c: char) -> bool {
    matches!(c, '.' | '_' | '-')
}

impl WorkloadName {
    /// Validate a workload name.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidName`] when the name is empty, too
    /// long, or not a valid image repository component.
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        let invalid = |reason| ValidationError::InvalidName {
            name: name.to_string(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(invalid("name is longer than 128 bytes"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || is_name_separator(c))
        {
            return Err(invalid("name may only contain a-z, 0-9, '.', '_' and '-'"));
        }
        if name.starts_with(is_name_separator) || name.ends_with(is_name_separator) {
            return Err(invalid("name must start and end with a letter or digit"));
        }
        if name
            .as_bytes()
            .windows(2)
            .any(|pair| is_name_separator(char::from(pair[0])) && is_name_separator(char::from(pair[1])))
        {
            return Err(invalid("name cannot contain consecutive separators"));
        }

        Ok(Self(name.to_string()))
    }

    /// Get the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Base name before the first `.`, used as the in-image working directory.
    #[must_use]
    pub fn stem(&self) -> &str {
        self.0.split_once('.').map_or(self.0.as_str(), |(stem, _)| stem)
    }
}

impl fmt::Display for WorkloadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry key: a workload name scoped to its tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkloadKey {
    /// Owning tenant.
    pub tenant: TenantId,
    /// Workload name within the tenant.
    pub name: WorkloadName,
}

impl WorkloadKey {
    /// Create a key from already-validated parts.
    #[must_use]
    pub const fn new(tenant: TenantId, name: WorkloadName) -> Self {
        Self { tenant, name }
    }

    /// Validate raw tenant and name strings into a key.
    ///
    /// # Errors
    /// Returns the first validation failure of either component.
    pub fn parse(tenant: &str, name: &str) -> Result<Self, ValidationError> {
        Ok(Self::new(TenantId::parse(tenant)?, WorkloadName::parse(name)?))
    }

    /// Image reference this workload builds into: `<tenant>/<name>`.
    #[must_use]
    pub fn image(&self) -> ImageRef {
        ImageRef(format!("{}/{}", self.tenant, self.name))
    }
}

impl fmt::Display for WorkloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant, self.name)
    }
}

/// Tag of a built image in the container runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef(String);

impl ImageRef {
    /// Get the image tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque container identifier assigned by the container runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuntimeHandle(String);

impl RuntimeHandle {
    /// Wrap a runtime-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Interpret the persisted representation, where empty means "no container".
    #[must_use]
    pub fn from_persisted(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    /// Get the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a tenant inbox message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Create a new `MessageId` with a generated UUID.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the message ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
