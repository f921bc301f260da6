//! Domain validation errors for workload submissions and transitions.
//!
//! These errors are returned by `parse` constructors and by service
//! operations whose preconditions do not hold. They are always raised before
//! any state is mutated.
//!
//! # Examples
//!
//! ```
//! use berth::domain::error::ValidationError;
//! use berth::domain::id::WorkloadName;
//!
//! let result = WorkloadName::parse("../etc/passwd");
//! assert!(matches!(result, Err(ValidationError::InvalidName { .. })));
//! ```

use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Workload name is empty, too long, or contains forbidden characters.
    #[error("invalid workload name '{name}': {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why the name was rejected.
        reason: &'static str,
    },

    /// Tenant handle cannot be used as an OS user / image namespace.
    #[error("invalid tenant handle '{tenant}': {reason}")]
    InvalidTenant {
        /// The rejected handle.
        tenant: String,
        /// Why the handle was rejected.
        reason: &'static str,
    },

    /// Runtime version tag contains characters an image tag cannot carry.
    #[error("invalid runtime version '{version}'")]
    InvalidRuntimeVersion {
        /// The rejected version.
        version: String,
    },

    /// Environment variable key is empty or malformed.
    #[error("invalid environment variable key '{key}'")]
    InvalidEnvKey {
        /// The rejected key.
        key: String,
    },

    /// A workload with this name already exists for the tenant.
    #[error("workload '{name}' already exists for tenant '{tenant}'")]
    Duplicate {
        /// Owning tenant.
        tenant: String,
        /// Conflicting workload name.
        name: String,
    },

    /// No archive bytes were supplied, or the pending archive is gone.
    #[error("archive missing for workload '{name}'")]
    MissingArchive {
        /// Workload whose archive is missing.
        name: String,
    },

    /// Uploaded archive exceeds the configured size limit.
    #[error("archive is {size} bytes, limit is {limit}")]
    ArchiveTooLarge {
        /// Size of the upload.
        size: u64,
        /// Configured limit.
        limit: u64,
    },

    /// Tenant already holds the maximum number of workloads.
    #[error("tenant '{tenant}' already has {limit} workloads")]
    QuotaExceeded {
        /// Owning tenant.
        tenant: String,
        /// Configured per-tenant limit.
        limit: u32,
    },

    /// Operation requires a built image.
    #[error("workload '{name}' has not been built")]
    NotBuilt {
        /// Workload name.
        name: String,
    },

    /// Review decision on a workload that is not awaiting review.
    #[error("workload '{name}' is not awaiting review")]
    NotPending {
        /// Workload name.
        name: String,
    },

    /// A build for this workload is currently running.
    #[error("a build for workload '{name}' is in progress")]
    BuildInProgress {
        /// Workload name.
        name: String,
    },
}
