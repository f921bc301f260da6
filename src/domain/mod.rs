//! Runtime-agnostic domain types: identifiers, workload records, telemetry.

pub mod error;
pub mod id;
pub mod message;
pub mod stats;
pub mod workload;

pub use error::ValidationError;
pub use id::{ImageRef, MessageId, RuntimeHandle, TenantId, WorkloadKey, WorkloadName};
pub use message::Message;
pub use stats::{LogChunk, ResourceUsage, StatSnapshot, WorkloadStatus};
pub use workload::{EnvVar, ReviewState, RuntimeVersion, Workload, DEFAULT_RUNTIME_VERSION};
