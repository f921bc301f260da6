//! Application services (use cases).
//!
//! These services orchestrate domain logic and coordinate adapters
//! to implement the workload lifecycle.

pub mod archive;
pub mod build;
pub mod lifecycle;
pub mod lock;
pub mod service;
pub mod telemetry;

pub use service::{Decision, ServicePorts, WorkloadService};
pub use telemetry::Subscription;
