//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports define the extension points in the hexagonal architecture.
//! They are traits that adapters implement to integrate with external
//! systems (container runtimes, databases, notification sinks, etc.).
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!                    │                         │
//!     ┌──────────────┤  Domain + Port          ├──────────────┐
//!     │              │                         │              │
//!     │              └─────────────────────────┘              │
//!     │                         │                             │
//!     ▼                         ▼                             ▼
//! ┌─────────┐            ┌─────────────┐              ┌───────────┐
//! │ Runtime │            │  Registry   │              │ Notifier  │
//! │ Adapter │            │   Adapter   │              │  Adapter  │
//! └─────────┘            └─────────────┘              └───────────┘
//! ```
//!
//! # Available Ports
//!
//! - [`ContainerRuntime`] - Image build and container lifecycle
//! - [`ArchiveExtractor`] - Unpacking uploaded archives
//! - [`WorkloadRegistry`] - Durable per-tenant workload catalog
//! - [`Notifier`] - Lifecycle event notifications
//! - [`Inbox`] - Per-tenant message list

pub mod outbound;

pub use outbound::archive::{ArchiveExtractor, ExtractError};
pub use outbound::inbox::Inbox;
pub use outbound::notifier::{Event, InboxNotifier, LogNotifier, Notifier, NotifierRegistry, NullNotifier};
pub use outbound::registry::{WorkloadPatch, WorkloadRegistry, WorkloadUpdate};
pub use outbound::runtime::{BuildOutput, ContainerRuntime, ResourceLimits, RunSpec, RuntimeError};
