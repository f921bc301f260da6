//! Berth - multi-tenant workload lifecycle manager.
//!
//! Tenants upload zipped Node.js projects. An operator reviews each upload;
//! approval builds a container image, after which the tenant can start,
//! stop, observe, and delete the workload. Only reviewed code ever runs.
//!
//! # Architecture
//!
//! The crate follows a ports-and-adapters layout:
//!
//! - **`domain`** - Identifiers, workload records, telemetry values
//! - **`port`** - Traits for the container runtime, archive extraction,
//!   the workload registry, tenant inboxes, and notifications
//! - **`adapter`** - Docker CLI, `unzip`, SQLite, and the command line
//! - **`application`** - The [`WorkloadService`] and the build, lifecycle,
//!   and telemetry machinery behind it
//! - **`infrastructure`** - Configuration and wiring
//!
//! # Features
//!
//! - `testkit` - In-memory fakes for the runtime, extractor, and notifier
//!
//! # Example
//!
//! ```no_run
//! use berth::infrastructure::bootstrap::build_service;
//! use berth::infrastructure::config::Config;
//!
//! # async fn demo() -> berth::error::Result<()> {
//! let config = Config::load("berth.toml")?;
//! let service = build_service(&config)?;
//! let zip = std::fs::read("bot.zip")?;
//! service.submit_workload("alice", "bot.zip", &zip, Some("20"), vec![]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`WorkloadService`]: application::WorkloadService

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
