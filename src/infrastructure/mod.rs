//! Infrastructure layer.
//!
//! Technical concerns that support the application without containing
//! business logic: configuration loading and the composition root.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Wires configuration into a ready [`WorkloadService`](crate::application::WorkloadService)
//! - [`config`] - Configuration loading and validation

pub mod bootstrap;
pub mod config;
