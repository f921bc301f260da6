//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`runtime`] provides [`FakeRuntime`](runtime::FakeRuntime), an in-memory container engine
//!   with scripted failures and controllable process counts.
//! - [`extractor`] provides [`FakeExtractor`](extractor::FakeExtractor), writes a fixed project tree.
//! - [`notifier`] provides [`RecordingNotifier`](notifier::RecordingNotifier) for event assertions.
//! - [`config`] provides canonical test configurations.

pub mod config;
pub mod extractor;
pub mod notifier;
pub mod runtime;
