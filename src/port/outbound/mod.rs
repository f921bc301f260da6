//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe infrastructure dependencies such as the container
//! runtime, archive extraction, storage, and notifications.

pub mod archive;
pub mod inbox;
pub mod notifier;
pub mod registry;
pub mod runtime;
