//! SQLite persistence adapters.
//!
//! Provides the SQLite-backed workload registry and tenant inbox using
//! Diesel ORM.

pub mod database;
pub mod inbox;
pub mod registry;

pub use inbox::SqliteInbox;
pub use registry::SqliteRegistry;
