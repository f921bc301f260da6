//! Adapters connecting the application to the outside world.
//!
//! - `inbound`: the command-line interface
//! - `outbound`: container runtime, archive extraction, and SQLite storage

pub mod inbound;
pub mod outbound;
