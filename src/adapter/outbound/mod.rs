//! Outbound adapters implementing the ports in `crate::port::outbound`.

pub mod docker;
pub mod sqlite;
pub mod unzip;
