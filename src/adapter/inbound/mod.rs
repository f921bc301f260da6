//! Inbound adapters: how operators and tenants drive the service.

pub mod cli;
