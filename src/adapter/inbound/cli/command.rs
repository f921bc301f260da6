//! Command-line interface definitions.
//!
//! Each subcommand maps to one operation of the workload service. Tenant
//! and operator commands share one binary; access control is left to
//! whatever fronts it.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

/// Multi-tenant workload lifecycle manager
#[derive(Parser, Debug)]
#[command(name = "berth")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file [default: berth.toml if present]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the berth CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a zipped project for review
    Submit(SubmitArgs),

    /// Approve (build) or reject a pending workload
    Decide(DecideArgs),

    /// Start a built workload
    Start(WorkloadArgs),

    /// Stop a running workload
    Stop(WorkloadArgs),

    /// Delete a workload in any state
    Delete(WorkloadArgs),

    /// Show one workload
    Show(WorkloadArgs),

    /// List a tenant's workloads
    List(TenantArgs),

    /// List workloads awaiting review, oldest first
    Pending,

    /// Show resource usage of a workload
    Stats(FollowArgs),

    /// Show the log buffer of a workload
    Logs(FollowArgs),

    /// Read and clear a tenant's inbox
    Messages(TenantArgs),
}

/// Identifies one workload.
#[derive(Args, Debug, Clone)]
pub struct WorkloadArgs {
    /// Tenant handle
    pub tenant: String,

    /// Workload name (archive file name, e.g. `bot.zip`)
    pub name: String,
}

/// Identifies one tenant.
#[derive(Args, Debug, Clone)]
pub struct TenantArgs {
    /// Tenant handle
    pub tenant: String,
}

/// Arguments for `berth submit`.
#[derive(Args, Debug)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub workload: WorkloadArgs,

    /// Path to the zip archive to upload
    #[arg(long, short = 'a')]
    pub archive: PathBuf,

    /// Runtime version tag of the base image
    #[arg(long)]
    pub runtime_version: Option<String>,

    /// Environment variable passed to the workload (repeatable)
    #[arg(long = "env", short = 'e', value_name = "KEY=VALUE")]
    pub env: Vec<String>,
}

/// Arguments for `berth decide`.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("decision").required(true).args(["approve", "reject"])))]
pub struct DecideArgs {
    #[command(flatten)]
    pub workload: WorkloadArgs,

    /// Build the image and mark the workload runnable
    #[arg(long)]
    pub approve: bool,

    /// Discard the workload and its archive
    #[arg(long)]
    pub reject: bool,
}

/// Arguments for `berth stats` and `berth logs`.
#[derive(Args, Debug)]
pub struct FollowArgs {
    #[command(flatten)]
    pub workload: WorkloadArgs,

    /// Keep streaming updates until interrupted
    #[arg(long, short = 'f')]
    pub follow: bool,
}
