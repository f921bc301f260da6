//! Dispatch of parsed CLI commands to the workload service.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use super::command::{Cli, Commands, DecideArgs, FollowArgs, SubmitArgs, TenantArgs, WorkloadArgs};
use super::output;
use crate::application::{Decision, WorkloadService};
use crate::domain::{EnvVar, LogChunk, StatSnapshot, Workload};
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::Config;

/// Configuration file picked up from the working directory when `--config`
/// is not given.
pub const DEFAULT_CONFIG_FILE: &str = "berth.toml";

/// Resolve the configuration: an explicit path must exist, the implicit
/// default file is optional.
///
/// # Errors
/// Returns an error if the file cannot be read, parsed, or validated.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let config = match explicit {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if path.exists() {
                Config::load(&path)
                    .with_context(|| format!("failed to load config from {}", path.display()))?
            } else {
                Config::parse_toml("")?
            }
        }
    };
    Ok(config)
}

/// Execute one CLI invocation.
///
/// # Errors
/// Returns the first error of the underlying operation.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    output::configure(output::OutputConfig::new(cli.json, cli.quiet, cli.verbose));

    let config = load_config(cli.config.as_deref())?;
    config.init_logging();
    let service = bootstrap::build_service(&config).context("failed to open workload storage")?;

    match cli.command {
        Commands::Submit(args) => submit(&service, args).await,
        Commands::Decide(args) => decide(&service, args).await,
        Commands::Start(args) => {
            let workload = service.start(&args.tenant, &args.name).await?;
            show_workload(&format!("Started {}", workload.key()), &workload);
            Ok(())
        }
        Commands::Stop(args) => {
            let workload = service.stop(&args.tenant, &args.name).await?;
            show_workload(&format!("Stopped {}", workload.key()), &workload);
            Ok(())
        }
        Commands::Delete(args) => {
            let workload = service.delete(&args.tenant, &args.name).await?;
            if !output::record("deleted", &workload.key()) {
                output::success(&format!("Deleted {}", workload.key()));
            }
            Ok(())
        }
        Commands::Show(WorkloadArgs { tenant, name }) => {
            let workload = service.get(&tenant, &name).await?;
            if !output::record("workload", &workload) {
                output::section(&workload.key().to_string());
                workload_fields(&workload);
            }
            Ok(())
        }
        Commands::List(TenantArgs { tenant }) => list(&service, &tenant).await,
        Commands::Pending => pending(&service).await,
        Commands::Stats(args) => stats(&service, args).await,
        Commands::Logs(args) => logs(&service, args).await,
        Commands::Messages(TenantArgs { tenant }) => messages(&service, &tenant),
    }
}

async fn submit(service: &WorkloadService, args: SubmitArgs) -> anyhow::Result<()> {
    let archive = tokio::fs::read(&args.archive)
        .await
        .with_context(|| format!("failed to read archive {}", args.archive.display()))?;
    let environment = args
        .env
        .iter()
        .map(|token| EnvVar::parse_assignment(token))
        .collect::<Result<Vec<_>, _>>()?;

    let workload = service
        .submit_workload(
            &args.workload.tenant,
            &args.workload.name,
            &archive,
            args.runtime_version.as_deref(),
            environment,
        )
        .await?;

    show_workload(&format!("Submitted {} for review", workload.key()), &workload);
    Ok(())
}

async fn decide(service: &WorkloadService, args: DecideArgs) -> anyhow::Result<()> {
    let WorkloadArgs { tenant, name } = args.workload;
    debug!(%tenant, %name, approve = args.approve, "Recording review decision");

    match service.decide(&tenant, &name, args.approve).await? {
        Decision::Approved { workload, image } => {
            let payload = serde_json::json!({ "workload": workload, "image": image });
            if !output::record("approved", &payload) {
                output::success(&format!("Approved {}", workload.key()));
                output::field("Image", &image);
                output::hint(&format!("run `berth start {tenant} {name}` to launch it"));
            }
        }
        Decision::Rejected { workload } => {
            if !output::record("rejected", &workload.key()) {
                output::success(&format!("Rejected {}", workload.key()));
            }
        }
    }
    Ok(())
}

async fn list(service: &WorkloadService, tenant: &str) -> anyhow::Result<()> {
    let workloads = service.list(tenant).await?;
    if output::is_json() {
        for workload in &workloads {
            output::record("workload", workload);
        }
        return Ok(());
    }
    if workloads.is_empty() {
        output::note(&format!("No workloads for {tenant}"));
        return Ok(());
    }

    let widths = [24, 16, 8, 14];
    output::table_header(&[
        ("NAME", widths[0]),
        ("STATE", widths[1]),
        ("RUNNING", widths[2]),
        ("HANDLE", widths[3]),
    ]);
    output::table_separator(&widths);
    for workload in &workloads {
        output::table_row(
            &[
                workload.name.to_string(),
                workload.state.to_string(),
                workload.running.to_string(),
                workload
                    .runtime_handle
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string),
            ],
            &widths,
        );
    }
    Ok(())
}

async fn pending(service: &WorkloadService) -> anyhow::Result<()> {
    let keys = service.list_pending_reviews().await?;
    if output::is_json() {
        for key in &keys {
            output::record("pending", key);
        }
        return Ok(());
    }
    if keys.is_empty() {
        output::note("Nothing awaiting review");
        return Ok(());
    }

    let widths = [16, 24];
    output::table_header(&[("TENANT", widths[0]), ("NAME", widths[1])]);
    output::table_separator(&widths);
    for key in &keys {
        output::table_row(&[key.tenant.to_string(), key.name.to_string()], &widths);
    }
    Ok(())
}

async fn stats(service: &WorkloadService, args: FollowArgs) -> anyhow::Result<()> {
    let WorkloadArgs { tenant, name } = args.workload;
    if !args.follow {
        let snapshot = service.get_stats(&tenant, &name).await?;
        show_stats(&snapshot);
        return Ok(());
    }

    let mut subscription = service.subscribe_stats(&tenant, &name).await?;
    loop {
        tokio::select! {
            next = subscription.next() => match next {
                Some(snapshot) => show_stats(&snapshot),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

async fn logs(service: &WorkloadService, args: FollowArgs) -> anyhow::Result<()> {
    let WorkloadArgs { tenant, name } = args.workload;
    if !args.follow {
        let lines = service.get_logs(&tenant, &name).await?;
        show_logs(&LogChunk { reset: true, lines });
        return Ok(());
    }

    let mut subscription = service.subscribe_logs(&tenant, &name).await?;
    loop {
        tokio::select! {
            next = subscription.next() => match next {
                Some(chunk) => show_logs(&chunk),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn messages(service: &WorkloadService, tenant: &str) -> anyhow::Result<()> {
    let messages = service.drain_messages(tenant)?;
    if output::is_json() {
        for message in &messages {
            output::record("message", message);
        }
        return Ok(());
    }
    if messages.is_empty() {
        output::note("Inbox is empty");
        return Ok(());
    }

    for message in &messages {
        output::field(
            &message.created_at.format("%Y-%m-%d %H:%M").to_string(),
            format!("{}: {}", message.author, message.body),
        );
    }
    Ok(())
}

fn show_workload(headline: &str, workload: &Workload) {
    if output::record("workload", workload) {
        return;
    }
    output::success(headline);
    workload_fields(workload);
}

fn workload_fields(workload: &Workload) {
    output::field("State", workload.state);
    output::field(
        "Running",
        if workload.running {
            output::positive("yes")
        } else {
            output::muted("no")
        },
    );
    output::field("Runtime", &workload.runtime_version);
    if let Some(handle) = &workload.runtime_handle {
        output::field("Container", handle);
    }
    if !workload.environment.is_empty() {
        let keys: Vec<&str> = workload.environment.iter().map(|e| e.key.as_str()).collect();
        output::field("Env", keys.join(", "));
    }
    output::field("Updated", workload.updated_at.to_rfc3339());
}

fn show_stats(snapshot: &StatSnapshot) {
    if output::record("stats", snapshot) {
        return;
    }
    output::section(&format!("{}/{} ({})", snapshot.tenant, snapshot.name, snapshot.status));
    output::field("CPU", format!("{:.2}%", snapshot.usage.cpu_percent));
    output::field(
        "Memory",
        format!(
            "{} ({:.2}%)",
            snapshot.usage.memory_usage, snapshot.usage.memory_percent
        ),
    );
    output::field("Block I/O", &snapshot.usage.block_io);
    output::field("Net I/O", &snapshot.usage.net_io);
    output::field("PIDs", snapshot.usage.pids);
}

fn show_logs(chunk: &LogChunk) {
    if output::record("logs", chunk) {
        return;
    }
    if chunk.reset && output::verbosity() > 0 {
        output::note("(log buffer)");
    }
    for line in &chunk.lines {
        output::line(line);
    }
}
