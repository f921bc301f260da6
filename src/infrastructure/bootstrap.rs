//! Infrastructure bootstrap helpers for runtime wiring.

use std::sync::Arc;

use tracing::info;

use crate::adapter::outbound::docker::DockerCli;
use crate::adapter::outbound::sqlite::database::connection::{
    create_pool, enable_wal, run_migrations,
};
use crate::adapter::outbound::sqlite::{SqliteInbox, SqliteRegistry};
use crate::adapter::outbound::unzip::UnzipExtractor;
use crate::application::{ServicePorts, WorkloadService};
use crate::error::Result;
use crate::infrastructure::config::Config;
use crate::port::outbound::inbox::Inbox;
use crate::port::outbound::notifier::{InboxNotifier, LogNotifier, NotifierRegistry};

/// Build the notifier registry: structured logs plus the tenant inbox.
pub(crate) fn build_notifier_registry(inbox: Arc<dyn Inbox>) -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));
    registry.register(Box::new(InboxNotifier::new(inbox)));
    registry
}

/// Open storage and wire the production adapters into a service.
///
/// # Errors
/// Returns an error if the data directory cannot be created or the
/// database cannot be opened or migrated.
pub fn build_service(config: &Config) -> Result<WorkloadService> {
    std::fs::create_dir_all(&config.storage.data_dir)?;
    if let Some(parent) = config.storage.database_path().parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pool = create_pool(&config.storage.database_url())?;
    run_migrations(&pool)?;
    enable_wal(&pool)?;

    let inbox: Arc<dyn Inbox> = Arc::new(SqliteInbox::new(pool.clone()));
    let notifier = build_notifier_registry(Arc::clone(&inbox));
    let runtime = DockerCli::from_config(&config.runtime);

    info!(
        data_dir = %config.storage.data_dir.display(),
        runtime = %config.runtime.binary,
        notifiers = notifier.len(),
        "Workload service ready"
    );

    Ok(WorkloadService::new(
        config,
        ServicePorts {
            registry: Arc::new(SqliteRegistry::new(pool)),
            runtime: Arc::new(runtime),
            extractor: Arc::new(UnzipExtractor::new(config.runtime.build_timeout())),
            inbox,
            notifier: Arc::new(notifier),
        },
    ))
}
