//! A workload service wired to fakes and a throwaway SQLite database.

use std::path::PathBuf;
use std::sync::Arc;

use berth::adapter::outbound::sqlite::database::connection::{
    create_pool, enable_wal, run_migrations,
};
use berth::adapter::outbound::sqlite::{SqliteInbox, SqliteRegistry};
use berth::application::{ServicePorts, WorkloadService};
use berth::domain::{EnvVar, Workload, WorkloadKey};
use berth::infrastructure::config::Config;
use berth::port::outbound::inbox::Inbox;
use berth::port::outbound::notifier::{InboxNotifier, NotifierRegistry};
use berth::port::outbound::registry::WorkloadRegistry;
use berth::testkit::config::rooted_at;
use berth::testkit::extractor::FakeExtractor;
use berth::testkit::notifier::RecordingNotifier;
use berth::testkit::runtime::FakeRuntime;
use tempfile::TempDir;

pub const ARCHIVE: &[u8] = b"PK\x03\x04 fake zip payload";

pub struct TestEnv {
    pub dir: TempDir,
    pub config: Config,
    pub service: WorkloadService,
    pub runtime: Arc<FakeRuntime>,
    pub extractor: Arc<FakeExtractor>,
    pub registry: Arc<SqliteRegistry>,
    pub events: RecordingNotifier,
}

impl TestEnv {
    /// Service over a Node project without a lockfile.
    pub fn new() -> Self {
        Self::with_extractor(FakeExtractor::node_project())
    }

    pub fn with_extractor(extractor: FakeExtractor) -> Self {
        Self::build(extractor, |_| {})
    }

    /// Service with a tweaked configuration.
    pub fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        Self::build(FakeExtractor::node_project(), tweak)
    }

    fn build(extractor: FakeExtractor, tweak: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut config = rooted_at(dir.path());
        tweak(&mut config);

        let pool = create_pool(&config.storage.database_url()).expect("create pool");
        run_migrations(&pool).expect("run migrations");
        enable_wal(&pool).expect("enable wal");

        let registry = Arc::new(SqliteRegistry::new(pool.clone()));
        let inbox: Arc<dyn Inbox> = Arc::new(SqliteInbox::new(pool));
        let runtime = Arc::new(FakeRuntime::new());
        let extractor = Arc::new(extractor);
        let events = RecordingNotifier::new();

        let mut notifier = NotifierRegistry::new();
        notifier.register(Box::new(InboxNotifier::new(Arc::clone(&inbox))));
        notifier.register(Box::new(events.clone()));

        let service = WorkloadService::new(
            &config,
            ServicePorts {
                registry: registry.clone(),
                runtime: runtime.clone(),
                extractor: extractor.clone(),
                inbox,
                notifier: Arc::new(notifier),
            },
        );

        Self {
            dir,
            config,
            service,
            runtime,
            extractor,
            registry,
            events,
        }
    }

    pub fn archive_path(&self, tenant: &str, name: &str) -> PathBuf {
        self.config
            .storage
            .pending_dir()
            .join(tenant)
            .join(format!("{name}.zip"))
    }

    pub fn scratch_path(&self, tenant: &str, name: &str) -> PathBuf {
        self.config.storage.build_dir().join(tenant).join(name)
    }

    pub async fn submit(&self, tenant: &str, name: &str) -> Workload {
        self.service
            .submit_workload(tenant, name, ARCHIVE, None, vec![])
            .await
            .expect("submit workload")
    }

    /// Submit and approve, returning the built record.
    pub async fn built(&self, tenant: &str, name: &str) -> Workload {
        self.submit(tenant, name).await;
        self.service
            .decide(tenant, name, true)
            .await
            .expect("approve workload");
        self.service.get(tenant, name).await.expect("get workload")
    }

    /// Submit, approve and start, returning the running record.
    pub async fn running(&self, tenant: &str, name: &str) -> Workload {
        self.built(tenant, name).await;
        self.service.start(tenant, name).await.expect("start workload")
    }

    /// Registry view bypassing the service.
    pub async fn stored(&self, tenant: &str, name: &str) -> Option<Workload> {
        let key = WorkloadKey::parse(tenant, name).expect("valid key");
        self.registry.get(&key).await.expect("registry get")
    }
}

pub fn env_var(key: &str, value: &str) -> EnvVar {
    EnvVar::new(key, value).expect("valid env var")
}
