//! Infrastructure configuration modules.

pub mod logging;
pub mod runtime;
pub mod settings;
pub mod storage;
pub mod telemetry;

pub use logging::LoggingConfig;
pub use runtime::{BuildConfig, EnvInjection, LimitsConfig, RuntimeConfig};
pub use settings::Config;
pub use storage::StorageConfig;
pub use telemetry::TelemetryConfig;
