//! On-disk storage locations.

use std::path::PathBuf;

use serde::Deserialize;

/// Environment variable overriding `storage.data_dir`.
pub const DATA_DIR_ENV: &str = "BERTH_DATA_DIR";

/// Storage configuration.
///
/// Everything lives under `data_dir` unless `database` is set explicitly:
///
/// ```text
/// <data_dir>/berth.db               registry database
/// <data_dir>/pending/<tenant>/...   archives awaiting review
/// <data_dir>/build/<tenant>/...     scratch build contexts
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// SQLite database path; defaults to `<data_dir>/berth.db`.
    #[serde(default)]
    pub database: Option<PathBuf>,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("berth"))
        .unwrap_or_else(|| PathBuf::from("berth-data"))
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database: None,
        }
    }
}

impl StorageConfig {
    /// Storage rooted at `data_dir` with default layout.
    #[must_use]
    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            database: None,
        }
    }

    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.data_dir.join("berth.db"))
    }

    /// Connection URL understood by the SQLite pool.
    #[must_use]
    pub fn database_url(&self) -> String {
        self.database_path().display().to_string()
    }

    #[must_use]
    pub fn pending_dir(&self) -> PathBuf {
        self.data_dir.join("pending")
    }

    #[must_use]
    pub fn build_dir(&self) -> PathBuf {
        self.data_dir.join("build")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_at_data_dir() {
        let storage = StorageConfig::at("/srv/berth");
        assert_eq!(storage.database_path(), PathBuf::from("/srv/berth/berth.db"));
        assert_eq!(storage.pending_dir(), PathBuf::from("/srv/berth/pending"));
        assert_eq!(storage.build_dir(), PathBuf::from("/srv/berth/build"));
    }

    #[test]
    fn explicit_database_wins() {
        let storage = StorageConfig {
            data_dir: PathBuf::from("/srv/berth"),
            database: Some(PathBuf::from("/var/lib/berth.db")),
        };
        assert_eq!(storage.database_url(), "/var/lib/berth.db");
    }
}
