use std::env;
use std::path::{Path, PathBuf};

pub const ENV_DATA_DIR: &str = "READPACE_DATA_DIR";
pub const ENV_LOG_DIR: &str = "READPACE_LOG_DIR";
pub const ENV_LOG_FILTER: &str = "RUST_LOG";

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_DATABASE_FILE: &str = "readpace.sqlite";
pub const DEFAULT_LOG_DIRECTIVES: &str = "info,app::goal=debug,app::db=info";

/// Where the core keeps its database and logs, and how verbose it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub database_file: String,
    pub log_dir: PathBuf,
    pub log_directives: String,
}

impl AppConfig {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        let data_dir = data_dir.into();
        let log_dir = data_dir.join("logs");
        Self {
            data_dir,
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            log_dir,
            log_directives: DEFAULT_LOG_DIRECTIVES.to_string(),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let data_dir = non_empty(ENV_DATA_DIR).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        let mut config = Self::new(data_dir);

        if let Some(log_dir) = non_empty(ENV_LOG_DIR) {
            config.log_dir = PathBuf::from(log_dir);
        }
        if let Some(directives) = non_empty(ENV_LOG_FILTER) {
            config.log_directives = directives;
        }

        config
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}
