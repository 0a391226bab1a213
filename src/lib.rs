pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use chrono::Utc;
use tracing::info;

use crate::commands::AppState;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::error::AppResult;

/// Boots the core for a host shell: logging, storage, services, then the
/// startup goal check. The returned state backs every command.
pub fn run(config: AppConfig) -> AppResult<AppState> {
    crate::utils::logger::init_logging(&config)?;
    start_core(&config)
}

/// Same as [`run`] without installing a global subscriber.
pub fn start_core(config: &AppConfig) -> AppResult<AppState> {
    std::fs::create_dir_all(&config.data_dir)?;

    let pool = DbPool::new(config.database_path())?;
    let state = AppState::new(pool);
    info!(
        target: "app::startup",
        data_dir = %config.data_dir.display(),
        "application core ready"
    );

    state.on_app_start(Utc::now());
    Ok(state)
}
