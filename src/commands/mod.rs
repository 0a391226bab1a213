//! Entry points the host shell calls. Each command returns a serialisable
//! `CommandResult` so the UI layer never sees `AppError` directly.

pub mod analytics;
pub mod books;
pub mod profile;
pub mod sessions;
pub mod settings;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{error, info, warn};

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::progress::AdvancementOutcome;
use crate::services::analytics_service::AnalyticsService;
use crate::services::book_service::BookService;
use crate::services::goal_progress_service::GoalProgressService;
use crate::services::profile_service::ProfileService;
use crate::services::session_service::SessionService;
use crate::services::settings_service::SettingsService;

#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    profile_service: Arc<ProfileService>,
    goal_progress_service: Arc<GoalProgressService>,
    book_service: Arc<BookService>,
    session_service: Arc<SessionService>,
    analytics_service: Arc<AnalyticsService>,
    settings_service: Arc<SettingsService>,
}

impl AppState {
    pub fn new(db_pool: DbPool) -> Self {
        let settings_service = Arc::new(SettingsService::new(db_pool.clone()));
        let analytics_service = Arc::new(AnalyticsService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
        ));

        Self {
            profile_service: Arc::new(ProfileService::new(db_pool.clone())),
            goal_progress_service: Arc::new(GoalProgressService::new(db_pool.clone())),
            book_service: Arc::new(BookService::new(db_pool.clone())),
            session_service: Arc::new(SessionService::new(db_pool.clone())),
            analytics_service,
            settings_service,
            db_pool,
        }
    }

    /// Startup hook: advances the reading goal if a week has passed.
    pub fn on_app_start(&self, now: DateTime<Utc>) -> AdvancementOutcome {
        let outcome = self.goal_progress_service.run_advancement(now);
        info!(target: "app::startup", outcome = ?outcome, "startup goal check complete");
        outcome
    }

    pub fn profile(&self) -> Arc<ProfileService> {
        Arc::clone(&self.profile_service)
    }

    pub fn goal_progress(&self) -> Arc<GoalProgressService> {
        Arc::clone(&self.goal_progress_service)
    }

    pub fn books(&self) -> Arc<BookService> {
        Arc::clone(&self.book_service)
    }

    pub fn sessions(&self) -> Arc<SessionService> {
        Arc::clone(&self.session_service)
    }

    pub fn analytics(&self) -> Arc<AnalyticsService> {
        Arc::clone(&self.analytics_service)
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation {
                message, details, ..
            } => CommandError::new("VALIDATION_ERROR", message, details),
            AppError::NotFound => {
                CommandError::new("NOT_FOUND", "the requested record does not exist", None)
            }
            AppError::Conflict { message } => CommandError::new("CONFLICT", message, None),
            AppError::InvalidProfileData { message } => {
                warn!(target: "app::command", %message, "invalid profile in command");
                CommandError::new("INVALID_PROFILE", message, None)
            }
            AppError::Database { message } => {
                error!(target: "app::command", %message, "database error in command");
                CommandError::new("STORAGE_ERROR", message, None)
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::new("UNKNOWN", "serialization failed", None)
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::new("UNKNOWN", "file system access failed", None)
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}

pub(crate) fn run<T>(task: impl FnOnce() -> Result<T, AppError>) -> CommandResult<T> {
    task().map_err(CommandError::from)
}
