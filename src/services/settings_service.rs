use std::sync::RwLock;

use chrono::Utc;
use tracing::{info, warn};

use crate::db::repositories::settings_repository::SettingsRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::settings::{AppSettings, WeekStart};
use crate::utils::time::format_timestamp;

const KEY_WEEK_STARTS_ON: &str = "week_starts_on";
const KEY_YEARLY_BOOK_GOAL: &str = "yearly_book_goal";

const DEFAULT_WEEK_START: WeekStart = WeekStart::Monday;
const DEFAULT_YEARLY_BOOK_GOAL: i64 = 12;
const MAX_YEARLY_BOOK_GOAL: i64 = 1000;

#[derive(Debug, Default, Clone)]
pub struct SettingsUpdateInput {
    pub week_starts_on: Option<String>,
    pub yearly_book_goal: Option<i64>,
}

pub struct SettingsService {
    db: DbPool,
    cache: RwLock<Option<AppSettings>>,
}

impl SettingsService {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            cache: RwLock::new(None),
        }
    }

    pub fn get(&self) -> AppResult<AppSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.as_ref() {
                return Ok(settings.clone());
            }
        }

        let settings = self.load_settings_from_db()?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(settings.clone());
        }
        Ok(settings)
    }

    pub fn update(&self, input: SettingsUpdateInput) -> AppResult<AppSettings> {
        let mut current = self.get()?;

        let week_start = match input.week_starts_on.as_deref() {
            Some(raw) => Some(WeekStart::try_from(raw).map_err(AppError::validation)?),
            None => None,
        };

        if let Some(goal) = input.yearly_book_goal {
            if !(1..=MAX_YEARLY_BOOK_GOAL).contains(&goal) {
                return Err(AppError::validation(format!(
                    "yearly book goal must be between 1 and {MAX_YEARLY_BOOK_GOAL}"
                )));
            }
        }

        let now = format_timestamp(&Utc::now());
        self.db.with_transaction(|tx| {
            if let Some(start) = week_start {
                SettingsRepository::put(tx, KEY_WEEK_STARTS_ON, start.as_str(), &now)?;
            }
            if let Some(goal) = input.yearly_book_goal {
                SettingsRepository::put(tx, KEY_YEARLY_BOOK_GOAL, &goal.to_string(), &now)?;
            }
            Ok(())
        })?;

        if let Some(start) = week_start {
            current.week_starts_on = start;
        }
        if let Some(goal) = input.yearly_book_goal {
            current.yearly_book_goal = goal;
        }
        current.updated_at = Some(now);

        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(current.clone());
        }
        info!(target: "app::settings", week_starts_on = %current.week_starts_on, yearly_book_goal = current.yearly_book_goal, "settings updated");

        Ok(current)
    }

    /// Drops stored preferences so defaults apply again.
    pub fn reset(&self) -> AppResult<AppSettings> {
        self.db.with_transaction(|tx| {
            SettingsRepository::remove(tx, KEY_WEEK_STARTS_ON)?;
            SettingsRepository::remove(tx, KEY_YEARLY_BOOK_GOAL)?;
            Ok(())
        })?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = None;
        }
        self.get()
    }

    fn load_settings_from_db(&self) -> AppResult<AppSettings> {
        let rows = self.db.with_connection(SettingsRepository::all)?;

        let mut settings = AppSettings {
            week_starts_on: DEFAULT_WEEK_START,
            yearly_book_goal: DEFAULT_YEARLY_BOOK_GOAL,
            updated_at: None,
        };

        for row in rows {
            match row.key.as_str() {
                KEY_WEEK_STARTS_ON => match WeekStart::try_from(row.value.as_str()) {
                    Ok(start) => settings.week_starts_on = start,
                    Err(err) => {
                        warn!(target: "app::settings", error = %err, "ignoring stored week start")
                    }
                },
                KEY_YEARLY_BOOK_GOAL => match row.value.trim().parse::<i64>() {
                    Ok(goal) if goal > 0 => settings.yearly_book_goal = goal,
                    _ => {
                        warn!(target: "app::settings", raw = %row.value, "ignoring stored yearly book goal")
                    }
                },
                _ => continue,
            }
            if settings.updated_at.is_none() {
                settings.updated_at = Some(row.updated_at);
            }
        }

        Ok(settings)
    }
}
