use chrono::{NaiveDate, Utc};

use crate::error::AppError;
use crate::models::analytics::WeeklyReadingSummary;

use super::{run, AppState, CommandResult};

/// `reference` is any `YYYY-MM-DD` inside the wanted week; today when absent.
pub fn analytics_weekly_fetch(
    state: &AppState,
    reference: Option<String>,
) -> CommandResult<WeeklyReadingSummary> {
    run(|| {
        let reference = match reference.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|err| AppError::validation(format!("invalid reference date {raw}: {err}")))?,
            _ => Utc::now().date_naive(),
        };
        state.analytics().weekly_summary(reference)
    })
}
