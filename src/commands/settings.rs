use serde::Deserialize;

use crate::models::settings::AppSettings;
use crate::services::settings_service::SettingsUpdateInput;

use super::{run, AppState, CommandResult};

pub fn settings_get(state: &AppState) -> CommandResult<AppSettings> {
    run(|| state.settings().get())
}

/// Restores defaults when `reset` is set, otherwise applies the update.
pub fn settings_update(
    state: &AppState,
    payload: SettingsUpdatePayload,
) -> CommandResult<AppSettings> {
    if payload.reset == Some(true) {
        return run(|| state.settings().reset());
    }
    let input = payload.into_input();
    run(|| state.settings().update(input))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdatePayload {
    #[serde(default)]
    pub week_starts_on: Option<String>,
    #[serde(default)]
    pub yearly_book_goal: Option<i64>,
    #[serde(default)]
    pub reset: Option<bool>,
}

impl SettingsUpdatePayload {
    fn into_input(self) -> SettingsUpdateInput {
        SettingsUpdateInput {
            week_starts_on: self.week_starts_on,
            yearly_book_goal: self.yearly_book_goal,
        }
    }
}
