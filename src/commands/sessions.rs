use serde::Deserialize;

use crate::models::session::{ReadingSessionRecord, SessionLogInput};
use crate::utils::time::parse_input_timestamp;

use super::{run, AppState, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsListPayload {
    #[serde(default)]
    pub book_id: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

pub fn sessions_list(
    state: &AppState,
    payload: SessionsListPayload,
) -> CommandResult<Vec<ReadingSessionRecord>> {
    run(|| {
        if let Some(book_id) = payload.book_id.as_deref() {
            return state.sessions().list_for_book(book_id);
        }
        let start = parse_input_timestamp("start", payload.start.as_deref().unwrap_or_default())?;
        let end = parse_input_timestamp("end", payload.end.as_deref().unwrap_or_default())?;
        state.sessions().list_sessions(&start, &end)
    })
}

pub fn sessions_log(
    state: &AppState,
    payload: SessionLogInput,
) -> CommandResult<ReadingSessionRecord> {
    run(|| state.sessions().log_session(payload))
}

pub fn sessions_delete(state: &AppState, id: String) -> CommandResult<()> {
    run(|| state.sessions().delete_session(&id))
}
