use serde::Deserialize;

use crate::error::AppError;
use crate::models::book::{
    BookCreateInput, BookImportInput, BookRecord, BookStatus, BookUpdateInput,
};

use super::{run, AppState, CommandResult};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooksListPayload {
    #[serde(default)]
    pub status: Option<String>,
}

impl BooksListPayload {
    fn status(&self) -> Result<Option<BookStatus>, AppError> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| BookStatus::try_from(s).map_err(AppError::validation))
            .transpose()
    }
}

pub fn books_list(state: &AppState, payload: BooksListPayload) -> CommandResult<Vec<BookRecord>> {
    run(|| {
        let status = payload.status()?;
        state.books().list_books(status)
    })
}

pub fn books_search(state: &AppState, query: String) -> CommandResult<Vec<BookRecord>> {
    run(|| state.books().search_books(&query))
}

pub fn books_create(state: &AppState, payload: BookCreateInput) -> CommandResult<BookRecord> {
    run(|| state.books().create_book(payload))
}

pub fn books_import(state: &AppState, payload: BookImportInput) -> CommandResult<BookRecord> {
    run(|| state.books().import_book(payload))
}

pub fn books_update(
    state: &AppState,
    id: String,
    payload: BookUpdateInput,
) -> CommandResult<BookRecord> {
    run(|| state.books().update_book(&id, payload))
}

pub fn books_delete(state: &AppState, id: String) -> CommandResult<()> {
    run(|| state.books().delete_book(&id))
}
