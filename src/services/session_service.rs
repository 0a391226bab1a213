use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::db::repositories::book_repository::{BookRepository, BookRow};
use crate::db::repositories::session_repository::{SessionRepository, SessionRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::book::BookStatus;
use crate::models::session::{ReadingSessionRecord, SessionLogInput};
use crate::services::book_service::{apply_status, clamp_page};
use crate::utils::time::{format_timestamp, parse_input_timestamp};

const MAX_SESSION_MINUTES: i64 = 24 * 60;

pub struct SessionService {
    db: DbPool,
}

impl SessionService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Records a session and moves the linked book's bookmark forward.
    pub fn log_session(&self, input: SessionLogInput) -> AppResult<ReadingSessionRecord> {
        let started_at = parse_input_timestamp("startedAt", &input.started_at)?;
        let ended_at = parse_input_timestamp("endedAt", &input.ended_at)?;
        let duration_minutes = session_minutes(&started_at, &ended_at)?;

        if input.pages_read.is_some_and(|pages| pages < 0) {
            return Err(AppError::validation("pages read cannot be negative"));
        }
        if input.end_page.is_some_and(|page| page < 0) {
            return Err(AppError::validation("end page cannot be negative"));
        }

        let now = format_timestamp(&Utc::now());
        let book_id = input
            .book_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let record = self.db.with_transaction(|tx| {
            let mut pages_read = input.pages_read;
            let mut end_page = input.end_page;

            if let Some(book_id) = book_id.as_deref() {
                let mut book =
                    BookRepository::find_by_id(tx, book_id)?.ok_or_else(AppError::not_found)?;

                if let Some(page) = end_page {
                    let page = clamp_page(page, book.page_count);
                    end_page = Some(page);
                    if pages_read.is_none() && page > book.current_page {
                        pages_read = Some(page - book.current_page);
                    }
                    book.current_page = book.current_page.max(page);
                }
                if book.status == BookStatus::WantToRead {
                    apply_status(&mut book, BookStatus::Reading, &format_timestamp(&started_at));
                }
                book.updated_at = now.clone();
                BookRepository::update(tx, &BookRow::from_record(&book))?;
            }

            let row = SessionRow {
                id: Uuid::new_v4().to_string(),
                book_id: book_id.clone(),
                started_at: format_timestamp(&started_at),
                ended_at: format_timestamp(&ended_at),
                duration_minutes,
                pages_read,
                end_page,
                notes: input
                    .notes
                    .as_ref()
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty()),
                created_at: now.clone(),
            };
            SessionRepository::insert(tx, &row)?;
            Ok(row.into_record())
        })?;

        info!(
            target: "app::sessions",
            session_id = %record.id,
            minutes = record.duration_minutes,
            "reading session logged"
        );
        Ok(record)
    }

    pub fn list_sessions(
        &self,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> AppResult<Vec<ReadingSessionRecord>> {
        if end <= start {
            return Err(AppError::validation("range end must be after range start"));
        }
        let (start, end) = (format_timestamp(start), format_timestamp(end));
        self.db
            .with_connection(|conn| SessionRepository::list_between(conn, &start, &end))
    }

    pub fn list_for_book(&self, book_id: &str) -> AppResult<Vec<ReadingSessionRecord>> {
        self.db
            .with_connection(|conn| SessionRepository::list_for_book(conn, book_id))
    }

    pub fn delete_session(&self, id: &str) -> AppResult<()> {
        self.db
            .with_connection(|conn| SessionRepository::delete(conn, id))?;
        info!(target: "app::sessions", session_id = %id, "reading session deleted");
        Ok(())
    }
}

fn session_minutes(started_at: &DateTime<Utc>, ended_at: &DateTime<Utc>) -> AppResult<i64> {
    if ended_at <= started_at {
        return Err(AppError::validation("session must end after it starts"));
    }
    let minutes = (*ended_at - *started_at).num_minutes();
    if minutes < 1 {
        return Err(AppError::validation("session must last at least one minute"));
    }
    if minutes > MAX_SESSION_MINUTES {
        return Err(AppError::validation("session cannot be longer than a day"));
    }
    Ok(minutes)
}
