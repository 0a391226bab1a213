use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::repositories::book_repository::{BookRepository, BookRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::book::{
    BookCreateInput, BookImportInput, BookRecord, BookSource, BookStatus, BookUpdateInput,
};
use crate::utils::time::format_timestamp;

const MAX_TITLE_CHARS: usize = 300;
const SEARCH_LIMIT: usize = 50;

pub struct BookService {
    db: DbPool,
}

impl BookService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn create_book(&self, input: BookCreateInput) -> AppResult<BookRecord> {
        let now = format_timestamp(&Utc::now());
        let status = input.status.unwrap_or(BookStatus::WantToRead);
        let page_count = validate_page_count(input.page_count)?;
        let mut record = BookRecord {
            id: Uuid::new_v4().to_string(),
            title: normalize_title(&input.title)?,
            author: normalize_optional(input.author),
            isbn: normalize_isbn(input.isbn)?,
            page_count,
            current_page: 0,
            cover_url: normalize_optional(input.cover_url),
            status: BookStatus::WantToRead,
            rating: validate_rating(input.rating)?,
            source: BookSource::Manual,
            started_at: None,
            finished_at: None,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        apply_status(&mut record, status, &now);

        self.db
            .with_connection(|conn| BookRepository::insert(conn, &BookRow::from_record(&record)))?;
        info!(target: "app::books", book_id = %record.id, "book created");
        Ok(record)
    }

    /// Stores metadata fetched elsewhere; an ISBN already on the shelf is a conflict.
    pub fn import_book(&self, input: BookImportInput) -> AppResult<BookRecord> {
        let now = format_timestamp(&Utc::now());
        let isbn = normalize_isbn(input.isbn)?;
        let authors: Vec<String> = input
            .authors
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        let record = BookRecord {
            id: Uuid::new_v4().to_string(),
            title: normalize_title(&input.title)?,
            author: if authors.is_empty() {
                None
            } else {
                Some(authors.join(", "))
            },
            isbn,
            page_count: validate_page_count(input.page_count)?,
            current_page: 0,
            cover_url: normalize_optional(input.cover_url),
            status: BookStatus::WantToRead,
            rating: None,
            source: BookSource::Import,
            started_at: None,
            finished_at: None,
            created_at: now.clone(),
            updated_at: now,
        };

        self.db.with_transaction(|tx| {
            if let Some(isbn) = record.isbn.as_deref() {
                if let Some(existing) = BookRepository::find_by_isbn(tx, isbn)? {
                    return Err(AppError::conflict(format!(
                        "book with ISBN {isbn} already exists ({})",
                        existing.id
                    )));
                }
            }
            BookRepository::insert(tx, &BookRow::from_record(&record))
        })?;

        info!(target: "app::books", book_id = %record.id, "book imported");
        Ok(record)
    }

    pub fn get_book(&self, id: &str) -> AppResult<BookRecord> {
        self.db
            .with_connection(|conn| BookRepository::find_by_id(conn, id))?
            .ok_or_else(AppError::not_found)
    }

    pub fn list_books(&self, status: Option<BookStatus>) -> AppResult<Vec<BookRecord>> {
        self.db.with_connection(|conn| BookRepository::list(conn, status))
    }

    pub fn search_books(&self, query: &str) -> AppResult<Vec<BookRecord>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::validation("search query must not be empty"));
        }
        let results = self
            .db
            .with_connection(|conn| BookRepository::search(conn, query, SEARCH_LIMIT))?;
        debug!(target: "app::books", query, hits = results.len(), "book search");
        Ok(results)
    }

    pub fn update_book(&self, id: &str, input: BookUpdateInput) -> AppResult<BookRecord> {
        let now = format_timestamp(&Utc::now());

        self.db.with_transaction(|tx| {
            let mut record = BookRepository::find_by_id(tx, id)?.ok_or_else(AppError::not_found)?;

            if let Some(title) = input.title.as_deref() {
                record.title = normalize_title(title)?;
            }
            if let Some(author) = input.author {
                record.author = normalize_optional(author);
            }
            if let Some(page_count) = input.page_count {
                record.page_count = validate_page_count(page_count)?;
            }
            if let Some(cover_url) = input.cover_url {
                record.cover_url = normalize_optional(cover_url);
            }
            if let Some(rating) = input.rating {
                record.rating = validate_rating(rating)?;
            }
            if let Some(current_page) = input.current_page {
                if current_page < 0 {
                    return Err(AppError::validation("current page cannot be negative"));
                }
                record.current_page = current_page;
            }
            record.current_page = clamp_page(record.current_page, record.page_count);
            if let Some(status) = input.status {
                apply_status(&mut record, status, &now);
            }
            record.updated_at = now.clone();

            BookRepository::update(tx, &BookRow::from_record(&record))?;
            Ok(record)
        })
    }

    pub fn delete_book(&self, id: &str) -> AppResult<()> {
        self.db.with_connection(|conn| BookRepository::delete(conn, id))?;
        info!(target: "app::books", book_id = %id, "book deleted");
        Ok(())
    }
}

/// Sets the status and stamps the first start and the finish.
pub(crate) fn apply_status(record: &mut BookRecord, status: BookStatus, now: &str) {
    match status {
        BookStatus::Reading => {
            if record.started_at.is_none() {
                record.started_at = Some(now.to_string());
            }
            record.finished_at = None;
        }
        BookStatus::Finished => {
            if record.started_at.is_none() {
                record.started_at = Some(now.to_string());
            }
            if record.status != BookStatus::Finished || record.finished_at.is_none() {
                record.finished_at = Some(now.to_string());
            }
            if let Some(pages) = record.page_count {
                record.current_page = pages;
            }
        }
        BookStatus::WantToRead | BookStatus::Abandoned => {
            record.finished_at = None;
        }
    }
    record.status = status;
}

pub(crate) fn clamp_page(page: i64, page_count: Option<i64>) -> i64 {
    match page_count {
        Some(total) => page.clamp(0, total),
        None => page.max(0),
    }
}

fn normalize_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("book title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::validation(format!(
            "book title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Keeps digits and a check-digit `X`; accepts ISBN-10 and ISBN-13.
fn normalize_isbn(value: Option<String>) -> AppResult<Option<String>> {
    let Some(raw) = normalize_optional(value) else {
        return Ok(None);
    };
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'x' || *c == 'X')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if cleaned.len() != 10 && cleaned.len() != 13 {
        return Err(AppError::validation(format!("invalid ISBN: {raw}")));
    }
    Ok(Some(cleaned))
}

fn validate_page_count(value: Option<i64>) -> AppResult<Option<i64>> {
    match value {
        Some(pages) if pages <= 0 => Err(AppError::validation("page count must be positive")),
        other => Ok(other),
    }
}

fn validate_rating(value: Option<i64>) -> AppResult<Option<i64>> {
    match value {
        Some(rating) if !(1..=5).contains(&rating) => {
            Err(AppError::validation("rating must be between 1 and 5"))
        }
        other => Ok(other),
    }
}
