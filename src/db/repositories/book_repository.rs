use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::book::{BookRecord, BookSource, BookStatus};

const BOOK_COLUMNS: &str = "id, title, author, isbn, page_count, current_page, cover_url, status, rating, source, started_at, finished_at, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct BookRow {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub page_count: Option<i64>,
    pub current_page: i64,
    pub cover_url: Option<String>,
    pub status: String,
    pub rating: Option<i64>,
    pub source: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl BookRow {
    pub fn from_record(record: &BookRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            author: record.author.clone(),
            isbn: record.isbn.clone(),
            page_count: record.page_count,
            current_page: record.current_page,
            cover_url: record.cover_url.clone(),
            status: record.status.as_str().to_string(),
            rating: record.rating,
            source: record.source.as_str().to_string(),
            started_at: record.started_at.clone(),
            finished_at: record.finished_at.clone(),
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
        }
    }

    pub fn into_record(self) -> AppResult<BookRecord> {
        let status = BookStatus::try_from(self.status.as_str()).map_err(AppError::validation)?;
        let source = BookSource::try_from(self.source.as_str()).map_err(AppError::validation)?;

        Ok(BookRecord {
            id: self.id,
            title: self.title,
            author: self.author,
            isbn: self.isbn,
            page_count: self.page_count,
            current_page: self.current_page,
            cover_url: self.cover_url,
            status,
            rating: self.rating,
            source,
            started_at: self.started_at,
            finished_at: self.finished_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for BookRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            author: row.get("author")?,
            isbn: row.get("isbn")?,
            page_count: row.get("page_count")?,
            current_page: row.get("current_page")?,
            cover_url: row.get("cover_url")?,
            status: row.get("status")?,
            rating: row.get("rating")?,
            source: row.get("source")?,
            started_at: row.get("started_at")?,
            finished_at: row.get("finished_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct BookRepository;

impl BookRepository {
    pub fn insert(conn: &Connection, row: &BookRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO books (
                    id, title, author, isbn, page_count, current_page, cover_url,
                    status, rating, source, started_at, finished_at, created_at, updated_at
                ) VALUES (
                    :id, :title, :author, :isbn, :page_count, :current_page, :cover_url,
                    :status, :rating, :source, :started_at, :finished_at, :created_at, :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":title": &row.title,
                ":author": &row.author,
                ":isbn": &row.isbn,
                ":page_count": &row.page_count,
                ":current_page": &row.current_page,
                ":cover_url": &row.cover_url,
                ":status": &row.status,
                ":rating": &row.rating,
                ":source": &row.source,
                ":started_at": &row.started_at,
                ":finished_at": &row.finished_at,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        Ok(())
    }

    pub fn update(conn: &Connection, row: &BookRow) -> AppResult<()> {
        let updated = conn.execute(
            r#"
                UPDATE books SET
                    title = :title,
                    author = :author,
                    isbn = :isbn,
                    page_count = :page_count,
                    current_page = :current_page,
                    cover_url = :cover_url,
                    status = :status,
                    rating = :rating,
                    started_at = :started_at,
                    finished_at = :finished_at,
                    updated_at = :updated_at
                WHERE id = :id
            "#,
            named_params! {
                ":id": &row.id,
                ":title": &row.title,
                ":author": &row.author,
                ":isbn": &row.isbn,
                ":page_count": &row.page_count,
                ":current_page": &row.current_page,
                ":cover_url": &row.cover_url,
                ":status": &row.status,
                ":rating": &row.rating,
                ":started_at": &row.started_at,
                ":finished_at": &row.finished_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        if updated == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<BookRecord>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = :id");
        let row = conn
            .query_row(&sql, named_params! {":id": id}, |row| BookRow::try_from(row))
            .optional()?;

        row.map(|row| row.into_record()).transpose()
    }

    pub fn find_by_isbn(conn: &Connection, isbn: &str) -> AppResult<Option<BookRecord>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE isbn = :isbn LIMIT 1");
        let row = conn
            .query_row(&sql, named_params! {":isbn": isbn}, |row| {
                BookRow::try_from(row)
            })
            .optional()?;

        row.map(|row| row.into_record()).transpose()
    }

    pub fn list(conn: &Connection, status: Option<BookStatus>) -> AppResult<Vec<BookRecord>> {
        let sql = format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE (:status IS NULL OR status = :status) ORDER BY updated_at DESC, title ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                named_params! {":status": status.map(|s| s.as_str())},
                |row| BookRow::try_from(row),
            )?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(rows)
    }

    /// Case-insensitive substring match on title, author and ISBN.
    pub fn search(conn: &Connection, query: &str, limit: usize) -> AppResult<Vec<BookRecord>> {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let sql = format!(
            r#"
                SELECT {BOOK_COLUMNS} FROM books
                WHERE lower(title) LIKE :pattern ESCAPE '\'
                   OR lower(coalesce(author, '')) LIKE :pattern ESCAPE '\'
                   OR lower(coalesce(isbn, '')) LIKE :pattern ESCAPE '\'
                ORDER BY title ASC
                LIMIT :limit
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                named_params! {":pattern": &pattern, ":limit": limit as i64},
                |row| BookRow::try_from(row),
            )?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(rows)
    }

    pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
        let deleted = conn.execute("DELETE FROM books WHERE id = :id", named_params! {":id": id})?;
        if deleted == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    /// Books whose `finished_at` falls in `[start, end)`; bounds are RFC3339 strings.
    pub fn count_finished_between(conn: &Connection, start: &str, end: &str) -> AppResult<i64> {
        let count: i64 = conn.query_row(
            r#"
                SELECT COUNT(*) FROM books
                WHERE status = 'finished'
                  AND finished_at >= :start
                  AND finished_at < :end
            "#,
            named_params! {":start": start, ":end": end},
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
