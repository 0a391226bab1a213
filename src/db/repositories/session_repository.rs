use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::session::ReadingSessionRecord;

const SESSION_COLUMNS: &str =
    "id, book_id, started_at, ended_at, duration_minutes, pages_read, end_page, notes, created_at";

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: String,
    pub book_id: Option<String>,
    pub started_at: String,
    pub ended_at: String,
    pub duration_minutes: i64,
    pub pages_read: Option<i64>,
    pub end_page: Option<i64>,
    pub notes: Option<String>,
    pub created_at: String,
}

impl SessionRow {
    pub fn into_record(self) -> ReadingSessionRecord {
        ReadingSessionRecord {
            id: self.id,
            book_id: self.book_id,
            started_at: self.started_at,
            ended_at: self.ended_at,
            duration_minutes: self.duration_minutes,
            pages_read: self.pages_read,
            end_page: self.end_page,
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}

impl TryFrom<&Row<'_>> for SessionRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            book_id: row.get("book_id")?,
            started_at: row.get("started_at")?,
            ended_at: row.get("ended_at")?,
            duration_minutes: row.get("duration_minutes")?,
            pages_read: row.get("pages_read")?,
            end_page: row.get("end_page")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct SessionRepository;

impl SessionRepository {
    pub fn insert(conn: &Connection, row: &SessionRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO reading_sessions (
                    id, book_id, started_at, ended_at, duration_minutes,
                    pages_read, end_page, notes, created_at
                ) VALUES (
                    :id, :book_id, :started_at, :ended_at, :duration_minutes,
                    :pages_read, :end_page, :notes, :created_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":book_id": &row.book_id,
                ":started_at": &row.started_at,
                ":ended_at": &row.ended_at,
                ":duration_minutes": &row.duration_minutes,
                ":pages_read": &row.pages_read,
                ":end_page": &row.end_page,
                ":notes": &row.notes,
                ":created_at": &row.created_at,
            },
        )?;

        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<ReadingSessionRecord>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM reading_sessions WHERE id = :id");
        let row = conn
            .query_row(&sql, named_params! {":id": id}, |row| {
                SessionRow::try_from(row)
            })
            .optional()?;

        Ok(row.map(SessionRow::into_record))
    }

    /// Sessions whose start lies in `[start, end)`, oldest first.
    pub fn list_between(
        conn: &Connection,
        start: &str,
        end: &str,
    ) -> AppResult<Vec<ReadingSessionRecord>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM reading_sessions WHERE started_at >= :start AND started_at < :end ORDER BY started_at ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(named_params! {":start": start, ":end": end}, |row| {
                SessionRow::try_from(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows.into_iter().map(SessionRow::into_record).collect())
    }

    pub fn list_for_book(conn: &Connection, book_id: &str) -> AppResult<Vec<ReadingSessionRecord>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM reading_sessions WHERE book_id = :book_id ORDER BY started_at DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(named_params! {":book_id": book_id}, |row| {
                SessionRow::try_from(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows.into_iter().map(SessionRow::into_record).collect())
    }

    /// Session start days (`YYYY-MM-DD`) with any reading, newest first.
    pub fn reading_days_before(conn: &Connection, end: &str, limit: usize) -> AppResult<Vec<String>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT DISTINCT substr(started_at, 1, 10) AS day
                FROM reading_sessions
                WHERE started_at < :end AND duration_minutes > 0
                ORDER BY day DESC
                LIMIT :limit
            "#,
        )?;
        let days = stmt
            .query_map(named_params! {":end": end, ":limit": limit as i64}, |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(days)
    }

    pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
        let deleted = conn.execute(
            "DELETE FROM reading_sessions WHERE id = :id",
            named_params! {":id": id},
        )?;
        if deleted == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }
}
