use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::progress::{CheckpointInsert, WeeklyProgressCheckpoint};
use crate::utils::time::format_timestamp;

#[derive(Debug, Clone)]
pub struct CheckpointRow {
    pub id: i64,
    pub weeks_passed: i64,
    pub target_reading_minutes: i64,
    pub achieved_reading_minutes: f64,
    pub date_created: String,
}

impl CheckpointRow {
    pub fn into_record(self) -> AppResult<WeeklyProgressCheckpoint> {
        let date_created = DateTime::parse_from_rfc3339(&self.date_created)
            .map_err(|err| {
                AppError::database(format!(
                    "checkpoint {} has invalid date_created {}: {err}",
                    self.id, self.date_created
                ))
            })?
            .with_timezone(&Utc);

        Ok(WeeklyProgressCheckpoint {
            id: self.id,
            weeks_passed: self.weeks_passed,
            target_reading_minutes: self.target_reading_minutes,
            achieved_reading_minutes: self.achieved_reading_minutes,
            date_created,
        })
    }
}

impl TryFrom<&Row<'_>> for CheckpointRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            weeks_passed: row.get("weeks_passed")?,
            target_reading_minutes: row.get("target_reading_minutes")?,
            achieved_reading_minutes: row.get("achieved_reading_minutes")?,
            date_created: row.get("date_created")?,
        })
    }
}

pub struct ProgressRepository;

impl ProgressRepository {
    pub fn insert(conn: &Connection, insert: &CheckpointInsert) -> AppResult<i64> {
        conn.execute(
            r#"
                INSERT INTO weekly_progress (
                    weeks_passed,
                    target_reading_minutes,
                    achieved_reading_minutes,
                    date_created
                ) VALUES (
                    :weeks_passed,
                    :target_reading_minutes,
                    :achieved_reading_minutes,
                    :date_created
                )
            "#,
            named_params! {
                ":weeks_passed": insert.weeks_passed,
                ":target_reading_minutes": insert.target_reading_minutes,
                ":achieved_reading_minutes": insert.achieved_reading_minutes,
                ":date_created": format_timestamp(&insert.date_created),
            },
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn latest(conn: &Connection) -> AppResult<Option<WeeklyProgressCheckpoint>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, weeks_passed, target_reading_minutes, achieved_reading_minutes, date_created
                FROM weekly_progress
                ORDER BY date_created DESC, id DESC
                LIMIT 1
            "#,
        )?;

        let row = stmt
            .query_row([], |row| CheckpointRow::try_from(row))
            .optional()?;

        row.map(|row| row.into_record()).transpose()
    }

    pub fn list_recent(conn: &Connection, limit: usize) -> AppResult<Vec<WeeklyProgressCheckpoint>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, weeks_passed, target_reading_minutes, achieved_reading_minutes, date_created
                FROM weekly_progress
                ORDER BY date_created DESC, id DESC
                LIMIT :limit
            "#,
        )?;

        let rows = stmt
            .query_map(named_params! {":limit": limit as i64}, |row| {
                CheckpointRow::try_from(row)
            })?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(rows)
    }

    /// Overwrites weeks and achieved minutes on an existing checkpoint.
    pub fn update_progress(
        conn: &Connection,
        id: i64,
        weeks_passed: i64,
        achieved_reading_minutes: f64,
    ) -> AppResult<()> {
        let updated = conn.execute(
            r#"
                UPDATE weekly_progress
                SET weeks_passed = :weeks_passed,
                    achieved_reading_minutes = :achieved_reading_minutes
                WHERE id = :id
            "#,
            named_params! {
                ":weeks_passed": weeks_passed,
                ":achieved_reading_minutes": achieved_reading_minutes,
                ":id": id,
            },
        )?;

        if updated == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }

    pub fn count(conn: &Connection) -> AppResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM weekly_progress", [], |row| {
            row.get(0)
        })?;
        Ok(count)
    }
}
