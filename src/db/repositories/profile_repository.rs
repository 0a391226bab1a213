use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{named_params, Connection, OptionalExtension, Row};
use tracing::warn;

use crate::error::AppResult;
use crate::models::profile::{
    GoalProfile, DEFAULT_CURRENT_RATE_MINUTES, DEFAULT_END_RATE_GOAL_MINUTES,
    DEFAULT_INITIAL_RATE_MINUTES, DEFAULT_WEEKLY_RATE_INCREASE_MINUTES,
    DEFAULT_WEEKLY_RATE_INCREASE_PERCENTAGE, DEFAULT_WEEKLY_READING_GOAL_MINUTES,
};
use crate::utils::time::format_timestamp;

const PROFILE_ID: i64 = 1;

/// Raw profile row. Goal columns arrived through migrations and may be NULL.
#[derive(Debug, Clone, Default)]
pub struct ProfileRow {
    pub display_name: Option<String>,
    pub weekly_reading_goal_minutes: Option<i64>,
    pub initial_rate_minutes_per_day: Option<i64>,
    pub end_rate_goal_minutes_per_day: Option<i64>,
    pub end_rate_goal_date: Option<String>,
    pub current_rate_minutes_per_day: Option<i64>,
    pub current_rate_last_updated: Option<String>,
    pub weekly_rate_increase_minutes: Option<i64>,
    pub weekly_rate_increase_percentage: Option<f64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl ProfileRow {
    pub fn from_profile(profile: &GoalProfile) -> Self {
        Self {
            display_name: profile.display_name.clone(),
            weekly_reading_goal_minutes: Some(profile.weekly_reading_goal_minutes),
            initial_rate_minutes_per_day: Some(profile.initial_rate_minutes_per_day),
            end_rate_goal_minutes_per_day: Some(profile.end_rate_goal_minutes_per_day),
            end_rate_goal_date: profile.end_rate_goal_date.as_ref().map(format_timestamp),
            current_rate_minutes_per_day: Some(profile.current_rate_minutes_per_day),
            current_rate_last_updated: profile
                .current_rate_last_updated
                .as_ref()
                .map(format_timestamp),
            weekly_rate_increase_minutes: Some(profile.weekly_rate_increase_minutes),
            weekly_rate_increase_percentage: Some(profile.weekly_rate_increase_percentage),
            created_at: profile.created_at.as_ref().map(format_timestamp),
            updated_at: profile.updated_at.as_ref().map(format_timestamp),
        }
    }

    /// Fills absent columns with defaults. Never writes back.
    pub fn into_profile(self) -> GoalProfile {
        GoalProfile {
            display_name: self.display_name,
            weekly_reading_goal_minutes: self
                .weekly_reading_goal_minutes
                .unwrap_or(DEFAULT_WEEKLY_READING_GOAL_MINUTES),
            initial_rate_minutes_per_day: self
                .initial_rate_minutes_per_day
                .unwrap_or(DEFAULT_INITIAL_RATE_MINUTES),
            end_rate_goal_minutes_per_day: self
                .end_rate_goal_minutes_per_day
                .unwrap_or(DEFAULT_END_RATE_GOAL_MINUTES),
            end_rate_goal_date: parse_timestamp("end_rate_goal_date", self.end_rate_goal_date),
            current_rate_minutes_per_day: self
                .current_rate_minutes_per_day
                .unwrap_or(DEFAULT_CURRENT_RATE_MINUTES),
            current_rate_last_updated: parse_timestamp(
                "current_rate_last_updated",
                self.current_rate_last_updated,
            ),
            weekly_rate_increase_minutes: self
                .weekly_rate_increase_minutes
                .unwrap_or(DEFAULT_WEEKLY_RATE_INCREASE_MINUTES),
            weekly_rate_increase_percentage: self
                .weekly_rate_increase_percentage
                .unwrap_or(DEFAULT_WEEKLY_RATE_INCREASE_PERCENTAGE),
            created_at: parse_timestamp("created_at", self.created_at),
            updated_at: parse_timestamp("updated_at", self.updated_at),
        }
    }
}

impl TryFrom<&Row<'_>> for ProfileRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            display_name: row.get("display_name")?,
            weekly_reading_goal_minutes: lenient_integer(row, "weekly_reading_goal_minutes")?,
            initial_rate_minutes_per_day: lenient_integer(row, "initial_rate_minutes_per_day")?,
            end_rate_goal_minutes_per_day: lenient_integer(row, "end_rate_goal_minutes_per_day")?,
            end_rate_goal_date: row.get("end_rate_goal_date")?,
            current_rate_minutes_per_day: lenient_integer(row, "current_rate_minutes_per_day")?,
            current_rate_last_updated: row.get("current_rate_last_updated")?,
            weekly_rate_increase_minutes: lenient_integer(row, "weekly_rate_increase_minutes")?,
            weekly_rate_increase_percentage: lenient_real(row, "weekly_rate_increase_percentage")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct ProfileRepository;

impl ProfileRepository {
    pub fn find(conn: &Connection) -> AppResult<Option<ProfileRow>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT
                    display_name,
                    weekly_reading_goal_minutes,
                    initial_rate_minutes_per_day,
                    end_rate_goal_minutes_per_day,
                    end_rate_goal_date,
                    current_rate_minutes_per_day,
                    current_rate_last_updated,
                    weekly_rate_increase_minutes,
                    weekly_rate_increase_percentage,
                    created_at,
                    updated_at
                FROM reading_profile
                WHERE id = :id
            "#,
        )?;

        let row = stmt
            .query_row(named_params! {":id": PROFILE_ID}, |row| {
                ProfileRow::try_from(row)
            })
            .optional()?;

        Ok(row)
    }

    pub fn exists(conn: &Connection) -> AppResult<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM reading_profile WHERE id = ?1)",
            [PROFILE_ID],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Writes the whole profile under the fixed singleton key.
    pub fn upsert(conn: &Connection, row: &ProfileRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO reading_profile (
                    id,
                    display_name,
                    weekly_reading_goal_minutes,
                    initial_rate_minutes_per_day,
                    end_rate_goal_minutes_per_day,
                    end_rate_goal_date,
                    current_rate_minutes_per_day,
                    current_rate_last_updated,
                    weekly_rate_increase_minutes,
                    weekly_rate_increase_percentage,
                    created_at,
                    updated_at
                ) VALUES (
                    :id,
                    :display_name,
                    :weekly_reading_goal_minutes,
                    :initial_rate_minutes_per_day,
                    :end_rate_goal_minutes_per_day,
                    :end_rate_goal_date,
                    :current_rate_minutes_per_day,
                    :current_rate_last_updated,
                    :weekly_rate_increase_minutes,
                    :weekly_rate_increase_percentage,
                    :created_at,
                    :updated_at
                )
                ON CONFLICT(id) DO UPDATE SET
                    display_name = excluded.display_name,
                    weekly_reading_goal_minutes = excluded.weekly_reading_goal_minutes,
                    initial_rate_minutes_per_day = excluded.initial_rate_minutes_per_day,
                    end_rate_goal_minutes_per_day = excluded.end_rate_goal_minutes_per_day,
                    end_rate_goal_date = excluded.end_rate_goal_date,
                    current_rate_minutes_per_day = excluded.current_rate_minutes_per_day,
                    current_rate_last_updated = excluded.current_rate_last_updated,
                    weekly_rate_increase_minutes = excluded.weekly_rate_increase_minutes,
                    weekly_rate_increase_percentage = excluded.weekly_rate_increase_percentage,
                    updated_at = excluded.updated_at
            "#,
            named_params! {
                ":id": PROFILE_ID,
                ":display_name": &row.display_name,
                ":weekly_reading_goal_minutes": &row.weekly_reading_goal_minutes,
                ":initial_rate_minutes_per_day": &row.initial_rate_minutes_per_day,
                ":end_rate_goal_minutes_per_day": &row.end_rate_goal_minutes_per_day,
                ":end_rate_goal_date": &row.end_rate_goal_date,
                ":current_rate_minutes_per_day": &row.current_rate_minutes_per_day,
                ":current_rate_last_updated": &row.current_rate_last_updated,
                ":weekly_rate_increase_minutes": &row.weekly_rate_increase_minutes,
                ":weekly_rate_increase_percentage": &row.weekly_rate_increase_percentage,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        Ok(())
    }

    pub fn update_current_rate(
        conn: &Connection,
        current_rate: i64,
        updated_at: &DateTime<Utc>,
    ) -> AppResult<usize> {
        let timestamp = format_timestamp(updated_at);
        let updated = conn.execute(
            r#"
                UPDATE reading_profile
                SET current_rate_minutes_per_day = :current_rate,
                    current_rate_last_updated = :timestamp,
                    updated_at = :timestamp
                WHERE id = :id
            "#,
            named_params! {
                ":current_rate": current_rate,
                ":timestamp": &timestamp,
                ":id": PROFILE_ID,
            },
        )?;

        Ok(updated)
    }
}

fn lenient_integer(row: &Row<'_>, column: &str) -> Result<Option<i64>, rusqlite::Error> {
    let value: Value = row.get(column)?;
    Ok(match value {
        Value::Null => None,
        Value::Integer(number) => Some(number),
        Value::Real(number) if number.is_finite() => Some(number.round() as i64),
        Value::Text(ref text) => match text.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => Some(number.round() as i64),
            _ => {
                warn!(target: "app::goal", column, raw = %text, "ignoring non-numeric profile value");
                None
            }
        },
        other => {
            warn!(target: "app::goal", column, value = ?other, "ignoring non-numeric profile value");
            None
        }
    })
}

fn lenient_real(row: &Row<'_>, column: &str) -> Result<Option<f64>, rusqlite::Error> {
    let value: Value = row.get(column)?;
    Ok(match value {
        Value::Null => None,
        Value::Integer(number) => Some(number as f64),
        Value::Real(number) => Some(number),
        Value::Text(ref text) => match text.trim().parse::<f64>() {
            Ok(number) => Some(number),
            Err(_) => {
                warn!(target: "app::goal", column, raw = %text, "ignoring non-numeric profile value");
                None
            }
        },
        other => {
            warn!(target: "app::goal", column, value = ?other, "ignoring non-numeric profile value");
            None
        }
    })
}

fn parse_timestamp(column: &str, raw: Option<String>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(value) => Some(value.with_timezone(&Utc)),
        Err(err) => {
            warn!(target: "app::goal", column, raw = %raw, error = %err, "ignoring unparseable profile timestamp");
            None
        }
    }
}
