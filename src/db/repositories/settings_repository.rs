use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::AppResult;

#[derive(Debug, Clone)]
pub struct SettingRow {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

impl TryFrom<&Row<'_>> for SettingRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            key: row.get("key")?,
            value: row.get("value")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct SettingsRepository;

impl SettingsRepository {
    pub fn find(conn: &Connection, key: &str) -> AppResult<Option<SettingRow>> {
        let row = conn
            .query_row(
                "SELECT key, value, updated_at FROM app_settings WHERE key = :key",
                named_params! {":key": key},
                |row| SettingRow::try_from(row),
            )
            .optional()?;

        Ok(row)
    }

    /// Every stored preference, newest change first.
    pub fn all(conn: &Connection) -> AppResult<Vec<SettingRow>> {
        let mut stmt = conn.prepare(
            "SELECT key, value, updated_at FROM app_settings ORDER BY updated_at DESC, key ASC",
        )?;

        let rows = stmt
            .query_map([], |row| SettingRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn put(conn: &Connection, key: &str, value: &str, updated_at: &str) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO app_settings (key, value, updated_at)
                VALUES (:key, :value, :updated_at)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
            "#,
            named_params! {":key": key, ":value": value, ":updated_at": updated_at},
        )?;

        Ok(())
    }

    pub fn remove(conn: &Connection, key: &str) -> AppResult<bool> {
        let removed = conn.execute(
            "DELETE FROM app_settings WHERE key = :key",
            named_params! {":key": key},
        )?;
        Ok(removed > 0)
    }
}
