use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use tracing::{info, warn};

use crate::error::AppResult;

const USER_VERSION: i32 = 3;

#[derive(Debug)]
pub struct MigrationInfo {
    pub version: i32,
    pub description: String,
    pub applied_at: DateTime<Utc>,
}

struct Migration {
    version: i32,
    description: &'static str,
    apply: fn(&Connection) -> AppResult<()>,
    rollback_sql: Option<&'static str>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Add goal progression columns to reading profile",
        apply: migrate_to_v1,
        rollback_sql: None,
    },
    Migration {
        version: 2,
        description: "Add weekly progress checkpoints",
        apply: migrate_to_v2,
        rollback_sql: Some("DROP TABLE IF EXISTS weekly_progress;"),
    },
    Migration {
        version: 3,
        description: "Add book metadata and session end page",
        apply: migrate_to_v3,
        rollback_sql: Some(
            r#"
            DROP INDEX IF EXISTS idx_books_isbn;
            DROP INDEX IF EXISTS idx_reading_sessions_book_id;
            "#,
        ),
    },
];

pub fn run(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS migration_history (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL,
            rollback_sql TEXT
        );
        "#,
    )?;

    let mut current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    for migration in MIGRATIONS {
        if current_version >= migration.version {
            continue;
        }

        info!(target: "app::db", version = migration.version, "running migration");
        (migration.apply)(conn)?;
        current_version = migration.version;
        conn.pragma_update(None, "user_version", current_version)?;
        record_migration(
            conn,
            migration.version,
            migration.description,
            migration.rollback_sql,
        )?;
    }

    if current_version > USER_VERSION {
        warn!(
            target: "app::db",
            version = current_version,
            known = USER_VERSION,
            "database schema is newer than this build"
        );
    }

    Ok(())
}

fn record_migration(
    conn: &Connection,
    version: i32,
    description: &str,
    rollback_sql: Option<&str>,
) -> AppResult<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT OR REPLACE INTO migration_history (version, description, applied_at, rollback_sql) VALUES (?, ?, ?, ?)",
        (version, description, now, rollback_sql),
    )?;
    Ok(())
}

pub fn rollback_to_version(conn: &Connection, target_version: i32) -> AppResult<()> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if target_version >= current_version {
        warn!(
            target: "app::db",
            target_version,
            current_version,
            "rollback target is not below current version"
        );
        return Ok(());
    }

    let mut stmt = conn.prepare(
        "SELECT version, rollback_sql FROM migration_history WHERE version > ? ORDER BY version DESC",
    )?;

    let rollback_iter = stmt.query_map([target_version], |row| {
        Ok((row.get::<_, i32>(0)?, row.get::<_, Option<String>>(1)?))
    })?;

    for rollback_result in rollback_iter {
        let (version, rollback_sql) = rollback_result?;
        if let Some(sql) = rollback_sql {
            info!(target: "app::db", version, "rolling back migration");
            conn.execute_batch(&sql)?;
        } else {
            warn!(target: "app::db", version, "no rollback script for migration");
        }
    }

    conn.pragma_update(None, "user_version", target_version)?;
    conn.execute(
        "DELETE FROM migration_history WHERE version > ?",
        [target_version],
    )?;

    Ok(())
}

pub fn get_migration_history(conn: &Connection) -> AppResult<Vec<MigrationInfo>> {
    let mut stmt = conn.prepare(
        "SELECT version, description, applied_at FROM migration_history ORDER BY version",
    )?;

    let migration_iter = stmt.query_map([], |row| {
        let applied_at_str: String = row.get(2)?;
        let applied_at = DateTime::parse_from_rfc3339(&applied_at_str)
            .map_err(|_| {
                rusqlite::Error::InvalidColumnType(
                    2,
                    "applied_at".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?
            .with_timezone(&Utc);

        Ok(MigrationInfo {
            version: row.get(0)?,
            description: row.get(1)?,
            applied_at,
        })
    })?;

    let mut migrations = Vec::new();
    for migration in migration_iter {
        migrations.push(migration?);
    }
    Ok(migrations)
}

fn migrate_to_v1(conn: &Connection) -> AppResult<()> {
    ensure_column(conn, "reading_profile", "end_rate_goal_minutes_per_day", "INTEGER")?;
    ensure_column(conn, "reading_profile", "end_rate_goal_date", "TEXT")?;
    ensure_column(conn, "reading_profile", "current_rate_minutes_per_day", "INTEGER")?;
    ensure_column(conn, "reading_profile", "current_rate_last_updated", "TEXT")?;
    ensure_column(conn, "reading_profile", "weekly_rate_increase_minutes", "INTEGER")?;
    ensure_column(conn, "reading_profile", "weekly_rate_increase_percentage", "REAL")?;
    Ok(())
}

fn migrate_to_v2(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS weekly_progress (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            weeks_passed INTEGER NOT NULL DEFAULT 0,
            target_reading_minutes INTEGER NOT NULL,
            achieved_reading_minutes REAL NOT NULL,
            date_created TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_weekly_progress_date_created
            ON weekly_progress(date_created);
        "#,
    )?;
    Ok(())
}

fn migrate_to_v3(conn: &Connection) -> AppResult<()> {
    ensure_column(conn, "books", "isbn", "TEXT")?;
    ensure_column(conn, "books", "cover_url", "TEXT")?;
    ensure_column(conn, "books", "rating", "INTEGER")?;
    ensure_column(conn, "books", "source", "TEXT NOT NULL DEFAULT 'manual'")?;
    ensure_column(conn, "reading_sessions", "end_page", "INTEGER")?;

    conn.execute_batch(
        r#"
        CREATE INDEX IF NOT EXISTS idx_books_isbn ON books(isbn);
        CREATE INDEX IF NOT EXISTS idx_reading_sessions_book_id
            ON reading_sessions(book_id);
        "#,
    )?;
    Ok(())
}

fn ensure_column(conn: &Connection, table: &str, column: &str, definition: &str) -> AppResult<()> {
    if !column_exists(conn, table, column)? {
        let sql = format!("ALTER TABLE {table} ADD COLUMN {column} {definition};");
        conn.execute(&sql, [])?;
    }
    Ok(())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> AppResult<bool> {
    let pragma = format!("PRAGMA table_info({table})");
    let mut stmt = conn.prepare(&pragma)?;
    let mut rows = stmt.query([])?;

    while let Some(row) = rows.next()? {
        if equals_name(row, column)? {
            return Ok(true);
        }
    }

    Ok(false)
}

fn equals_name(row: &Row<'_>, column: &str) -> Result<bool, rusqlite::Error> {
    let name: String = row.get(1)?;
    Ok(name.eq_ignore_ascii_case(column))
}
