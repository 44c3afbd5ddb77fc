//! SQLite connection bootstrap shared by the stores

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, Row};
use tracing::warn;

const PRAGMAS_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA busy_timeout = 5000;
"#;

/// Open a read-write connection and apply pragmas plus the given schema.
pub fn open_with_schema(db_path: &str, schema_sql: &str) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX; // We handle our own locking

    let conn = Connection::open_with_flags(db_path, flags)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    conn.execute_batch(PRAGMAS_SQL)
        .context("Failed to apply database pragmas")?;
    conn.execute_batch(schema_sql)
        .context("Failed to initialize database schema")?;

    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .unwrap_or_default();
    if !journal_mode.eq_ignore_ascii_case("wal") {
        warn!("WAL mode not active, journal_mode = {}", journal_mode);
    }

    Ok(conn)
}

/// Read a timestamp column. Timestamps are stored as Unix milliseconds.
pub fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_open_applies_schema() {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = open_with_schema(
            temp_file.path().to_str().unwrap(),
            "CREATE TABLE IF NOT EXISTS scratch (id INTEGER PRIMARY KEY);",
        )
        .unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'scratch'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[test]
    fn test_timestamp_column() {
        let conn = Connection::open_in_memory().unwrap();
        let now = Utc::now();

        let restored = conn
            .query_row("SELECT ?1", [now.timestamp_millis()], |row| {
                timestamp_column(row, 0)
            })
            .unwrap();
        assert_eq!(restored.timestamp_millis(), now.timestamp_millis());

        let out_of_range = conn.query_row("SELECT ?1", [i64::MAX], |row| timestamp_column(row, 0));
        assert!(out_of_range.is_err());
    }
}
