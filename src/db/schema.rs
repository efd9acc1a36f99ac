//! Database schema and migrations

use rusqlite::Connection;

use crate::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
///
/// # Errors
///
/// Returns error if migration fails
pub fn init(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Durable key/value facts (user name, assistant name, ...)
        CREATE TABLE IF NOT EXISTS facts (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Short-lived conversation log
        CREATE TABLE IF NOT EXISTS conversation_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category TEXT NOT NULL,
            command TEXT NOT NULL,
            response TEXT NOT NULL,
            timestamp TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_conversation_log_timestamp ON conversation_log(timestamp);

        PRAGMA user_version = 1;
        ",
    )?;

    tracing::info!("migrated to schema v1");
    Ok(())
}
