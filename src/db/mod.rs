//! Database module backing the memory store

pub mod memory;
mod schema;

use std::path::Path;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

use crate::{Error, Result};

pub use memory::{ConversationEntry, MemoryStore, spawn_sweeper};
pub use schema::SCHEMA_VERSION;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Pooled database connection
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Initialize the database
///
/// # Errors
///
/// Returns error if database cannot be opened or initialized
pub fn init<P: AsRef<Path>>(path: P) -> Result<DbPool> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let manager = SqliteConnectionManager::file(path);
    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|e| Error::Database(e.to_string()))?;

    // Run migrations on first connection
    let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
    schema::init(&conn)?;

    tracing::info!(version = SCHEMA_VERSION, "database initialized");
    Ok(pool)
}

/// Initialize an in-memory database (for testing)
///
/// # Errors
///
/// Returns error if database cannot be initialized
pub fn init_memory() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|e| Error::Database(e.to_string()))?;

    let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
    schema::init(&conn)?;

    Ok(pool)
}
