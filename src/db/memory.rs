//! Memory store: durable facts plus a time-bounded conversation log
//!
//! Every read and write runs under one store-wide lock so concurrent sessions
//! observe a consistent snapshot. Operations are point lookups and inserts, so
//! the critical sections stay short.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

use super::{DbConn, DbPool};
use crate::{Error, Result};

/// Default retention window for conversation entries
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Default interval between background sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Fixed-width UTC encoding, so lexical order in `SQLite` equals time order
fn encode_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// One recorded exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationEntry {
    pub category: String,
    pub command: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

/// Persistent facts and short-term conversation memory
#[derive(Debug, Clone)]
pub struct MemoryStore {
    pool: DbPool,
    lock: Arc<Mutex<()>>,
    retention: chrono::Duration,
}

impl MemoryStore {
    /// Create a memory store with the default one-hour retention window
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self::with_retention(pool, DEFAULT_RETENTION)
    }

    /// Create a memory store with a custom retention window
    #[must_use]
    pub fn with_retention(pool: DbPool, retention: Duration) -> Self {
        Self {
            pool,
            lock: Arc::new(Mutex::new(())),
            retention: chrono::Duration::from_std(retention)
                .unwrap_or_else(|_| chrono::Duration::hours(1)),
        }
    }

    /// Retention window applied to conversation entries
    #[must_use]
    pub fn retention(&self) -> Duration {
        self.retention.to_std().unwrap_or(DEFAULT_RETENTION)
    }

    /// Take the store-wide lock and a pooled connection
    fn acquire(&self) -> Result<(MutexGuard<'_, ()>, DbConn)> {
        let guard = self
            .lock
            .lock()
            .map_err(|_| Error::Database("memory store lock poisoned".to_string()))?;
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;
        Ok((guard, conn))
    }

    /// Insert or overwrite a fact (last write wins)
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn set_fact(&self, key: &str, value: &str) -> Result<()> {
        let (_guard, conn) = self.acquire()?;
        conn.execute(
            r"INSERT INTO facts (key, value) VALUES (?1, ?2)
              ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )?;

        tracing::debug!(key, "fact stored");
        Ok(())
    }

    /// Look up a fact; an unknown key is `None`, not an error
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn get_fact(&self, key: &str) -> Result<Option<String>> {
        let (_guard, conn) = self.acquire()?;
        let result = conn.query_row("SELECT value FROM facts WHERE key = ?1", [key], |row| {
            row.get(0)
        });

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Append a conversation entry stamped with the current time
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn append_conversation(&self, category: &str, command: &str, response: &str) -> Result<()> {
        self.append_conversation_at(category, command, response, Utc::now())
    }

    /// Append a conversation entry with an explicit timestamp
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn append_conversation_at(
        &self,
        category: &str,
        command: &str,
        response: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let (_guard, conn) = self.acquire()?;
        conn.execute(
            r"INSERT INTO conversation_log (category, command, response, timestamp)
              VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![category, command, response, encode_timestamp(&at)],
        )?;
        Ok(())
    }

    /// Conversation entries inside the retention window, most recent first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn recent_conversation(&self) -> Result<Vec<ConversationEntry>> {
        self.recent_conversation_at(Utc::now())
    }

    /// Conversation entries visible at `now`, most recent first
    ///
    /// Expired entries are filtered here even if the sweep has not run yet.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn recent_conversation_at(&self, now: DateTime<Utc>) -> Result<Vec<ConversationEntry>> {
        let cutoff = encode_timestamp(&(now - self.retention));
        let (_guard, conn) = self.acquire()?;

        let mut stmt = conn.prepare(
            r"SELECT category, command, response, timestamp
              FROM conversation_log
              WHERE timestamp > ?1
              ORDER BY timestamp DESC, id DESC",
        )?;

        let rows = stmt
            .query_map([cutoff], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let entries = rows
            .into_iter()
            .filter_map(|(category, command, response, raw)| {
                let Some(timestamp) = decode_timestamp(&raw) else {
                    tracing::warn!(timestamp = %raw, "skipping conversation entry with malformed timestamp");
                    return None;
                };
                Some(ConversationEntry {
                    category,
                    command,
                    response,
                    timestamp,
                })
            })
            .collect();

        Ok(entries)
    }

    /// Delete entries that have left the retention window
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn sweep_expired(&self) -> Result<usize> {
        self.sweep_expired_at(Utc::now())
    }

    /// Delete entries whose age at `now` is at least the retention window
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = encode_timestamp(&(now - self.retention));
        let (_guard, conn) = self.acquire()?;
        // Rows whose timestamp does not parse can never age out, so they go too
        let removed = conn.execute(
            r"DELETE FROM conversation_log
              WHERE timestamp <= ?1 OR julianday(timestamp) IS NULL",
            [cutoff],
        )?;

        if removed > 0 {
            tracing::debug!(removed, "swept expired conversation entries");
        }
        Ok(removed)
    }
}

/// Run `sweep_expired` on a fixed interval for the life of the process
#[must_use]
pub fn spawn_sweeper(store: MemoryStore, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = store.sweep_expired() {
                tracing::error!(error = %e, "conversation sweep failed");
            }
        }
    })
}
