//! SQLite-backed local storage.
//!
//! Provides persistent storage for:
//! - Key-value records (reminder schedules, active plan selection)
//! - The local trigger ledger used by the desktop scheduler

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::data_dir;
use super::migrations;
use crate::error::DatabaseError;

/// A row of the `local_triggers` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRow {
    pub id: String,
    pub hour: u8,
    pub minute: u8,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// SQLite database for local state.
///
/// The connection sits behind a mutex so one `Database` can be shared
/// (via `Arc`) between the reminder store and the trigger ledger.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `~/.config/slice/slice.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let dir = data_dir().map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Self::open_at(&dir.join("slice.db"))
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests and dry runs).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a key. Removing a missing key is not an error.
    pub fn kv_delete(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn()?
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// All `(key, value)` pairs whose key starts with `prefix`, ordered by key.
    pub fn kv_scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, DatabaseError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT key, value FROM kv WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )?;
        let rows = stmt.query_map(params![prefix], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Record a trigger in the local ledger.
    pub fn insert_trigger(&self, row: &TriggerRow) -> Result<(), DatabaseError> {
        self.conn()?.execute(
            "INSERT INTO local_triggers (id, hour, minute, title, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.id,
                row.hour,
                row.minute,
                row.title,
                row.body,
                row.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Delete a trigger. Returns whether a row existed.
    pub fn delete_trigger(&self, id: &str) -> Result<bool, DatabaseError> {
        let n = self
            .conn()?
            .execute("DELETE FROM local_triggers WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    /// List ledger triggers ordered by time of day.
    pub fn list_triggers(&self) -> Result<Vec<TriggerRow>, DatabaseError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, hour, minute, title, body, created_at
             FROM local_triggers
             ORDER BY hour, minute, created_at",
        )?;
        let rows = stmt.query_map([], |row| {
            let created_at: String = row.get(5)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u8>(1)?,
                row.get::<_, u8>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                created_at,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, hour, minute, title, body, created_at) = row?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| DatabaseError::QueryFailed(format!("bad created_at: {e}")))?;
            out.push(TriggerRow {
                id,
                hour,
                minute,
                title,
                body,
                created_at,
            });
        }
        Ok(out)
    }
}
