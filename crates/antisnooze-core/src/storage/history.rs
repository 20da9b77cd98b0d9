//! SQLite-backed alarm history.
//!
//! One row per fired alarm, mutated in place when the alarm completes or
//! a doze-off is confirmed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::alarm::{AlarmHistory, HistoryStore};
use crate::error::StorageError;

use super::data_dir;

/// SQLite database for alarm history.
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open the database at `~/.config/antisnooze/antisnooze.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        let dir = data_dir().map_err(|e| StorageError::ReadFailed {
            path: PathBuf::from("~/.config/antisnooze"),
            message: e.to_string(),
        })?;
        Self::open_at(&dir.join("antisnooze.db"))
    }

    /// Open the database at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|source| StorageError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS history (
                    id             TEXT PRIMARY KEY,
                    alarm_time     TEXT NOT NULL,
                    wake_up_time   TEXT,
                    doze_off_count INTEGER NOT NULL DEFAULT 0
                );

                CREATE INDEX IF NOT EXISTS idx_history_alarm_time ON history(alarm_time);",
            )
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))
    }

    /// Delete every history row.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub fn clear(&self) -> Result<usize, StorageError> {
        Ok(self.conn.execute("DELETE FROM history", [])?)
    }

    fn parse_entry(row: &rusqlite::Row<'_>) -> Result<AlarmHistory, rusqlite::Error> {
        let id: String = row.get(0)?;
        let alarm_time: String = row.get(1)?;
        let wake_up_time: Option<String> = row.get(2)?;
        let doze_off_count: u32 = row.get(3)?;

        let id = Uuid::parse_str(&id).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let alarm_time = DateTime::parse_from_rfc3339(&alarm_time)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?
            .with_timezone(&Utc);
        let wake_up_time = match wake_up_time {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            2,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        Ok(AlarmHistory {
            id,
            alarm_time,
            wake_up_time,
            doze_off_count,
        })
    }
}

impl HistoryStore for HistoryDb {
    fn append(&mut self, entry: AlarmHistory) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO history (id, alarm_time, wake_up_time, doze_off_count)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.id.to_string(),
                entry.alarm_time.to_rfc3339(),
                entry.wake_up_time.map(|t| t.to_rfc3339()),
                entry.doze_off_count,
            ],
        )?;
        Ok(())
    }

    fn update_last(
        &mut self,
        wake_up_time: Option<DateTime<Utc>>,
        increment_doze_off: bool,
    ) -> Result<(), StorageError> {
        let bump = if increment_doze_off { 1 } else { 0 };
        self.conn.execute(
            "UPDATE history
             SET wake_up_time = COALESCE(?1, wake_up_time),
                 doze_off_count = doze_off_count + ?2
             WHERE rowid = (SELECT MAX(rowid) FROM history)",
            params![wake_up_time.map(|t| t.to_rfc3339()), bump],
        )?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<AlarmHistory>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, alarm_time, wake_up_time, doze_off_count FROM history ORDER BY rowid")?;
        let rows = stmt.query_map([], Self::parse_entry)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}
