use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// A reminder waiting in the local notification queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReminder {
    pub id: String,
    pub title: String,
    pub body: String,
    pub fire_at: DateTime<Utc>,
}

/// Local storage backed by a single SQLite file
///
/// Two concerns share the database:
/// - `slots`: durable key-value slots, each holding one encoded collection
/// - `pending_reminders`: the local notification queue, keyed by reminder id
///
/// The connection sits behind a mutex so one manager can be shared between
/// the store and the notification center.
pub struct StorageManager {
    conn: Mutex<Connection>,
}

impl StorageManager {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// Throwaway database, used by tests and dry runs
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS pending_reminders (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                fire_at INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // Poisoning does not corrupt the connection itself
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read a slot's raw value
    pub fn get_slot(&self, key: &str) -> Result<Option<String>> {
        self.conn()
            .query_row("SELECT value FROM slots WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
    }

    /// Write a slot, replacing whatever was there
    pub fn set_slot(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().timestamp()],
        )?;
        debug!("Wrote slot {} ({} bytes)", key, value.len());
        Ok(())
    }

    pub fn remove_slot(&self, key: &str) -> Result<()> {
        self.conn()
            .execute("DELETE FROM slots WHERE key = ?1", [key])?;
        Ok(())
    }

    /// Write several slots in one transaction: all of them land or none do
    pub fn set_slots(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let updated_at = Utc::now().timestamp();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )?;
            for (key, value) in entries {
                stmt.execute(params![key, value, updated_at])?;
            }
        }
        tx.commit()?;
        debug!("Wrote {} slots", entries.len());
        Ok(())
    }

    /// Remove several slots in one transaction
    pub fn remove_slots(&self, keys: &[&str]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("DELETE FROM slots WHERE key = ?1")?;
            for key in keys {
                stmt.execute([key])?;
            }
        }
        tx.commit()
    }

    /// Queue a reminder. Scheduling an existing id replaces it.
    ///
    /// Fire times are kept in milliseconds.
    pub fn schedule_reminder(&self, reminder: &PendingReminder) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO pending_reminders (id, title, body, fire_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                reminder.id,
                reminder.title,
                reminder.body,
                reminder.fire_at.timestamp_millis(),
                Utc::now().timestamp()
            ],
        )?;
        Ok(())
    }

    /// Drop the given reminder ids. Unknown ids are ignored.
    pub fn cancel_reminders(&self, ids: &[String]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM pending_reminders WHERE id = ?1")?;
            for id in ids {
                removed += stmt.execute([id])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    pub fn cancel_all_reminders(&self) -> Result<usize> {
        self.conn().execute("DELETE FROM pending_reminders", [])
    }

    /// Every queued reminder, soonest first
    pub fn pending_reminders(&self) -> Result<Vec<PendingReminder>> {
        self.query_reminders(
            "SELECT id, title, body, fire_at FROM pending_reminders ORDER BY fire_at, id",
            None,
        )
    }

    /// Queued reminders whose fire time is at or before `now`
    pub fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<PendingReminder>> {
        self.query_reminders(
            "SELECT id, title, body, fire_at FROM pending_reminders
             WHERE fire_at <= ?1 ORDER BY fire_at, id",
            Some(now.timestamp_millis()),
        )
    }

    fn query_reminders(&self, sql: &str, bound: Option<i64>) -> Result<Vec<PendingReminder>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row<'_>| -> Result<PendingReminder> {
            let millis: i64 = row.get(3)?;
            let fire_at = Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    Type::Integer,
                    format!("fire_at out of range: {}", millis).into(),
                )
            })?;
            Ok(PendingReminder {
                id: row.get(0)?,
                title: row.get(1)?,
                body: row.get(2)?,
                fire_at,
            })
        };

        let rows = match bound {
            Some(ts) => stmt.query_map([ts], map_row)?,
            None => stmt.query_map([], map_row)?,
        };
        rows.collect()
    }
}
