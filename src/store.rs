//! SQLite-backed event store — the single durable source of truth.
//! Survives restarts; armed timers are rebuilt from it by the sweeper.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::error::{Result, SchedulerError};
use crate::event::{DeliveryOutcome, Event, EventStatus};

/// Durable store for scheduled deliveries.
pub struct EventStore {
    conn: Mutex<Connection>,
}

impl EventStore {
    /// Open or create the event database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SchedulerError::Persistence(format!("create store dir: {e}")))?;
        }
        let conn = Connection::open(path)?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, handy for embedding tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn migrate(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                payload TEXT NOT NULL,
                destination TEXT NOT NULL,
                fire_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_events_due ON events(status, fire_at);
            ",
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SchedulerError::Persistence(format!("store mutex poisoned: {e}")))
    }

    /// Insert a new pending event and return it with its assigned id.
    pub fn create(&self, payload: &str, destination: &str, fire_at: DateTime<Utc>) -> Result<Event> {
        let created_at = Utc::now();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO events (payload, destination, fire_at, status, created_at)
             VALUES (?1, ?2, ?3, 'pending', ?4)",
            rusqlite::params![
                payload,
                destination,
                fire_at.to_rfc3339(),
                created_at.to_rfc3339(),
            ],
        )?;
        Ok(Event {
            id: conn.last_insert_rowid(),
            payload: payload.to_string(),
            destination: destination.to_string(),
            fire_at,
            status: EventStatus::Pending,
            created_at,
        })
    }

    /// Delete an event. `NotFound` if no row had this id.
    pub fn delete(&self, id: i64) -> Result<()> {
        let rows = self
            .lock()?
            .execute("DELETE FROM events WHERE id = ?1", [id])?;
        if rows == 0 {
            return Err(SchedulerError::NotFound(id));
        }
        Ok(())
    }

    /// Pending events with `fire_at` in `[now, now + horizon]`.
    /// Ordering is unspecified; callers must not depend on it.
    pub fn find_due_within(&self, now: DateTime<Utc>, horizon: Duration) -> Result<Vec<Event>> {
        let until = now
            + chrono::Duration::from_std(horizon)
                .map_err(|e| SchedulerError::Persistence(format!("horizon out of range: {e}")))?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, payload, destination, fire_at, status, created_at FROM events
             WHERE status = 'pending' AND fire_at >= ?1 AND fire_at <= ?2",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![now.to_rfc3339(), until.to_rfc3339()],
            row_to_event,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Every event, terminal or not, for listing/audit.
    pub fn find_all(&self) -> Result<Vec<Event>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, payload, destination, fire_at, status, created_at FROM events
             ORDER BY fire_at",
        )?;
        let rows = stmt.query_map([], row_to_event)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Pending events only.
    pub fn find_pending(&self) -> Result<Vec<Event>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, payload, destination, fire_at, status, created_at FROM events
             WHERE status = 'pending' ORDER BY fire_at",
        )?;
        let rows = stmt.query_map([], row_to_event)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Record the outcome of a delivery attempt. Idempotent: the update is
    /// guarded on the event still being pending, so marking an
    /// already-terminal event keeps the first outcome and returns Ok.
    /// Duplicate attempts (timer-vs-cancel races) are therefore harmless.
    pub fn mark_terminal(&self, id: i64, outcome: DeliveryOutcome) -> Result<()> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE events SET status = ?1 WHERE id = ?2 AND status = 'pending'",
            rusqlite::params![EventStatus::from(outcome).as_str(), id],
        )?;
        if rows == 0 {
            let exists: i64 =
                conn.query_row("SELECT COUNT(*) FROM events WHERE id = ?1", [id], |r| {
                    r.get(0)
                })?;
            if exists == 0 {
                return Err(SchedulerError::NotFound(id));
            }
        }
        Ok(())
    }
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
    let fire_at_str: String = row.get(3)?;
    let status_str: String = row.get(4)?;
    let created_at_str: String = row.get(5)?;
    Ok(Event {
        id: row.get(0)?,
        payload: row.get(1)?,
        destination: row.get(2)?,
        fire_at: parse_ts(3, &fire_at_str)?,
        status: EventStatus::parse(&status_str),
        created_at: parse_ts(5, &created_at_str)?,
    })
}

fn parse_ts(col: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> EventStore {
        EventStore::open_in_memory().unwrap()
    }

    fn fire_in(secs: i64) -> DateTime<Utc> {
        Utc::now() + chrono::Duration::seconds(secs)
    }

    #[test]
    fn create_assigns_monotonic_ids() {
        let store = store();
        let a = store
            .create("{}", "https://example.com/a", fire_in(60))
            .unwrap();
        let b = store
            .create("{}", "https://example.com/b", fire_in(60))
            .unwrap();
        assert!(b.id > a.id);
        assert_eq!(a.status, EventStatus::Pending);
        assert_eq!(store.find_all().unwrap().len(), 2);
    }

    #[test]
    fn delete_unknown_is_not_found() {
        let store = store();
        assert!(matches!(
            store.delete(99).unwrap_err(),
            SchedulerError::NotFound(99)
        ));

        let e = store.create("{}", "https://example.com", fire_in(60)).unwrap();
        store.delete(e.id).unwrap();
        assert!(store.find_all().unwrap().is_empty());
    }

    #[test]
    fn due_window_bounds() {
        let store = store();
        let soon = store.create("{}", "https://example.com", fire_in(60)).unwrap();
        let far = store
            .create("{}", "https://example.com", fire_in(7200))
            .unwrap();

        let due = store
            .find_due_within(Utc::now(), Duration::from_secs(1800))
            .unwrap();
        let ids: Vec<i64> = due.iter().map(|e| e.id).collect();
        assert!(ids.contains(&soon.id));
        assert!(!ids.contains(&far.id));
    }

    #[test]
    fn due_window_excludes_terminal() {
        let store = store();
        let e = store.create("{}", "https://example.com", fire_in(60)).unwrap();
        store.mark_terminal(e.id, DeliveryOutcome::Failed).unwrap();

        let due = store
            .find_due_within(Utc::now(), Duration::from_secs(1800))
            .unwrap();
        assert!(due.is_empty());
        assert!(store.find_pending().unwrap().is_empty());
        assert_eq!(store.find_all().unwrap().len(), 1);
    }

    #[test]
    fn mark_terminal_is_idempotent() {
        let store = store();
        let e = store.create("{}", "https://example.com", fire_in(60)).unwrap();

        store.mark_terminal(e.id, DeliveryOutcome::Delivered).unwrap();
        // Second mark with a different outcome is a no-op, not an error.
        store.mark_terminal(e.id, DeliveryOutcome::Failed).unwrap();

        let all = store.find_all().unwrap();
        assert_eq!(all[0].status, EventStatus::Delivered);
    }

    #[test]
    fn mark_terminal_unknown_is_not_found() {
        let store = store();
        assert!(matches!(
            store.mark_terminal(42, DeliveryOutcome::Delivered).unwrap_err(),
            SchedulerError::NotFound(42)
        ));
    }

    #[test]
    fn timestamps_round_trip() {
        let store = store();
        let fire_at = fire_in(90);
        let e = store.create("{}", "https://example.com", fire_at).unwrap();
        let loaded = &store.find_all().unwrap()[0];
        assert_eq!(loaded.id, e.id);
        assert!((loaded.fire_at - fire_at).num_milliseconds().abs() < 1000);
    }
}
