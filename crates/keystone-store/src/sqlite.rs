//! SQLite implementation of the EventStore trait.
//!
//! The primary journal backend. Uses rusqlite with bundled SQLite, wrapped
//! in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use keystone_core::{EventId, EventRecord, ScopeId};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{EventStore, StoredEvent};

const SELECT_EVENT: &str = "SELECT seq, event_id, canonical_bytes FROM events";

/// SQLite-based journal.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

/// Raw columns of one `events` row.
struct EventRow {
    seq: i64,
    event_id: Vec<u8>,
    canonical: Vec<u8>,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        seq: row.get("seq")?,
        event_id: row.get("event_id")?,
        canonical: row.get("canonical_bytes")?,
    })
}

impl EventRow {
    /// Decode the record and check it against its stored id.
    fn decode(self) -> Result<StoredEvent> {
        let id: [u8; 32] = self.event_id.try_into().map_err(|bytes: Vec<u8>| {
            StoreError::InvalidData(format!("event id has {} bytes at seq {}", bytes.len(), self.seq))
        })?;
        let id = EventId::from_bytes(id);

        if EventId::hash(&self.canonical) != id {
            return Err(StoreError::InvalidData(format!(
                "event {} at seq {} does not match its canonical bytes",
                id, self.seq
            )));
        }

        Ok(StoredEvent {
            seq: self.seq as u64,
            id,
            record: EventRecord::from_canonical_bytes(&self.canonical)?,
        })
    }
}

fn find_by_id(conn: &Connection, id: &EventId) -> Result<Option<StoredEvent>> {
    conn.query_row(
        &format!("{SELECT_EVENT} WHERE event_id = ?1 ORDER BY seq LIMIT 1"),
        params![id.as_bytes().as_slice()],
        read_row,
    )
    .optional()?
    .map(EventRow::decode)
    .transpose()
}

fn collect(stmt: &mut rusqlite::Statement<'_>, params: impl rusqlite::Params) -> Result<Vec<StoredEvent>> {
    stmt.query_map(params, read_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?
        .into_iter()
        .map(EventRow::decode)
        .collect()
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn append(&self, record: &EventRecord) -> Result<StoredEvent> {
        let record = record.clone();
        let canonical = record.to_canonical_bytes()?;
        let id = EventId::hash(&canonical);

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let seq: i64 = tx.query_row("SELECT COALESCE(MAX(seq), 0) + 1 FROM events", [], |row| {
                row.get(0)
            })?;

            tx.execute(
                "INSERT INTO events (seq, event_id, kind, scope, caller, canonical_bytes, appended_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    seq,
                    id.as_bytes().as_slice(),
                    record.kind().to_u8() as i64,
                    record.scope().get() as i64,
                    record.caller().as_bytes().as_slice(),
                    canonical.as_slice(),
                    now_millis(),
                ],
            )?;
            tx.commit()?;

            Ok(StoredEvent {
                seq: seq as u64,
                id,
                record,
            })
        })
        .await
    }

    async fn get_event(&self, seq: u64) -> Result<Option<StoredEvent>> {
        let Ok(seq) = i64::try_from(seq) else {
            return Ok(None);
        };
        self.blocking(move |conn| {
            conn.query_row(
                &format!("{SELECT_EVENT} WHERE seq = ?1"),
                params![seq],
                read_row,
            )
            .optional()?
            .map(EventRow::decode)
            .transpose()
        })
        .await
    }

    async fn get_event_by_id(&self, id: &EventId) -> Result<Option<StoredEvent>> {
        let id = *id;
        self.blocking(move |conn| find_by_id(conn, &id)).await
    }

    async fn events_range(&self, start: u64, end: u64) -> Result<Vec<StoredEvent>> {
        let start = i64::try_from(start).unwrap_or(i64::MAX);
        let end = i64::try_from(end).unwrap_or(i64::MAX);
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_EVENT} WHERE seq >= ?1 AND seq <= ?2 ORDER BY seq"
            ))?;
            collect(&mut stmt, params![start, end])
        })
        .await
    }

    async fn events_for_scope(&self, scope: ScopeId) -> Result<Vec<StoredEvent>> {
        let scope = scope.get() as i64;
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_EVENT} WHERE scope = ?1 ORDER BY seq"))?;
            collect(&mut stmt, params![scope])
        })
        .await
    }

    async fn head_seq(&self) -> Result<u64> {
        self.blocking(|conn| {
            let head: i64 = conn.query_row("SELECT COALESCE(MAX(seq), 0) FROM events", [], |row| {
                row.get(0)
            })?;
            Ok(head as u64)
        })
        .await
    }
}
