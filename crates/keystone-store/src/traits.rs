//! EventStore trait: the abstract interface for the event journal.

use async_trait::async_trait;
use keystone_core::{EventId, EventRecord, ScopeId};

use crate::error::Result;

/// A journaled record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    /// Position in the journal, starting at 1.
    pub seq: u64,
    /// Blake3 of the record's canonical bytes. Identical records share it.
    pub id: EventId,
    pub record: EventRecord,
}

/// Async interface for event persistence.
///
/// For SQLite, calls are moved onto `spawn_blocking` internally to avoid
/// blocking the runtime.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append a record at the next sequence number.
    async fn append(&self, record: &EventRecord) -> Result<StoredEvent>;

    /// Get the event at a sequence number.
    async fn get_event(&self, seq: u64) -> Result<Option<StoredEvent>>;

    /// Get the earliest event with this content id.
    async fn get_event_by_id(&self, id: &EventId) -> Result<Option<StoredEvent>>;

    /// Events with `start <= seq <= end`, ordered by seq.
    async fn events_range(&self, start: u64, end: u64) -> Result<Vec<StoredEvent>>;

    /// Every event recorded for a scope, ordered by seq.
    async fn events_for_scope(&self, scope: ScopeId) -> Result<Vec<StoredEvent>>;

    /// Sequence number of the newest event, 0 when empty.
    async fn head_seq(&self) -> Result<u64>;
}
