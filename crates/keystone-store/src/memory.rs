//! In-memory implementation of the EventStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use keystone_core::{EventId, EventRecord, ScopeId};

use crate::error::Result;
use crate::traits::{EventStore, StoredEvent};

/// In-memory journal.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Events in journal order; `events[i].seq == i + 1`.
    events: Vec<StoredEvent>,

    /// Id index: event_id -> earliest seq.
    by_id: HashMap<EventId, u64>,
}

impl MemoryStoreInner {
    fn at(&self, seq: u64) -> Option<&StoredEvent> {
        let index = usize::try_from(seq.checked_sub(1)?).ok()?;
        self.events.get(index)
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of journaled events.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn append(&self, record: &EventRecord) -> Result<StoredEvent> {
        let id = record.compute_id()?;
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let event = StoredEvent {
            seq: inner.events.len() as u64 + 1,
            id,
            record: record.clone(),
        };
        inner.by_id.entry(id).or_insert(event.seq);
        inner.events.push(event.clone());
        Ok(event)
    }

    async fn get_event(&self, seq: u64) -> Result<Option<StoredEvent>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.at(seq).cloned())
    }

    async fn get_event_by_id(&self, id: &EventId) -> Result<Option<StoredEvent>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.by_id.get(id).and_then(|&seq| inner.at(seq)).cloned())
    }

    async fn events_range(&self, start: u64, end: u64) -> Result<Vec<StoredEvent>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner
            .events
            .iter()
            .filter(|e| e.seq >= start && e.seq <= end)
            .cloned()
            .collect())
    }

    async fn events_for_scope(&self, scope: ScopeId) -> Result<Vec<StoredEvent>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner
            .events
            .iter()
            .filter(|e| e.record.scope() == scope)
            .cloned()
            .collect())
    }

    async fn head_seq(&self) -> Result<u64> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.events.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_core::{Address, CurrencyId, PermissionSet, PermissionsSet, PriceFeedAdded};

    fn permissions(scope: u64, ids: &[u8]) -> EventRecord {
        PermissionsSet {
            operator: Address::from_low_u64(1),
            account: Address::from_low_u64(2),
            scope: ScopeId(scope),
            permission_ids: ids.to_vec(),
            packed: ids.iter().copied().collect::<PermissionSet>(),
            caller: Address::from_low_u64(2),
        }
        .into()
    }

    fn feed(scope: u64) -> EventRecord {
        PriceFeedAdded {
            scope: ScopeId(scope),
            pricing_currency: CurrencyId(1),
            unit_currency: CurrencyId(2),
            feed: Address::from_low_u64(9),
            caller: Address::from_low_u64(3),
        }
        .into()
    }

    #[tokio::test]
    async fn test_append_and_get() {
        let store = MemoryStore::new();
        assert_eq!(store.head_seq().await.unwrap(), 0);

        let first = store.append(&permissions(1, &[2, 3])).await.unwrap();
        let second = store.append(&feed(1)).await.unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
        assert_eq!(store.head_seq().await.unwrap(), 2);

        assert_eq!(store.get_event(1).await.unwrap(), Some(first.clone()));
        assert_eq!(store.get_event_by_id(&second.id).await.unwrap(), Some(second));
        assert!(store.get_event(0).await.unwrap().is_none());
        assert!(store.get_event(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_repeated_record_is_journaled_again() {
        let store = MemoryStore::new();
        let record = permissions(1, &[2]);
        let first = store.append(&record).await.unwrap();
        store.append(&permissions(1, &[3])).await.unwrap();
        let again = store.append(&record).await.unwrap();

        assert_eq!(again.seq, 3);
        assert_eq!(again.id, first.id);
        assert_eq!(store.len(), 3);
        assert_eq!(store.get_event_by_id(&first.id).await.unwrap().unwrap().seq, 1);
    }

    #[tokio::test]
    async fn test_range_and_scope_filter() {
        let store = MemoryStore::new();
        store.append(&permissions(1, &[2])).await.unwrap();
        store.append(&feed(0)).await.unwrap();
        store.append(&permissions(1, &[4])).await.unwrap();
        store.append(&permissions(5, &[4])).await.unwrap();

        let range = store.events_range(2, 3).await.unwrap();
        assert_eq!(range.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![2, 3]);

        let scoped = store.events_for_scope(ScopeId(1)).await.unwrap();
        assert_eq!(scoped.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![1, 3]);
        assert!(store.events_for_scope(ScopeId(42)).await.unwrap().is_empty());
    }
}
