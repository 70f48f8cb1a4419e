//! Concurrent in-memory event storage with per-event fine-grained locking.
//!
//! [`InMemoryEventStore`] stores every event in a `HashMap` where each
//! entry is individually protected by a [`tokio::sync::RwLock`]. This
//! allows concurrent reads on the same event and concurrent writes on
//! different events, while writes to one event's attendee set serialize.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AttendanceStore, EventCatalog};
use crate::domain::{
    AttendanceMutation, AttendeeSet, EventFilter, EventId, EventPatch, EventRecord, UserId,
};
use crate::error::GatewayError;

/// One stored event plus its bookkeeping.
#[derive(Debug)]
struct Entry {
    record: EventRecord,
    /// Bumped on every effective attendee change.
    revision: u64,
    /// Set under the entry lock when the event is deleted, so a writer that
    /// fetched the entry before deletion cannot mutate it afterwards.
    removed: bool,
}

/// Process-local event store.
///
/// Uses a `RwLock<HashMap<...>>` for the outer map and per-entry
/// `Arc<RwLock<Entry>>` for per-event locking.
///
/// # Concurrency
///
/// - Multiple tasks may read the same event concurrently.
/// - Writes to different events are concurrent.
/// - Writes to the same event are serialized.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<HashMap<EventId, Arc<RwLock<Entry>>>>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored events.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// Returns `true` if the store holds no events.
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    async fn entry(&self, event_id: EventId) -> Result<Arc<RwLock<Entry>>, GatewayError> {
        let map = self.events.read().await;
        map.get(&event_id)
            .cloned()
            .ok_or(GatewayError::EventNotFound(event_id))
    }

    /// Runs `apply` against the attendee set while holding the event's write
    /// lock, then captures the committed state.
    async fn mutate<F>(
        &self,
        event_id: EventId,
        apply: F,
    ) -> Result<AttendanceMutation, GatewayError>
    where
        F: FnOnce(&mut AttendeeSet) -> bool + Send,
    {
        let entry_lock = self.entry(event_id).await?;
        let mut entry = entry_lock.write().await;
        if entry.removed {
            return Err(GatewayError::EventNotFound(event_id));
        }

        let changed = apply(&mut entry.record.attendees);
        if changed {
            entry.revision = entry.revision.saturating_add(1);
        }

        Ok(AttendanceMutation {
            event_id,
            attendees: entry.record.attendees.clone(),
            changed,
            revision: entry.revision,
        })
    }
}

#[async_trait]
impl AttendanceStore for InMemoryEventStore {
    async fn attendees(&self, event_id: EventId) -> Result<AttendeeSet, GatewayError> {
        let entry_lock = self.entry(event_id).await?;
        let entry = entry_lock.read().await;
        if entry.removed {
            return Err(GatewayError::EventNotFound(event_id));
        }
        Ok(entry.record.attendees.clone())
    }

    async fn add_attendee(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<AttendanceMutation, GatewayError> {
        self.mutate(event_id, |attendees| attendees.insert(user_id))
            .await
    }

    async fn remove_attendee(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<AttendanceMutation, GatewayError> {
        self.mutate(event_id, |attendees| attendees.remove(user_id))
            .await
    }
}

#[async_trait]
impl EventCatalog for InMemoryEventStore {
    async fn insert(&self, record: EventRecord) -> Result<EventRecord, GatewayError> {
        let event_id = record.id;
        let mut map = self.events.write().await;
        if map.contains_key(&event_id) {
            return Err(GatewayError::InvalidRequest(format!(
                "event {event_id} already exists"
            )));
        }
        map.insert(
            event_id,
            Arc::new(RwLock::new(Entry {
                record: record.clone(),
                revision: 0,
                removed: false,
            })),
        );
        Ok(record)
    }

    async fn fetch(&self, event_id: EventId) -> Result<EventRecord, GatewayError> {
        let entry_lock = self.entry(event_id).await?;
        let entry = entry_lock.read().await;
        if entry.removed {
            return Err(GatewayError::EventNotFound(event_id));
        }
        Ok(entry.record.clone())
    }

    async fn list(&self, filter: &EventFilter) -> Result<Vec<EventRecord>, GatewayError> {
        let map = self.events.read().await;
        let mut records = Vec::with_capacity(map.len());
        for entry_lock in map.values() {
            let entry = entry_lock.read().await;
            if !entry.removed && filter.matches(&entry.record) {
                records.push(entry.record.clone());
            }
        }
        records.sort_by_key(|record| record.created_at);
        Ok(records)
    }

    async fn update(
        &self,
        event_id: EventId,
        patch: EventPatch,
    ) -> Result<EventRecord, GatewayError> {
        let entry_lock = self.entry(event_id).await?;
        let mut entry = entry_lock.write().await;
        if entry.removed {
            return Err(GatewayError::EventNotFound(event_id));
        }
        patch.apply_to(&mut entry.record.details);
        Ok(entry.record.clone())
    }

    async fn delete(&self, event_id: EventId) -> Result<EventRecord, GatewayError> {
        let entry_lock = self
            .events
            .write()
            .await
            .remove(&event_id)
            .ok_or(GatewayError::EventNotFound(event_id))?;

        let mut entry = entry_lock.write().await;
        entry.removed = true;
        Ok(entry.record.clone())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::event_record::fixtures;

    async fn store_with_event() -> (Arc<InMemoryEventStore>, EventId) {
        let store = Arc::new(InMemoryEventStore::new());
        let record = EventRecord::new(fixtures::details("tech"), UserId::generate());
        let id = record.id;
        let Ok(_) = store.insert(record).await else {
            panic!("insert failed");
        };
        (store, id)
    }

    #[tokio::test]
    async fn insert_and_fetch() {
        let (store, id) = store_with_event().await;
        let Ok(record) = store.fetch(id).await else {
            panic!("event not found");
        };
        assert_eq!(record.id, id);
        assert!(record.attendees.is_empty());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let (store, id) = store_with_event().await;
        let Ok(existing) = store.fetch(id).await else {
            panic!("event not found");
        };
        assert!(store.insert(existing).await.is_err());
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let store = InMemoryEventStore::new();
        let id = EventId::generate();
        let result = store.add_attendee(id, UserId::generate()).await;
        assert!(matches!(result, Err(GatewayError::EventNotFound(e)) if e == id));
        assert!(store.attendees(id).await.is_err());
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let (store, id) = store_with_event().await;
        let user = UserId::generate();

        let Ok(first) = store.add_attendee(id, user).await else {
            panic!("first add failed");
        };
        assert!(first.changed);
        assert_eq!(first.attendee_count(), 1);
        assert_eq!(first.revision, 1);

        let Ok(second) = store.add_attendee(id, user).await else {
            panic!("second add failed");
        };
        assert!(!second.changed);
        assert_eq!(second.attendee_count(), 1);
        assert_eq!(second.revision, 1);
    }

    #[tokio::test]
    async fn remove_absent_returns_current_count() {
        let (store, id) = store_with_event().await;
        let _ = store.add_attendee(id, UserId::generate()).await;

        let Ok(mutation) = store.remove_attendee(id, UserId::generate()).await else {
            panic!("remove failed");
        };
        assert!(!mutation.changed);
        assert_eq!(mutation.attendee_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_distinct_joins_are_all_counted() {
        let (store, id) = store_with_event().await;
        let mut handles = Vec::new();
        for _ in 0..64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.add_attendee(id, UserId::generate()).await
            }));
        }
        for handle in handles {
            let Ok(Ok(mutation)) = handle.await else {
                panic!("join task failed");
            };
            assert!(mutation.changed);
        }

        let Ok(attendees) = store.attendees(id).await else {
            panic!("event not found");
        };
        assert_eq!(attendees.len(), 64);
    }

    #[tokio::test]
    async fn events_are_isolated() {
        let (store, a) = store_with_event().await;
        let record = EventRecord::new(fixtures::details("music"), UserId::generate());
        let b = record.id;
        let _ = store.insert(record).await;

        let _ = store.add_attendee(a, UserId::generate()).await;
        let _ = store.add_attendee(a, UserId::generate()).await;

        let Ok(b_attendees) = store.attendees(b).await else {
            panic!("event b missing");
        };
        assert!(b_attendees.is_empty());
    }

    #[tokio::test]
    async fn update_keeps_attendees() {
        let (store, id) = store_with_event().await;
        let user = UserId::generate();
        let _ = store.add_attendee(id, user).await;

        let patch = EventPatch {
            name: Some("Renamed".to_string()),
            ..EventPatch::default()
        };
        let Ok(updated) = store.update(id, patch).await else {
            panic!("update failed");
        };
        assert_eq!(updated.details.name, "Renamed");
        assert!(updated.attendees.contains(user));
    }

    #[tokio::test]
    async fn delete_removes_event_and_attendees() {
        let (store, id) = store_with_event().await;
        let _ = store.add_attendee(id, UserId::generate()).await;

        let Ok(removed) = store.delete(id).await else {
            panic!("delete failed");
        };
        assert_eq!(removed.attendees.len(), 1);
        assert!(store.is_empty().await);
        assert!(store.add_attendee(id, UserId::generate()).await.is_err());
        assert!(store.delete(id).await.is_err());
    }

    #[tokio::test]
    async fn stale_entry_handle_cannot_mutate_after_delete() {
        let (store, id) = store_with_event().await;
        let Ok(handle) = store.entry(id).await else {
            panic!("event not found");
        };
        let _ = store.delete(id).await;
        assert!(handle.read().await.removed);
        assert!(store.add_attendee(id, UserId::generate()).await.is_err());
    }

    #[tokio::test]
    async fn list_filters_by_category() {
        let (store, _) = store_with_event().await;
        let _ = store
            .insert(EventRecord::new(fixtures::details("music"), UserId::generate()))
            .await;

        let Ok(all) = store.list(&EventFilter::default()).await else {
            panic!("list failed");
        };
        assert_eq!(all.len(), 2);

        let filter = EventFilter {
            category: Some("music".to_string()),
        };
        let Ok(music) = store.list(&filter).await else {
            panic!("list failed");
        };
        assert_eq!(music.len(), 1);
    }
}
