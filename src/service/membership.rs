//! Membership service: idempotent join/leave against the attendance store.

use std::sync::Arc;

use crate::domain::{AttendanceAction, AttendanceChange, AttendanceMutation};
use crate::error::GatewayError;
use crate::store::AttendanceStore;

/// The one place attendee sets are changed.
///
/// Stateless coordinator over an [`AttendanceStore`]. Identifier checks
/// happen before the store is touched: the raw-string entry points parse
/// first, and [`MembershipService::apply`] only accepts an already
/// validated [`AttendanceChange`].
#[derive(Debug, Clone)]
pub struct MembershipService {
    store: Arc<dyn AttendanceStore>,
}

impl MembershipService {
    /// Creates a new `MembershipService`.
    #[must_use]
    pub fn new(store: Arc<dyn AttendanceStore>) -> Self {
        Self { store }
    }

    /// Adds `user_id` to `event_id`'s attendees.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidIdentifier`] for a malformed id and
    /// [`GatewayError::EventNotFound`] for an unknown event.
    pub async fn join(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<AttendanceMutation, GatewayError> {
        let change = AttendanceChange::parse(event_id, user_id, AttendanceAction::Join)?;
        self.apply(change).await
    }

    /// Removes `user_id` from `event_id`'s attendees.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidIdentifier`] for a malformed id and
    /// [`GatewayError::EventNotFound`] for an unknown event.
    pub async fn leave(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<AttendanceMutation, GatewayError> {
        let change = AttendanceChange::parse(event_id, user_id, AttendanceAction::Leave)?;
        self.apply(change).await
    }

    /// Applies a validated change.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] for an unknown event, or a
    /// persistence error from the store.
    pub async fn apply(
        &self,
        change: AttendanceChange,
    ) -> Result<AttendanceMutation, GatewayError> {
        let AttendanceChange {
            event_id,
            user_id,
            action,
        } = change;

        let mutation = match action {
            AttendanceAction::Join => self.store.add_attendee(event_id, user_id).await?,
            AttendanceAction::Leave => self.store.remove_attendee(event_id, user_id).await?,
        };

        tracing::info!(
            %event_id,
            %user_id,
            %action,
            changed = mutation.changed,
            attendee_count = mutation.attendee_count(),
            "attendance applied"
        );
        Ok(mutation)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::domain::event_record::fixtures;
    use crate::domain::{AttendeeSet, EventId, EventRecord, UserId};
    use crate::store::{EventCatalog, InMemoryEventStore};

    /// Store that counts every call and knows no events.
    #[derive(Debug, Default)]
    struct CountingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AttendanceStore for CountingStore {
        async fn attendees(&self, event_id: EventId) -> Result<AttendeeSet, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(GatewayError::EventNotFound(event_id))
        }

        async fn add_attendee(
            &self,
            event_id: EventId,
            _user_id: UserId,
        ) -> Result<AttendanceMutation, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(GatewayError::EventNotFound(event_id))
        }

        async fn remove_attendee(
            &self,
            event_id: EventId,
            _user_id: UserId,
        ) -> Result<AttendanceMutation, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(GatewayError::EventNotFound(event_id))
        }
    }

    async fn service_with_event() -> (MembershipService, Arc<InMemoryEventStore>, String) {
        let store = Arc::new(InMemoryEventStore::new());
        let record = EventRecord::new(fixtures::details("tech"), UserId::generate());
        let id = record.id.to_string();
        let Ok(_) = store.insert(record).await else {
            panic!("insert failed");
        };
        let attendance: Arc<dyn AttendanceStore> = Arc::clone(&store) as Arc<dyn AttendanceStore>;
        (MembershipService::new(attendance), store, id)
    }

    #[tokio::test]
    async fn malformed_ids_never_reach_the_store() {
        let store = Arc::new(CountingStore::default());
        let service = MembershipService::new(Arc::clone(&store) as Arc<dyn AttendanceStore>);

        let result = service.join("not-a-valid-id", "also-invalid").await;
        assert!(matches!(result, Err(GatewayError::InvalidIdentifier { .. })));

        let result = service.leave("65f1a2b3c4d5e6f708192a3b", "also-invalid").await;
        assert!(matches!(result, Err(GatewayError::InvalidIdentifier { .. })));

        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let store = Arc::new(CountingStore::default());
        let service = MembershipService::new(Arc::clone(&store) as Arc<dyn AttendanceStore>);
        let event = EventId::generate().to_string();
        let user = UserId::generate().to_string();

        let result = service.join(&event, &user).await;
        assert!(matches!(result, Err(GatewayError::EventNotFound(_))));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn join_twice_changes_once() {
        let (service, _, event) = service_with_event().await;
        let user = UserId::generate().to_string();

        let Ok(first) = service.join(&event, &user).await else {
            panic!("first join failed");
        };
        let Ok(second) = service.join(&event, &user).await else {
            panic!("second join failed");
        };
        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(first.attendees, second.attendees);
        assert_eq!(second.attendee_count(), 1);
    }

    #[tokio::test]
    async fn join_then_leave_restores_previous_set() {
        let (service, store, event) = service_with_event().await;
        let Ok(event_id) = event.parse::<EventId>() else {
            panic!("bad id");
        };
        let _ = service.join(&event, &UserId::generate().to_string()).await;
        let Ok(before) = store.attendees(event_id).await else {
            panic!("event missing");
        };

        let user = UserId::generate().to_string();
        let _ = service.join(&event, &user).await;
        let Ok(after_leave) = service.leave(&event, &user).await else {
            panic!("leave failed");
        };
        assert!(after_leave.changed);
        assert_eq!(after_leave.attendees, before);
    }

    #[tokio::test]
    async fn leave_when_absent_is_noop() {
        let (service, _, event) = service_with_event().await;
        let Ok(outcome) = service.leave(&event, &UserId::generate().to_string()).await else {
            panic!("leave failed");
        };
        assert!(!outcome.changed);
        assert_eq!(outcome.attendee_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_join_and_leave_settle_on_one_attendee() {
        let (service, store, event) = service_with_event().await;
        let u1 = UserId::generate();
        let u2 = UserId::generate();

        let Ok(first) = service.join(&event, &u1.to_string()).await else {
            panic!("join failed");
        };
        assert_eq!(first.attendee_count(), 1);

        let joiner = {
            let service = service.clone();
            let event = event.clone();
            tokio::spawn(async move { service.join(&event, &u2.to_string()).await })
        };
        let leaver = {
            let service = service.clone();
            let event = event.clone();
            tokio::spawn(async move { service.leave(&event, &u1.to_string()).await })
        };
        let (Ok(Ok(_)), Ok(Ok(_))) = (joiner.await, leaver.await) else {
            panic!("racing operations failed");
        };

        let Ok(event_id) = event.parse::<EventId>() else {
            panic!("bad id");
        };
        let Ok(final_set) = store.attendees(event_id).await else {
            panic!("event missing");
        };
        assert_eq!(final_set.len(), 1);
        assert!(final_set.contains(u2));
        assert!(!final_set.contains(u1));
    }
}
