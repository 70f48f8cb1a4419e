//! Storage seams for event records and their attendee sets.
//!
//! [`AttendanceStore`] is the single source of truth for attendee sets and
//! the only place attendance state is mutated. [`EventCatalog`] owns the
//! rest of the event record. Both are implemented by
//! [`InMemoryEventStore`] and, when persistence is enabled, by
//! [`PostgresEventStore`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{
    AttendanceMutation, AttendeeSet, EventFilter, EventId, EventPatch, EventRecord, UserId,
};
use crate::error::GatewayError;

pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;

/// Durable mapping from event id to attendee set.
///
/// # Concurrency
///
/// Mutations on the same event id are serialized; mutations on different
/// ids never wait on each other. Every mutation returns the attendee set
/// as it stood when the write committed.
#[async_trait]
pub trait AttendanceStore: Send + Sync + std::fmt::Debug {
    /// Returns the current attendee set.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] if the event does not exist.
    async fn attendees(&self, event_id: EventId) -> Result<AttendeeSet, GatewayError>;

    /// Adds `user_id` to the event. Adding a present user is a no-op that
    /// reports `changed: false` and the current set.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] if the event does not exist.
    async fn add_attendee(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<AttendanceMutation, GatewayError>;

    /// Removes `user_id` from the event. Removing an absent user is a no-op
    /// that reports `changed: false` and the current set.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] if the event does not exist.
    async fn remove_attendee(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<AttendanceMutation, GatewayError>;
}

/// Create/read/update/delete of event records.
#[async_trait]
pub trait EventCatalog: Send + Sync + std::fmt::Debug {
    /// Stores a new record.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the id is already taken,
    /// or a persistence error.
    async fn insert(&self, record: EventRecord) -> Result<EventRecord, GatewayError>;

    /// Fetches one record, attendees included.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] if the event does not exist.
    async fn fetch(&self, event_id: EventId) -> Result<EventRecord, GatewayError>;

    /// Lists records passing `filter`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the backend fails.
    async fn list(&self, filter: &EventFilter) -> Result<Vec<EventRecord>, GatewayError>;

    /// Applies a metadata patch. The attendee set is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] if the event does not exist.
    async fn update(
        &self,
        event_id: EventId,
        patch: EventPatch,
    ) -> Result<EventRecord, GatewayError>;

    /// Deletes the record together with its attendee set.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] if the event does not exist.
    async fn delete(&self, event_id: EventId) -> Result<EventRecord, GatewayError>;
}
