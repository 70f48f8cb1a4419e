//! Event record operations: create, read, update, delete.
//!
//! Thin layer over [`EventCatalog`] that applies the creator-or-privileged
//! gate and keeps the room registry in step with deletions.

use std::sync::Arc;

use crate::broadcast::RoomRegistry;
use crate::domain::{EventDetails, EventFilter, EventId, EventPatch, EventRecord, UserId};
use crate::error::GatewayError;
use crate::store::EventCatalog;

/// Identity of the caller as supplied by the credential collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    /// Verified user id.
    pub user_id: UserId,
    /// Whether the caller holds the privileged role.
    pub privileged: bool,
}

/// Orchestration layer for event records.
#[derive(Debug, Clone)]
pub struct EventService {
    catalog: Arc<dyn EventCatalog>,
    registry: Arc<RoomRegistry>,
}

impl EventService {
    /// Creates a new `EventService`.
    #[must_use]
    pub fn new(catalog: Arc<dyn EventCatalog>, registry: Arc<RoomRegistry>) -> Self {
        Self { catalog, registry }
    }

    /// Creates an event owned by `caller` with an empty attendee set.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the record cannot be stored.
    pub async fn create(
        &self,
        details: EventDetails,
        caller: Caller,
    ) -> Result<EventRecord, GatewayError> {
        let record = self
            .catalog
            .insert(EventRecord::new(details, caller.user_id))
            .await?;
        tracing::info!(event_id = %record.id, created_by = %caller.user_id, "event created");
        Ok(record)
    }

    /// Fetches one event with its current attendees.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] if the event does not exist.
    pub async fn get(&self, event_id: EventId) -> Result<EventRecord, GatewayError> {
        self.catalog.fetch(event_id).await
    }

    /// Lists events passing `filter`.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the backend fails.
    pub async fn list(&self, filter: &EventFilter) -> Result<Vec<EventRecord>, GatewayError> {
        self.catalog.list(filter).await
    }

    /// Updates event metadata.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] if the event does not exist
    /// and [`GatewayError::Forbidden`] if `caller` is neither its creator
    /// nor privileged.
    pub async fn update(
        &self,
        event_id: EventId,
        patch: EventPatch,
        caller: Caller,
    ) -> Result<EventRecord, GatewayError> {
        self.authorize(event_id, caller).await?;
        let record = self.catalog.update(event_id, patch).await?;
        tracing::info!(%event_id, updated_by = %caller.user_id, "event updated");
        Ok(record)
    }

    /// Deletes an event and its attendee set, and drops every live
    /// subscription to it so no further updates are sent for the id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EventNotFound`] if the event does not exist
    /// and [`GatewayError::Forbidden`] if `caller` is neither its creator
    /// nor privileged.
    pub async fn delete(&self, event_id: EventId, caller: Caller) -> Result<(), GatewayError> {
        self.authorize(event_id, caller).await?;
        let removed = self.catalog.delete(event_id).await?;
        let watchers = self.registry.drop_event(event_id).await;
        tracing::info!(
            %event_id,
            deleted_by = %caller.user_id,
            attendee_count = removed.attendees.len(),
            watchers,
            "event deleted"
        );
        Ok(())
    }

    async fn authorize(&self, event_id: EventId, caller: Caller) -> Result<(), GatewayError> {
        let record = self.catalog.fetch(event_id).await?;
        if record.is_managed_by(caller.user_id, caller.privileged) {
            Ok(())
        } else {
            tracing::warn!(%event_id, user_id = %caller.user_id, "event management refused");
            Err(GatewayError::Forbidden(format!(
                "only the creator or an admin may modify event {event_id}"
            )))
        }
    }
}
