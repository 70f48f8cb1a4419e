//! Process-wide record of which live connections watch which events.
//!
//! The registry is in-memory only and starts empty on every boot; clients
//! re-subscribe when they reconnect. A single coarse lock guards all of it:
//! inserts and removals happen on connect, join, leave and disconnect, far
//! less often than attendance writes.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use super::ConnectionId;
use crate::domain::EventId;

#[derive(Debug, Default)]
struct Rooms {
    live: HashSet<ConnectionId>,
    by_event: HashMap<EventId, HashSet<ConnectionId>>,
    by_connection: HashMap<ConnectionId, HashSet<EventId>>,
}

impl Rooms {
    fn detach(&mut self, connection_id: ConnectionId, event_id: EventId) {
        if let Some(members) = self.by_event.get_mut(&event_id) {
            members.remove(&connection_id);
            if members.is_empty() {
                self.by_event.remove(&event_id);
            }
        }
    }
}

/// Tracks live connections and their per-event subscriptions.
///
/// Invariant: every subscribed connection is live. Subscribing a connection
/// that was never registered, or has already been dropped, is refused.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: RwLock<Rooms>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `connection_id` as live.
    pub async fn register(&self, connection_id: ConnectionId) {
        self.rooms.write().await.live.insert(connection_id);
    }

    /// Subscribes a live connection to `event_id`. Returns `false` if the
    /// connection is not live or was already subscribed.
    pub async fn subscribe(&self, connection_id: ConnectionId, event_id: EventId) -> bool {
        let mut rooms = self.rooms.write().await;
        if !rooms.live.contains(&connection_id) {
            tracing::debug!(%connection_id, %event_id, "ignoring subscribe from dead connection");
            return false;
        }
        rooms
            .by_connection
            .entry(connection_id)
            .or_default()
            .insert(event_id);
        rooms
            .by_event
            .entry(event_id)
            .or_default()
            .insert(connection_id)
    }

    /// Removes one subscription. Unknown connections and events are a no-op.
    /// Returns `true` if a subscription was removed.
    pub async fn unsubscribe(&self, connection_id: ConnectionId, event_id: EventId) -> bool {
        let mut rooms = self.rooms.write().await;
        let removed = rooms
            .by_connection
            .get_mut(&connection_id)
            .is_some_and(|events| events.remove(&event_id));
        if removed {
            rooms.detach(connection_id, event_id);
        }
        removed
    }

    /// Forgets a connection and all its subscriptions. Unknown connections
    /// are a no-op. Returns the number of subscriptions removed.
    pub async fn drop_connection(&self, connection_id: ConnectionId) -> usize {
        let mut rooms = self.rooms.write().await;
        rooms.live.remove(&connection_id);
        let events = rooms
            .by_connection
            .remove(&connection_id)
            .unwrap_or_default();
        for event_id in &events {
            rooms.detach(connection_id, *event_id);
        }
        events.len()
    }

    /// Removes every subscription to `event_id`, e.g. after the event is
    /// deleted. Returns the number of connections that were watching it.
    pub async fn drop_event(&self, event_id: EventId) -> usize {
        let mut rooms = self.rooms.write().await;
        let members = rooms.by_event.remove(&event_id).unwrap_or_default();
        for connection_id in &members {
            if let Some(events) = rooms.by_connection.get_mut(connection_id) {
                events.remove(&event_id);
            }
        }
        members.len()
    }

    /// Connections currently subscribed to `event_id`.
    pub async fn subscribers_of(&self, event_id: EventId) -> HashSet<ConnectionId> {
        self.rooms
            .read()
            .await
            .by_event
            .get(&event_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Events `connection_id` is subscribed to.
    pub async fn subscriptions_of(&self, connection_id: ConnectionId) -> HashSet<EventId> {
        self.rooms
            .read()
            .await
            .by_connection
            .get(&connection_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns `true` if the connection is live.
    pub async fn is_live(&self, connection_id: ConnectionId) -> bool {
        self.rooms.read().await.live.contains(&connection_id)
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.rooms.read().await.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn registry_with(connection_id: ConnectionId) -> RoomRegistry {
        let registry = RoomRegistry::new();
        registry.register(connection_id).await;
        registry
    }

    #[tokio::test]
    async fn subscribe_and_list() {
        let conn = ConnectionId::new();
        let registry = registry_with(conn).await;
        let event = EventId::generate();

        assert!(registry.subscribe(conn, event).await);
        assert!(!registry.subscribe(conn, event).await);
        assert!(registry.subscribers_of(event).await.contains(&conn));
        assert!(registry.subscriptions_of(conn).await.contains(&event));
    }

    #[tokio::test]
    async fn unregistered_connection_cannot_subscribe() {
        let registry = RoomRegistry::new();
        let conn = ConnectionId::new();
        let event = EventId::generate();
        assert!(!registry.subscribe(conn, event).await);
        assert!(registry.subscribers_of(event).await.is_empty());
    }

    #[tokio::test]
    async fn unsubscribe_unknown_is_noop() {
        let registry = RoomRegistry::new();
        assert!(
            !registry
                .unsubscribe(ConnectionId::new(), EventId::generate())
                .await
        );
    }

    #[tokio::test]
    async fn unsubscribe_removes_membership() {
        let conn = ConnectionId::new();
        let registry = registry_with(conn).await;
        let event = EventId::generate();
        registry.subscribe(conn, event).await;

        assert!(registry.unsubscribe(conn, event).await);
        assert!(registry.subscribers_of(event).await.is_empty());
        assert!(registry.is_live(conn).await);
    }

    #[tokio::test]
    async fn drop_connection_clears_everything() {
        let conn = ConnectionId::new();
        let other = ConnectionId::new();
        let registry = registry_with(conn).await;
        registry.register(other).await;
        let (a, b) = (EventId::generate(), EventId::generate());
        registry.subscribe(conn, a).await;
        registry.subscribe(conn, b).await;
        registry.subscribe(other, a).await;

        assert_eq!(registry.drop_connection(conn).await, 2);
        assert!(!registry.is_live(conn).await);
        assert!(registry.subscribers_of(b).await.is_empty());
        assert_eq!(registry.subscribers_of(a).await.len(), 1);
        assert!(!registry.subscribe(conn, a).await);
    }

    #[tokio::test]
    async fn drop_unknown_connection_is_noop() {
        let registry = RoomRegistry::new();
        assert_eq!(registry.drop_connection(ConnectionId::new()).await, 0);
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn drop_event_clears_room() {
        let conn = ConnectionId::new();
        let registry = registry_with(conn).await;
        let event = EventId::generate();
        registry.subscribe(conn, event).await;

        assert_eq!(registry.drop_event(event).await, 1);
        assert!(registry.subscribers_of(event).await.is_empty());
        assert!(registry.subscriptions_of(conn).await.is_empty());
    }
}
