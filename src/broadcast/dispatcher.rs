//! Fan-out of attendee count updates to live connections.
//!
//! [`BroadcastDispatcher`] wraps a [`tokio::sync::broadcast`] channel.
//! Every live connection holds one receiver; each published
//! [`AttendanceUpdate`] names its audience (everyone, or a snapshot of an
//! event's room) and every connection forwards only the updates addressed
//! to it. Publishing never waits on a receiver, so a slow or dead
//! connection cannot hold up the mutation that produced the update.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::broadcast;

use super::{ConnectionId, RoomRegistry};
use crate::domain::CountSnapshot;

/// Who receives an attendee count update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Only connections subscribed to the event.
    RoomScoped,
    /// Every live connection.
    Global,
}

impl FromStr for DeliveryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "room" | "room_scoped" | "room-scoped" => Ok(Self::RoomScoped),
            "global" => Ok(Self::Global),
            other => Err(format!(
                "unknown broadcast policy {other:?} (expected \"global\" or \"room\")"
            )),
        }
    }
}

impl fmt::Display for DeliveryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoomScoped => f.write_str("room"),
            Self::Global => f.write_str("global"),
        }
    }
}

/// Recipients of one update, resolved at publish time.
#[derive(Debug, Clone)]
pub enum Audience {
    /// Every connection holding a receiver.
    Everyone,
    /// The room members at the moment of publishing.
    Connections(Arc<HashSet<ConnectionId>>),
}

/// One attendee count update on its way to connections.
#[derive(Debug, Clone)]
pub struct AttendanceUpdate {
    /// Count and the store revision it was read at.
    pub snapshot: CountSnapshot,
    /// Who should receive it.
    pub audience: Audience,
}

impl AttendanceUpdate {
    /// Returns `true` if `connection_id` is in the audience.
    #[must_use]
    pub fn is_addressed_to(&self, connection_id: ConnectionId) -> bool {
        match &self.audience {
            Audience::Everyone => true,
            Audience::Connections(members) => members.contains(&connection_id),
        }
    }
}

/// Broadcast dispatcher for attendee count updates.
///
/// Constructed once at startup and shared by cloning. Backed by a
/// `tokio::broadcast` channel with a configurable capacity; when the ring
/// buffer is full the oldest updates are dropped for lagging receivers,
/// which is harmless because every later update carries the full count.
#[derive(Debug, Clone)]
pub struct BroadcastDispatcher {
    sender: broadcast::Sender<AttendanceUpdate>,
    registry: Arc<RoomRegistry>,
}

impl BroadcastDispatcher {
    /// Creates a dispatcher with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize, registry: Arc<RoomRegistry>) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, registry }
    }

    /// Returns the room registry used for room-scoped delivery.
    #[must_use]
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Accepts a new live connection: allocates its id, marks it live in
    /// the registry and hands back its update receiver.
    pub async fn connect(&self) -> (ConnectionId, broadcast::Receiver<AttendanceUpdate>) {
        let connection_id = ConnectionId::new();
        let receiver = self.sender.subscribe();
        self.registry.register(connection_id).await;
        tracing::debug!(%connection_id, "connection registered");
        (connection_id, receiver)
    }

    /// Tears a connection down: it stops being live and loses every room
    /// subscription. Safe to call more than once.
    pub async fn disconnect(&self, connection_id: ConnectionId) {
        let dropped = self.registry.drop_connection(connection_id).await;
        tracing::debug!(%connection_id, dropped, "connection dropped");
    }

    /// Publishes `snapshot` under `policy`.
    ///
    /// Returns the number of connections the update was addressed to. Zero
    /// recipients is not an error.
    pub async fn notify(&self, snapshot: CountSnapshot, policy: DeliveryPolicy) -> usize {
        let (audience, recipients) = match policy {
            DeliveryPolicy::Global => (Audience::Everyone, self.sender.receiver_count()),
            DeliveryPolicy::RoomScoped => {
                let members = self.registry.subscribers_of(snapshot.event_id).await;
                let recipients = members.len();
                (Audience::Connections(Arc::new(members)), recipients)
            }
        };

        if recipients == 0 {
            tracing::debug!(event_id = %snapshot.event_id, %policy, "no recipients for update");
            return 0;
        }

        // send only fails when no receiver exists
        let _ = self.sender.send(AttendanceUpdate { snapshot, audience });
        tracing::debug!(
            event_id = %snapshot.event_id,
            attendee_count = snapshot.attendee_count,
            %policy,
            recipients,
            "attendee count broadcast"
        );
        recipients
    }

    /// Returns the current number of receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
