//! Shared join/leave pipeline for the request and message paths.

use tokio::task;

use crate::broadcast::{BroadcastDispatcher, ConnectionId, DeliveryPolicy};
use crate::domain::{AttendanceAction, AttendanceChange, AttendanceMutation, parse_event_id};
use crate::error::GatewayError;
use crate::service::{Caller, MembershipService};

/// Where a change came from.
#[derive(Debug, Clone, Copy)]
enum Origin {
    Request,
    Message(ConnectionId),
}

/// Entry point for every attendance change.
///
/// Each change runs on its own task: once the store mutation has started
/// it completes and is broadcast even if the HTTP caller goes away or the
/// originating connection drops mid-flight.
#[derive(Debug, Clone)]
pub struct AttendanceIngress {
    membership: MembershipService,
    dispatcher: BroadcastDispatcher,
    message_policy: DeliveryPolicy,
}

impl AttendanceIngress {
    /// Creates the ingress. `message_policy` is the delivery policy for
    /// changes arriving over live connections; request-path changes are
    /// always broadcast globally.
    #[must_use]
    pub fn new(
        membership: MembershipService,
        dispatcher: BroadcastDispatcher,
        message_policy: DeliveryPolicy,
    ) -> Self {
        Self {
            membership,
            dispatcher,
            message_policy,
        }
    }

    /// Returns the dispatcher live connections attach to.
    #[must_use]
    pub fn dispatcher(&self) -> &BroadcastDispatcher {
        &self.dispatcher
    }

    /// Request path: `event_id` comes from the request target, the user id
    /// only from the verified credential.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidIdentifier`] for a malformed event id,
    /// [`GatewayError::EventNotFound`] for an unknown event, or
    /// [`GatewayError::Internal`] if the mutation task panicked.
    pub async fn handle_request(
        &self,
        action: AttendanceAction,
        event_id: &str,
        caller: Caller,
    ) -> Result<AttendanceMutation, GatewayError> {
        let change = AttendanceChange::new(parse_event_id(event_id)?, caller.user_id, action);
        self.spawn_commit(change, Origin::Request).await
    }

    /// Message path: both ids come from the connection's payload and are
    /// validated before anything else happens. A successful join subscribes
    /// the connection to the event's room; a leave unsubscribes it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidIdentifier`] naming the malformed
    /// field, [`GatewayError::EventNotFound`] for an unknown event, or
    /// [`GatewayError::Internal`] if the mutation task panicked.
    pub async fn handle_message(
        &self,
        connection_id: ConnectionId,
        action: AttendanceAction,
        event_id: &str,
        user_id: &str,
    ) -> Result<AttendanceMutation, GatewayError> {
        let change = AttendanceChange::parse(event_id, user_id, action)?;
        self.spawn_commit(change, Origin::Message(connection_id)).await
    }

    async fn spawn_commit(
        &self,
        change: AttendanceChange,
        origin: Origin,
    ) -> Result<AttendanceMutation, GatewayError> {
        let ingress = self.clone();
        task::spawn(async move { ingress.commit(change, origin).await }).await?
    }

    async fn commit(
        &self,
        change: AttendanceChange,
        origin: Origin,
    ) -> Result<AttendanceMutation, GatewayError> {
        let registry = self.dispatcher.registry();

        // joiners enter the room before the write; undone below on failure
        let joined_room = match origin {
            Origin::Message(connection_id) if change.action == AttendanceAction::Join => {
                registry.subscribe(connection_id, change.event_id).await
            }
            _ => false,
        };

        let mutation = match self.membership.apply(change).await {
            Ok(mutation) => mutation,
            Err(e) => {
                if let Origin::Message(connection_id) = origin
                    && joined_room
                {
                    registry.unsubscribe(connection_id, change.event_id).await;
                }
                return Err(e);
            }
        };

        let policy = match origin {
            Origin::Request => DeliveryPolicy::Global,
            Origin::Message(_) => self.message_policy,
        };
        if mutation.changed {
            self.dispatcher.notify(mutation.snapshot(), policy).await;
        }

        // a leaving connection still sees the count it caused
        if let Origin::Message(connection_id) = origin
            && change.action == AttendanceAction::Leave
        {
            registry.unsubscribe(connection_id, change.event_id).await;
        }

        Ok(mutation)
    }
}
