//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection:
//! incoming `joinEvent` / `leaveEvent` frames go through the attendance
//! ingress, and attendee count updates addressed to this connection are
//! forwarded to the client.

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{ClientFrame, ServerFrame};
use crate::broadcast::ConnectionId;
use crate::domain::{CountSnapshot, EventId};
use crate::error::GatewayError;
use crate::ingress::AttendanceIngress;

/// Last store revision forwarded per event.
///
/// Updates for one event can reach the channel out of commit order when
/// two mutations race; a connection never forwards a count older than one
/// it already sent.
#[derive(Debug, Default)]
pub struct RevisionTracker {
    last: HashMap<EventId, u64>,
}

impl RevisionTracker {
    /// Records `snapshot` and returns `true` if it is newer than anything
    /// forwarded so far for its event.
    pub fn advance(&mut self, snapshot: CountSnapshot) -> bool {
        match self.last.get(&snapshot.event_id) {
            Some(&seen) if seen >= snapshot.revision => false,
            _ => {
                self.last.insert(snapshot.event_id, snapshot.revision);
                true
            }
        }
    }
}

/// Runs the read/write loop for a single WebSocket connection.
///
/// The connection is registered on entry and dropped from every room on
/// exit, whichever side closes first.
pub async fn run_connection(socket: WebSocket, ingress: AttendanceIngress) {
    let (connection_id, mut updates) = ingress.dispatcher().connect().await;
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut revisions = RevisionTracker::default();

    tracing::info!(%connection_id, "ws client connected");

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply =
                            handle_text_message(&ingress, connection_id, text.as_str()).await;
                        if let Some(frame) = reply
                            && ws_tx.send(frame.into_message()).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(%connection_id, error = %e, "ws read failed");
                        break;
                    }
                    _ => {}
                }
            }
            // Update from the dispatcher
            update = updates.recv() => {
                match update {
                    Ok(update) => {
                        if !update.is_addressed_to(connection_id)
                            || !revisions.advance(update.snapshot)
                        {
                            continue;
                        }
                        let frame = ServerFrame::from(update.snapshot);
                        if let Err(e) = ws_tx.send(frame.into_message()).await {
                            let failure = GatewayError::TransientDeliveryFailure {
                                connection: connection_id.to_string(),
                                reason: e.to_string(),
                            };
                            tracing::warn!(%connection_id, error = %failure, "dropping connection");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            %connection_id,
                            lagged = n,
                            "ws client lagged behind dispatcher"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    ingress.dispatcher().disconnect(connection_id).await;
    tracing::info!(%connection_id, "ws client disconnected");
}

/// Handles a text frame from the client. Returns a frame to send back
/// only on failure; successful changes reach the client through the
/// dispatcher like everyone else's.
pub async fn handle_text_message(
    ingress: &AttendanceIngress,
    connection_id: ConnectionId,
    text: &str,
) -> Option<ServerFrame> {
    let result = match ClientFrame::parse(text) {
        Ok(frame) => {
            let (action, payload) = frame.into_parts();
            ingress
                .handle_message(connection_id, action, &payload.event_id, &payload.user_id)
                .await
                .map(|_| ())
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => None,
        Err(e) => {
            tracing::debug!(%connection_id, error = %e, "ws request rejected");
            Some(ServerFrame::from(&e))
        }
    }
}
