//! WebSocket frame types.
//!
//! Every frame is a JSON object `{"event": <channel>, "data": <payload>}`.
//! Clients send `joinEvent` / `leaveEvent`; the server sends
//! `attendeeCountUpdate` and `error`.

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};

use crate::domain::{AttendanceAction, CountSnapshot};
use crate::error::GatewayError;

/// Ids named by a join or leave frame, unvalidated.
///
/// Missing fields decode as empty strings so they surface as identifier
/// errors rather than framing errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePayload {
    /// Event id as sent.
    #[serde(default)]
    pub event_id: String,
    /// User id as sent.
    #[serde(default)]
    pub user_id: String,
}

/// Frames a client can send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientFrame {
    /// Join an event and subscribe to its room.
    #[serde(rename = "joinEvent")]
    JoinEvent(AttendancePayload),
    /// Leave an event and unsubscribe from its room.
    #[serde(rename = "leaveEvent")]
    LeaveEvent(AttendancePayload),
}

impl ClientFrame {
    /// Decodes a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for malformed JSON or an
    /// unknown channel.
    pub fn parse(text: &str) -> Result<Self, GatewayError> {
        serde_json::from_str(text)
            .map_err(|e| GatewayError::InvalidRequest(format!("malformed frame: {e}")))
    }

    /// Splits the frame into its action and payload.
    #[must_use]
    pub fn into_parts(self) -> (AttendanceAction, AttendancePayload) {
        match self {
            Self::JoinEvent(payload) => (AttendanceAction::Join, payload),
            Self::LeaveEvent(payload) => (AttendanceAction::Leave, payload),
        }
    }
}

/// Payload of an `attendeeCountUpdate` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountUpdate {
    /// Event whose count changed.
    pub event_id: String,
    /// Number of attendees after the change.
    pub attendee_count: usize,
}

/// Payload of an `error` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable reason.
    pub message: String,
}

/// Frames the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerFrame {
    /// New attendee count for an event.
    #[serde(rename = "attendeeCountUpdate")]
    AttendeeCountUpdate(CountUpdate),
    /// A request from this connection failed.
    #[serde(rename = "error")]
    Error(ErrorPayload),
}

impl ServerFrame {
    /// Encodes the frame as a WebSocket text message.
    #[must_use]
    pub fn into_message(self) -> Message {
        Message::text(serde_json::to_string(&self).unwrap_or_default())
    }
}

impl From<CountSnapshot> for ServerFrame {
    fn from(snapshot: CountSnapshot) -> Self {
        Self::AttendeeCountUpdate(CountUpdate {
            event_id: snapshot.event_id.to_string(),
            attendee_count: snapshot.attendee_count,
        })
    }
}

impl From<&GatewayError> for ServerFrame {
    fn from(err: &GatewayError) -> Self {
        Self::Error(ErrorPayload {
            message: err.to_string(),
        })
    }
}
