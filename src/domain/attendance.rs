//! Attendance changes and the results they produce.

use std::fmt;

use super::{AttendeeSet, EventId, IdentifierField, UserId};
use crate::error::GatewayError;

/// Direction of an attendance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceAction {
    /// Add the user to the attendee set.
    Join,
    /// Remove the user from the attendee set.
    Leave,
}

impl fmt::Display for AttendanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Join => f.write_str("join"),
            Self::Leave => f.write_str("leave"),
        }
    }
}

/// A validated request to join or leave an event.
///
/// Only constructible from well-formed identifiers, so holding one proves
/// the ids passed the format check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceChange {
    /// Target event.
    pub event_id: EventId,
    /// Joining or leaving user.
    pub user_id: UserId,
    /// Join or leave.
    pub action: AttendanceAction,
}

impl AttendanceChange {
    /// Builds a change from already-typed ids.
    #[must_use]
    pub const fn new(event_id: EventId, user_id: UserId, action: AttendanceAction) -> Self {
        Self {
            event_id,
            user_id,
            action,
        }
    }

    /// Parses raw identifiers. The event id is checked first, so when both
    /// are malformed the error names `eventId`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidIdentifier`] naming the first field
    /// that is not a 24-character hex id.
    pub fn parse(
        event_id: &str,
        user_id: &str,
        action: AttendanceAction,
    ) -> Result<Self, GatewayError> {
        let event_id = parse_event_id(event_id)?;
        let user_id = user_id
            .parse()
            .map_err(|_| GatewayError::invalid_identifier(IdentifierField::UserId, user_id))?;
        Ok(Self::new(event_id, user_id, action))
    }
}

/// Parses an event id, mapping failure to [`GatewayError::InvalidIdentifier`].
///
/// # Errors
///
/// Returns [`GatewayError::InvalidIdentifier`] if `raw` is malformed.
pub fn parse_event_id(raw: &str) -> Result<EventId, GatewayError> {
    raw.parse()
        .map_err(|_| GatewayError::invalid_identifier(IdentifierField::EventId, raw))
}

/// Outcome of a single attendee-set mutation, captured under the event's
/// lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceMutation {
    /// Mutated event.
    pub event_id: EventId,
    /// Attendee set right after the mutation.
    pub attendees: AttendeeSet,
    /// `false` if the change was a no-op.
    pub changed: bool,
    /// Per-event revision after the mutation. Increases by one on every
    /// effective change; unchanged by no-ops.
    pub revision: u64,
}

impl AttendanceMutation {
    /// Attendee count right after the mutation.
    #[must_use]
    pub fn attendee_count(&self) -> usize {
        self.attendees.len()
    }

    /// Snapshot to broadcast for this mutation.
    #[must_use]
    pub fn snapshot(&self) -> CountSnapshot {
        CountSnapshot {
            event_id: self.event_id,
            attendee_count: self.attendee_count(),
            revision: self.revision,
        }
    }
}

/// Attendee count of one event at one store revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountSnapshot {
    /// Event the count belongs to.
    pub event_id: EventId,
    /// Number of attendees.
    pub attendee_count: usize,
    /// Store revision the count was read at. Never sent to clients.
    pub revision: u64,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const EVENT: &str = "65f1a2b3c4d5e6f708192a3b";
    const USER: &str = "65f1a2b3c4d5e6f708192a3c";

    #[test]
    fn parse_accepts_valid_ids() {
        let Ok(change) = AttendanceChange::parse(EVENT, USER, AttendanceAction::Join) else {
            panic!("valid ids rejected");
        };
        assert_eq!(change.event_id.to_string(), EVENT);
        assert_eq!(change.user_id.to_string(), USER);
    }

    #[test]
    fn parse_names_event_field_first() {
        let err = AttendanceChange::parse("not-a-valid-id", "also-invalid", AttendanceAction::Join);
        let Err(GatewayError::InvalidIdentifier { field, .. }) = err else {
            panic!("expected invalid identifier");
        };
        assert_eq!(field, IdentifierField::EventId);
    }

    #[test]
    fn parse_names_user_field() {
        let err = AttendanceChange::parse(EVENT, "nope", AttendanceAction::Leave);
        let Err(GatewayError::InvalidIdentifier { field, value }) = err else {
            panic!("expected invalid identifier");
        };
        assert_eq!(field, IdentifierField::UserId);
        assert_eq!(value, "nope");
    }
}
