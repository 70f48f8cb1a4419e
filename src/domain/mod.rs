//! Domain layer: identifiers, event records and attendance changes.
//!
//! This module contains the server-side domain model: typed object ids
//! for events and users, the event record with its attendee set, and the
//! attendance change/mutation types passed between the store, the
//! membership service and the broadcast dispatcher.

pub mod attendance;
pub mod event_record;
pub mod object_id;

pub use attendance::{
    AttendanceAction, AttendanceChange, AttendanceMutation, CountSnapshot, parse_event_id,
};
pub use event_record::{AttendeeSet, EventDetails, EventFilter, EventPatch, EventRecord};
pub use object_id::{EventId, IdentifierField, MalformedObjectId, ObjectId, UserId};
