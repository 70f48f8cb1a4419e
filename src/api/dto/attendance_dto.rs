//! Attendance DTOs for the request-path join and leave routes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::EventDto;
use crate::domain::AttendanceAction;

/// Response body for `PUT /user/join/{eventId}` and
/// `DELETE /user/leave/{eventId}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AttendanceResponse {
    /// `"Joined successfully"` or `"Left successfully"`.
    pub message: String,
    /// The event with its attendee set after the change.
    pub event: EventDto,
}

impl AttendanceResponse {
    /// Builds the response for `action`.
    #[must_use]
    pub fn new(action: AttendanceAction, event: EventDto) -> Self {
        let message = match action {
            AttendanceAction::Join => "Joined successfully",
            AttendanceAction::Leave => "Left successfully",
        };
        Self {
            message: message.to_string(),
            event,
        }
    }
}
