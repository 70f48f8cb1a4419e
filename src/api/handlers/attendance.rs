//! Request-path attendance handlers: join and leave.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{delete, put};
use axum::{Json, Router};

use crate::api::auth::AuthenticatedUser;
use crate::api::dto::{AttendanceResponse, EventDto};
use crate::app_state::AppState;
use crate::domain::AttendanceAction;
use crate::error::{ErrorResponse, GatewayError};
use crate::service::Caller;

/// `PUT /user/join/{eventId}` — Add the caller to an event's attendees.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidIdentifier`] for a malformed id and
/// [`GatewayError::EventNotFound`] for an unknown one.
#[utoipa::path(
    put,
    path = "/api/v1/user/join/{eventId}",
    tag = "Attendance",
    summary = "Join an event",
    description = "Adds the caller to the attendees; repeat joins are no-ops.",
    params(
        ("eventId" = String, Path, description = "24-character hex event id"),
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Joined", body = AttendanceResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn join_event(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    respond(&state, AttendanceAction::Join, &event_id, caller).await
}

/// `DELETE /user/leave/{eventId}` — Remove the caller from an event's
/// attendees.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidIdentifier`] for a malformed id and
/// [`GatewayError::EventNotFound`] for an unknown one.
#[utoipa::path(
    delete,
    path = "/api/v1/user/leave/{eventId}",
    tag = "Attendance",
    summary = "Leave an event",
    description = "Removes the caller from the event's attendees. Leaving when absent is a no-op.",
    params(
        ("eventId" = String, Path, description = "24-character hex event id"),
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Left", body = AttendanceResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn leave_event(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    respond(&state, AttendanceAction::Leave, &event_id, caller).await
}

async fn respond(
    state: &AppState,
    action: AttendanceAction,
    event_id: &str,
    caller: Caller,
) -> Result<Json<AttendanceResponse>, GatewayError> {
    let mutation = state
        .attendance
        .handle_request(action, event_id, caller)
        .await?;

    // the attendee set reported is the one the mutation committed
    let mut record = state.events.get(mutation.event_id).await?;
    record.attendees = mutation.attendees;

    Ok(Json(AttendanceResponse::new(action, EventDto::from(record))))
}

/// Attendance routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/join/{event_id}", put(join_event))
        .route("/user/leave/{event_id}", delete(leave_event))
}
