//! Event CRUD handlers: create, list, get, update, delete.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::auth::AuthenticatedUser;
use crate::api::dto::{
    CreateEventRequest, EventDto, ListEventsQuery, MessageResponse, UpdateEventRequest,
};
use crate::app_state::AppState;
use crate::domain::{EventFilter, parse_event_id};
use crate::error::{ErrorResponse, GatewayError};

/// `POST /event/add` — Create an event owned by the caller.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] on blank required fields.
#[utoipa::path(
    post,
    path = "/api/v1/event/add",
    tag = "Events",
    summary = "Create an event",
    description = "Creates an event with an empty attendee set. The caller becomes its creator.",
    request_body = CreateEventRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Event created", body = EventDto),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let record = state.events.create(req.into_details()?, caller).await?;
    Ok((StatusCode::CREATED, Json(EventDto::from(record))))
}

/// `GET /event/get` — List events, optionally by category.
///
/// # Errors
///
/// Returns [`GatewayError::PersistenceError`] on backend failures.
#[utoipa::path(
    get,
    path = "/api/v1/event/get",
    tag = "Events",
    summary = "List events",
    description = "Returns every event, or only those in the given category.",
    params(ListEventsQuery),
    responses(
        (status = 200, description = "Event list", body = Vec<EventDto>),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let events = state.events.list(&EventFilter::from(query)).await?;
    let dtos: Vec<EventDto> = events.into_iter().map(EventDto::from).collect();
    Ok(Json(dtos))
}

/// `GET /event/{id}` — Get one event.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidIdentifier`] for a malformed id and
/// [`GatewayError::EventNotFound`] for an unknown one.
#[utoipa::path(
    get,
    path = "/api/v1/event/{id}",
    tag = "Events",
    summary = "Get an event",
    description = "Returns a single event with its current attendees.",
    params(
        ("id" = String, Path, description = "24-character hex event id"),
    ),
    responses(
        (status = 200, description = "Event details", body = EventDto),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let record = state.events.get(parse_event_id(&id)?).await?;
    Ok(Json(EventDto::from(record)))
}

/// `PUT /event/{id}` — Update event metadata.
///
/// # Errors
///
/// Returns [`GatewayError::Forbidden`] unless the caller created the event
/// or is privileged.
#[utoipa::path(
    put,
    path = "/api/v1/event/{id}",
    tag = "Events",
    summary = "Update an event",
    description = "Updates descriptive fields. The attendee set cannot be changed here.",
    params(
        ("id" = String, Path, description = "24-character hex event id"),
    ),
    request_body = UpdateEventRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated event", body = EventDto),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Not the creator", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let event_id = parse_event_id(&id)?;
    let record = state
        .events
        .update(event_id, req.into_patch()?, caller)
        .await?;
    Ok(Json(EventDto::from(record)))
}

/// `DELETE /event/{id}` — Delete an event and its attendee set.
///
/// # Errors
///
/// Returns [`GatewayError::Forbidden`] unless the caller created the event
/// or is privileged.
#[utoipa::path(
    delete,
    path = "/api/v1/event/{id}",
    tag = "Events",
    summary = "Delete an event",
    description = "Removes the event and its attendees; viewers stop getting its updates.",
    params(
        ("id" = String, Path, description = "24-character hex event id"),
    ),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Event deleted", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Not the creator", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    state.events.delete(parse_event_id(&id)?, caller).await?;
    Ok(Json(MessageResponse {
        message: "Event deleted successfully".to_string(),
    }))
}

/// Event management routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/event/add", post(create_event))
        .route("/event/get", get(list_events))
        .route(
            "/event/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
}
