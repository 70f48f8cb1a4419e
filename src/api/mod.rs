//! REST API layer: route handlers, DTOs, bearer auth and router
//! composition.
//!
//! Resource endpoints are mounted under `/api/v1`; `/health` and the
//! OpenAPI UI sit at the root.

pub mod auth;
pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::app_state::AppState;

/// OpenAPI document for the REST routes.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "attendance-gateway", description = "Event attendance REST API"),
    paths(
        handlers::events::create_event,
        handlers::events::list_events,
        handlers::events::get_event,
        handlers::events::update_event,
        handlers::events::delete_event,
        handlers::attendance::join_event,
        handlers::attendance::leave_event,
        handlers::system::health_handler,
    ),
    components(schemas(
        dto::EventDto,
        dto::CreateEventRequest,
        dto::UpdateEventRequest,
        dto::MessageResponse,
        dto::AttendanceResponse,
        handlers::system::HealthResponse,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    modifiers(&BearerScheme),
    tags(
        (name = "Events", description = "Event records"),
        (name = "Attendance", description = "Join and leave"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;

#[derive(Debug)]
struct BearerScheme;

impl Modify for BearerScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_attendance_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/user/join/{eventId}"));
        assert!(doc.paths.paths.contains_key("/api/v1/user/leave/{eventId}"));
        assert!(doc.paths.paths.contains_key("/api/v1/event/{id}"));
    }
}
