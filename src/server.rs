//! Assembly of the store, services and router from configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::api::auth::TokenVerifier;
use crate::app_state::AppState;
use crate::broadcast::{BroadcastDispatcher, RoomRegistry};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::ingress::AttendanceIngress;
use crate::service::{EventService, MembershipService};
use crate::store::{AttendanceStore, EventCatalog, InMemoryEventStore, PostgresEventStore};
use crate::ws::handler::ws_handler;

/// Builds the application state: the in-memory store, or PostgreSQL when
/// persistence is enabled.
///
/// # Errors
///
/// Returns [`GatewayError::PersistenceError`] if the database cannot be
/// reached or migrated.
pub async fn build_state(config: &GatewayConfig) -> Result<AppState, GatewayError> {
    let (attendance, catalog): (Arc<dyn AttendanceStore>, Arc<dyn EventCatalog>) =
        if config.persistence_enabled {
            let store = Arc::new(PostgresEventStore::connect(config).await?);
            (
                Arc::clone(&store) as Arc<dyn AttendanceStore>,
                store as Arc<dyn EventCatalog>,
            )
        } else {
            tracing::info!("persistence disabled, using in-memory event store");
            let store = Arc::new(InMemoryEventStore::new());
            (
                Arc::clone(&store) as Arc<dyn AttendanceStore>,
                store as Arc<dyn EventCatalog>,
            )
        };

    let registry = Arc::new(RoomRegistry::new());
    let dispatcher = BroadcastDispatcher::new(config.broadcast_capacity, Arc::clone(&registry));

    Ok(AppState {
        events: Arc::new(EventService::new(catalog, registry)),
        attendance: AttendanceIngress::new(
            MembershipService::new(attendance),
            dispatcher,
            config.message_policy,
        ),
        verifier: Arc::new(TokenVerifier::new(config.jwt_secret.clone())),
    })
}

/// Builds the router with REST, WebSocket and middleware layers.
///
/// The request timeout applies to REST routes only; `/ws` connections
/// live as long as the client keeps them open.
pub fn build_app(state: AppState, config: &GatewayConfig) -> Router {
    let rest = api::build_router().layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.request_timeout_secs),
    ));

    Router::new()
        .merge(rest)
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    async fn app() -> Router {
        let config = GatewayConfig::default();
        let Ok(state) = build_state(&config).await else {
            panic!("in-memory state failed");
        };
        build_app(state, &config)
    }

    #[tokio::test]
    async fn health_is_served() {
        let Ok(request) = Request::builder().uri("/health").body(Body::empty()) else {
            panic!("bad request");
        };
        let response = app()
            .await
            .oneshot(request)
            .await
            .unwrap_or_else(|never| match never {});
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn join_requires_a_token() {
        let Ok(request) = Request::builder()
            .method("PUT")
            .uri("/api/v1/user/join/65f1a2b3c4d5e6f708192a3b")
            .body(Body::empty())
        else {
            panic!("bad request");
        };
        let response = app()
            .await
            .oneshot(request)
            .await
            .unwrap_or_else(|never| match never {});
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_event_id_is_bad_request() {
        let Ok(request) = Request::builder()
            .uri("/api/v1/event/not-an-id")
            .body(Body::empty())
        else {
            panic!("bad request");
        };
        let response = app()
            .await
            .oneshot(request)
            .await
            .unwrap_or_else(|never| match never {});
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
