//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::api::auth::TokenVerifier;
use crate::ingress::AttendanceIngress;
use crate::service::EventService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Event record operations.
    pub events: Arc<EventService>,
    /// Join/leave pipeline shared by REST and WebSocket.
    pub attendance: AttendanceIngress,
    /// Bearer token verifier for the request path.
    pub verifier: Arc<TokenVerifier>,
}
