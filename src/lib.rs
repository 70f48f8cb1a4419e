//! # attendance-gateway
//!
//! REST API and WebSocket gateway that keeps event attendance consistent
//! and pushes attendee counts to every live viewer.
//!
//! Users join and leave events over two paths: authenticated REST calls
//! (the request path) and `joinEvent` / `leaveEvent` frames on a WebSocket
//! (the message path). Both go through one ingress, one membership service
//! and one store, so the attendee set has a single writer per event and
//! every broadcast count matches a committed state.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── AttendanceIngress (ingress/)
//!     ├── MembershipService / EventService (service/)
//!     ├── BroadcastDispatcher + RoomRegistry (broadcast/)
//!     │
//!     └── AttendanceStore / EventCatalog (store/)
//!           ├── in-memory
//!           └── PostgreSQL
//! ```

pub mod api;
pub mod app_state;
pub mod broadcast;
pub mod config;
pub mod domain;
pub mod error;
pub mod ingress;
pub mod server;
pub mod service;
pub mod store;
pub mod ws;
