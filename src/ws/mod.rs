//! WebSocket layer: connection handling and frame types.
//!
//! The WebSocket endpoint at `/ws` carries the message path: clients join
//! and leave events over it and receive attendee count updates.

pub mod connection;
pub mod handler;
pub mod messages;
