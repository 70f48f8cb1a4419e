//! Live update fan-out: connection ids, room bookkeeping and the
//! dispatcher that pushes attendee counts to WebSocket connections.

pub mod connection_id;
pub mod dispatcher;
pub mod room_registry;

pub use connection_id::ConnectionId;
pub use dispatcher::{AttendanceUpdate, Audience, BroadcastDispatcher, DeliveryPolicy};
pub use room_registry::RoomRegistry;
