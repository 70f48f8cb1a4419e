//! Service layer: business logic orchestration.
//!
//! [`MembershipService`] applies join/leave against the attendance store.
//! [`EventService`] fronts the event record collaborator.

pub mod event_service;
pub mod membership;

pub use event_service::{Caller, EventService};
pub use membership::MembershipService;
