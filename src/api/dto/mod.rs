//! Data Transfer Objects for REST request/response serialization.
//!
//! Field names are camelCase on the wire; identifiers travel as
//! 24-character hex strings.

pub mod attendance_dto;
pub mod event_dto;

pub use attendance_dto::*;
pub use event_dto::*;
