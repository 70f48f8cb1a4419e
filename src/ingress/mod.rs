//! Dual-path ingress for attendance changes.
//!
//! Both the HTTP request path and the WebSocket message path funnel into
//! [`AttendanceIngress`], which runs the membership change and the
//! broadcast that follows it. The two paths differ only in where the user
//! id comes from and which delivery policy the broadcast uses.

pub mod attendance_ingress;

pub use attendance_ingress::AttendanceIngress;
