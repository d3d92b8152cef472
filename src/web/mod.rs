//! HTTP ingress and setpoint/status readback.

pub mod api;
pub mod models;
