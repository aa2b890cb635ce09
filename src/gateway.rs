//! WebSocket gateway.
//!
//! Per-socket state machine for the impersonated protocol: handshake,
//! always-accept auth capture, canned method dispatch, heartbeat ticks and
//! the live-connection table with its broadcast primitive.

pub mod auth;
pub mod connection;
pub mod registry;

pub use registry::{ConnectionHandle, ConnectionRegistry};
