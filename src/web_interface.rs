//! HTTP surface.
//!
//! Bit-faithful endpoints for each impersonated messaging platform plus
//! health, status, static assets and the catch-all control UI. Every
//! inbound request flows through the classify/persist pipeline in `router`
//! before its canned handler runs.

pub mod router;
pub mod server;
pub mod static_ui;
pub mod types;
pub mod webhooks;

pub use server::routes;
