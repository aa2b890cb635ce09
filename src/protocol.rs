//! The impersonated gateway's wire protocol.
//!
//! `frames` implements the framed request/response/event codec and the
//! initial connect envelope; `methods` holds the canned-response catalog the
//! gateway answers with.

pub mod frames;
pub mod methods;

pub use frames::{ConnectEnvelope, ErrorBody, Frame, Inbound, PROTOCOL_VERSION};
pub use methods::{MethodContext, MethodRegistry};
