//! Attack classification subsystem.
//!
//! Seven independent regex category sets turn raw payload text into
//! structured attack evidence. The classifier is pure and stateless once
//! constructed; every inbound HTTP body and WebSocket frame passes through
//! it before a canned response is computed.

pub mod engine;
pub mod patterns;
pub mod types;

pub use engine::Classifier;
pub use types::{AttackCategory, CategoryMatch, Classification, Severity};
