//! Evidence store.
//!
//! Typed write-only façade over the persistence tables plus the per-IP
//! attacker-session aggregator. Everything here is off the response path:
//! callers spawn the insert and move on; a failed write is logged, never
//! surfaced to the remote peer.
//!
//! Components:
//! - `types`: record structs, wire enums, truncation limits.
//! - `db_entities`: SeaORM entity models, one per table.
//! - `store`: the SQLite-backed gateway with schema bootstrap.
//! - `tracker`: rolling per-IP counters and sticky behavioral flags.

pub mod db_entities;
pub mod store;
pub mod tracker;
pub mod types;

pub use store::{spawn_logged, Store};
pub use tracker::AttackerTracker;
pub use types::{
    AuthMethod, ChannelTag, Direction, TouchDelta, TransportKind, WsFrameKind,
};
