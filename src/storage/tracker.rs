//! Per-IP attacker-session aggregation.

use std::sync::Arc;

use crate::storage::store::{spawn_logged, Store};
use crate::storage::types::TouchDelta;

/// Rolling counters and sticky behavioral flags keyed by source IP.
///
/// `touch` is fire-and-forget: the aggregate is bookkeeping, never part of a
/// response, so a failed upsert costs evidence but not deception.
#[derive(Clone)]
pub struct AttackerTracker {
    store: Arc<Store>,
}

impl AttackerTracker {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn touch(&self, source_ip: &str, delta: TouchDelta) {
        let store = self.store.clone();
        let ip = source_ip.to_string();
        spawn_logged("attacker_session", async move {
            store.upsert_attacker_session(&ip, delta).await
        });
    }
}
