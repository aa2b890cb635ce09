//! Live-connection table.
//!
//! Maps connection id to a lightweight handle holding the outbound sender
//! and the per-connection event sequence. The per-socket task owns the
//! actual socket; the table never does, which keeps teardown acyclic: when
//! the task ends it removes its entry and the handle dies with it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use uuid::Uuid;
use warp::ws::Message;

use crate::protocol::frames::Frame;

pub struct ConnectionHandle {
    tx: UnboundedSender<Message>,
    authenticated: AtomicBool,
    seq: AtomicU64,
}

impl ConnectionHandle {
    pub fn mark_authenticated(&self) {
        self.authenticated.store(true, Ordering::Release);
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    /// Next value of the per-connection event sequence, starting at 1.
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Queue a frame for the single writer task. Returns false when the
    /// writer is gone, which the caller treats as a closed socket.
    pub fn send_frame(&self, frame: &Frame) -> bool {
        self.tx.send(Message::text(frame.to_text())).is_ok()
    }

    /// Queue raw JSON (the hello-ok envelope is not a typed frame).
    pub fn send_json(&self, value: &Value) -> bool {
        self.tx.send(Message::text(value.to_string())).is_ok()
    }
}

#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<HashMap<Uuid, Arc<ConnectionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, id: Uuid, tx: UnboundedSender<Message>) -> Arc<ConnectionHandle> {
        let handle = Arc::new(ConnectionHandle {
            tx,
            authenticated: AtomicBool::new(false),
            seq: AtomicU64::new(0),
        });
        self.inner.write().await.insert(id, handle.clone());
        handle
    }

    pub async fn remove(&self, id: Uuid) {
        self.inner.write().await.remove(&id);
    }

    pub async fn live_count(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Send an event to every authenticated live connection. Unreachable
    /// sockets are skipped; one dead peer never aborts the sweep. Returns
    /// the number of connections the event was queued for.
    pub async fn broadcast(&self, event: &str, payload: Value) -> usize {
        let table = self.inner.read().await;
        let mut delivered = 0;
        for handle in table.values() {
            if !handle.is_authenticated() {
                continue;
            }
            let frame = Frame::event(event, payload.clone(), handle.next_seq());
            if handle.send_frame(&frame) {
                delivered += 1;
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_register_and_remove() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        registry.register(id, tx).await;
        assert_eq!(registry.live_count().await, 1);
        registry.remove(id).await;
        assert_eq!(registry.live_count().await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_skips_unauthenticated() {
        let registry = ConnectionRegistry::new();
        let (tx_new, mut rx_new) = mpsc::unbounded_channel();
        let (tx_auth, mut rx_auth) = mpsc::unbounded_channel();
        registry.register(Uuid::new_v4(), tx_new).await;
        let handle = registry.register(Uuid::new_v4(), tx_auth).await;
        handle.mark_authenticated();

        let delivered = registry.broadcast("presence", json!({"state": "online"})).await;
        assert_eq!(delivered, 1);
        assert!(rx_auth.try_recv().is_ok());
        assert!(rx_new.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_survives_dead_receiver() {
        let registry = ConnectionRegistry::new();
        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        let dead = registry.register(Uuid::new_v4(), tx_dead).await;
        let live = registry.register(Uuid::new_v4(), tx_live).await;
        dead.mark_authenticated();
        live.mark_authenticated();
        drop(rx_dead);

        let delivered = registry.broadcast("health", json!({"ok": true})).await;
        assert_eq!(delivered, 1);
        assert!(rx_live.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_seq_strictly_increasing() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = registry.register(Uuid::new_v4(), tx).await;
        assert_eq!(handle.next_seq(), 1);
        assert_eq!(handle.next_seq(), 2);
        assert_eq!(handle.next_seq(), 3);
    }
}
