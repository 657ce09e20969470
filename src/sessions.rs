//! Producer session registry.
//!
//! Tracks every open WebSocket session and owns the fan-out path: each
//! session registers an unbounded outbound channel, and the registry pushes
//! frames into it. The socket task on the other end drains the channel and
//! writes to the wire, so a slow or dead peer never blocks anyone here.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::metrics;
use crate::protocol::ServerMessage;

/// Handle to the shared session table. Cheap to clone.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
}

struct Session {
    outbound: mpsc::UnboundedSender<ServerMessage>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session and returns its id. The caller keeps the receiving
    /// half of `outbound` and is responsible for draining it to the socket.
    pub fn register(&self, outbound: mpsc::UnboundedSender<ServerMessage>) -> Uuid {
        let session_id = Uuid::new_v4();
        let active = {
            let mut sessions = self.inner.write();
            sessions.insert(session_id, Session { outbound });
            sessions.len()
        };
        metrics::set_sessions_active(active);
        info!(%session_id, active, "session connected");
        session_id
    }

    /// Drops a session. Unknown ids are ignored, so disconnect paths can
    /// call this unconditionally.
    pub fn deregister(&self, session_id: Uuid) {
        let removed;
        let active = {
            let mut sessions = self.inner.write();
            removed = sessions.remove(&session_id).is_some();
            sessions.len()
        };
        if removed {
            metrics::set_sessions_active(active);
            info!(%session_id, active, "session disconnected");
        }
    }

    /// Queues a frame for one session. Returns `false` when the session is
    /// gone or its socket task has stopped draining.
    pub fn send_to(&self, session_id: Uuid, message: ServerMessage) -> bool {
        let sessions = self.inner.read();
        match sessions.get(&session_id) {
            Some(session) => session.outbound.send(message).is_ok(),
            None => {
                debug!(%session_id, "send to unknown session dropped");
                false
            },
        }
    }

    /// Queues a frame for every session except `origin`. Delivery is
    /// fire-and-forget: one dead peer does not stop the others. Sessions
    /// whose channel is closed are pruned. Returns how many sessions the
    /// frame was queued for.
    pub fn broadcast_except(&self, origin: Uuid, message: &ServerMessage) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();
        {
            let sessions = self.inner.read();
            for (session_id, session) in sessions.iter() {
                if *session_id == origin {
                    continue;
                }
                if session.outbound.send(message.clone()).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(*session_id);
                }
            }
        }

        if !dead.is_empty() {
            let active = {
                let mut sessions = self.inner.write();
                for session_id in &dead {
                    sessions.remove(session_id);
                }
                sessions.len()
            };
            metrics::set_sessions_active(active);
            debug!(pruned = dead.len(), active, "pruned dead sessions during broadcast");
        }

        metrics::record_broadcast(delivered as u64);
        delivered
    }

    pub fn active_count(&self) -> usize {
        self.inner.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe() -> ServerMessage {
        ServerMessage::error("probe")
    }

    #[tokio::test]
    async fn test_register_and_send() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session_id = registry.register(tx);

        assert_eq!(registry.active_count(), 1);
        assert!(registry.send_to(session_id, probe()));
        assert!(matches!(
            rx.recv().await,
            Some(ServerMessage::Error { .. })
        ));
    }

    #[tokio::test]
    async fn test_send_to_unknown_session_is_false() {
        let registry = SessionRegistry::new();
        assert!(!registry.send_to(Uuid::new_v4(), probe()));
    }

    #[tokio::test]
    async fn test_broadcast_skips_origin() {
        let registry = SessionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = registry.register(tx_a);
        let _b = registry.register(tx_b);

        let delivered = registry.broadcast_except(a, &probe());
        assert_eq!(delivered, 1);
        assert!(rx_b.recv().await.is_some());
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_prunes_dead_sessions() {
        let registry = SessionRegistry::new();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        let a = registry.register(tx_a);
        let _b = registry.register(tx_b);
        drop(rx_b);

        // the dead session neither receives nor breaks delivery bookkeeping
        let delivered = registry.broadcast_except(a, &probe());
        assert_eq!(delivered, 0);
        assert_eq!(registry.active_count(), 1);
    }

    #[tokio::test]
    async fn test_deregister_is_idempotent() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let session_id = registry.register(tx);

        registry.deregister(session_id);
        registry.deregister(session_id);
        assert_eq!(registry.active_count(), 0);
    }
}
