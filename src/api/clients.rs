use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use axum::extract::ws::Utf8Bytes;
use tokio::sync::watch;

pub type ClientId = u64;

/// Receiving half of a client's result channel. Only the newest undelivered
/// result is held; a slow reader skips straight to it.
#[derive(Debug)]
pub struct Outbound {
    rx: watch::Receiver<Option<Utf8Bytes>>,
}

impl Outbound {
    /// Waits for a result newer than the last one returned. `None` once the
    /// client has been unregistered.
    pub async fn recv(&mut self) -> Option<Utf8Bytes> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(message) = self.rx.borrow_and_update().clone() {
                return Some(message);
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<Utf8Bytes> {
        if !self.rx.has_changed().unwrap_or(false) {
            return None;
        }
        self.rx.borrow_and_update().clone()
    }
}

/// Registry of connected websocket clients' outbound channels.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<ClientId, watch::Sender<Option<Utf8Bytes>>>>,
    next_id: AtomicU64,
}

impl ClientRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self) -> (ClientId, Outbound) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = watch::channel(None);
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        (id, Outbound { rx })
    }

    pub fn unregister(&self, id: ClientId) -> bool {
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sends `message` to every client, replacing any result a client has not
    /// picked up yet. Clients whose receiver is gone are pruned.
    /// Returns the number of clients reached.
    pub fn broadcast(&self, message: Utf8Bytes) -> usize {
        let mut closed = Vec::new();
        let mut delivered = 0;

        {
            let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
            for (id, tx) in clients.iter() {
                if tx.send(Some(message.clone())).is_ok() {
                    delivered += 1;
                } else {
                    closed.push(*id);
                }
            }
        }

        if !closed.is_empty() {
            let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
            for id in closed {
                clients.remove(&id);
                tracing::debug!(client = id, "pruned closed client");
            }
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_reaches_every_client() {
        let registry = ClientRegistry::new();
        let (a, mut rx_a) = registry.register();
        let (b, mut rx_b) = registry.register();
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.broadcast("hello".into()), 2);
        assert_eq!(rx_a.try_recv().unwrap().as_str(), "hello");
        assert_eq!(rx_b.try_recv().unwrap().as_str(), "hello");
        assert!(rx_a.try_recv().is_none());
    }

    #[test]
    fn test_undrained_client_holds_only_latest() {
        let registry = ClientRegistry::new();
        let (_, mut rx) = registry.register();

        for i in 0..1000 {
            assert_eq!(registry.broadcast(format!("result {i}").into()), 1);
        }

        assert_eq!(rx.try_recv().unwrap().as_str(), "result 999");
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_recv_skips_to_latest_and_ends_on_unregister() {
        let registry = ClientRegistry::new();
        let (id, mut rx) = registry.register();

        registry.broadcast("stale".into());
        registry.broadcast("fresh".into());
        assert_eq!(rx.recv().await.unwrap().as_str(), "fresh");

        registry.unregister(id);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_broadcast_without_clients_is_noop() {
        let registry = ClientRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.broadcast("nobody".into()), 0);
    }

    #[test]
    fn test_closed_clients_are_pruned_without_blocking_others() {
        let registry = ClientRegistry::new();
        let (_, rx_closed) = registry.register();
        let (_, mut rx_open) = registry.register();
        drop(rx_closed);

        assert_eq!(registry.broadcast("frame".into()), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(rx_open.try_recv().unwrap().as_str(), "frame");
    }

    #[test]
    fn test_unregister() {
        let registry = ClientRegistry::new();
        let (id, _rx) = registry.register();
        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());
    }
}
