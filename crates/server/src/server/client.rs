//! Client sessions and the registry that owns them.

use bytes::Bytes;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tokio::sync::{mpsc, oneshot};
use tokio::sync::mpsc::error::TrySendError;

/// Outcome of handing a frame to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Frame queued for the writer task.
    Queued,
    /// Queue full; this frame was skipped for this session.
    Dropped,
    /// The writer task is gone.
    Closed,
}

/// A connected client session.
#[derive(Debug)]
pub struct Client {
    /// Player identity.
    pub id: u32,
    /// Remote address.
    pub addr: SocketAddr,
    /// Frames waiting for the connection's writer task.
    outbound: mpsc::Sender<Bytes>,
    /// Consecutive frames dropped because the queue was full.
    pub lagged_ticks: u32,
    /// Dropped with the session; wakes the connection's reader so it stops.
    _evicted: oneshot::Sender<()>,
}

impl Client {
    fn new(id: u32, addr: SocketAddr, outbound: mpsc::Sender<Bytes>) -> (Self, oneshot::Receiver<()>) {
        let (evicted_tx, evicted_rx) = oneshot::channel();
        let client = Self {
            id,
            addr,
            outbound,
            lagged_ticks: 0,
            _evicted: evicted_tx,
        };
        (client, evicted_rx)
    }

    /// Queue a frame without waiting.
    pub fn deliver(&mut self, frame: Bytes) -> Delivery {
        match self.outbound.try_send(frame) {
            Ok(()) => {
                self.lagged_ticks = 0;
                Delivery::Queued
            }
            Err(TrySendError::Full(_)) => {
                self.lagged_ticks += 1;
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

/// All live sessions, keyed by player identity.
///
/// Identities start at 1 and are never handed out twice.
#[derive(Debug)]
pub struct SessionRegistry {
    next_client_id: u32,
    clients: BTreeMap<u32, Client>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            next_client_id: 1,
            clients: BTreeMap::new(),
        }
    }

    /// Allocate the next identity and store the session under it.
    ///
    /// The returned receiver resolves once the session is unregistered.
    pub fn register(
        &mut self,
        addr: SocketAddr,
        outbound: mpsc::Sender<Bytes>,
    ) -> (u32, oneshot::Receiver<()>) {
        let id = self.next_client_id;
        self.next_client_id += 1;
        let (client, evicted) = Client::new(id, addr, outbound);
        self.clients.insert(id, client);
        (id, evicted)
    }

    pub fn unregister(&mut self, id: u32) -> Option<Client> {
        self.clients.remove(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.clients.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.clients.keys().copied()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Client> {
        self.clients.values_mut()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    #[test]
    fn test_ids_increase_and_are_not_reused() {
        let mut registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::channel(4);
        let (a, _) = registry.register(test_addr(), tx.clone());
        let (b, _) = registry.register(test_addr(), tx.clone());
        assert_eq!((a, b), (1, 2));

        assert!(registry.unregister(b).is_some());
        let (c, _) = registry.register(test_addr(), tx);
        assert_eq!(c, 3);
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_unregister_wakes_evicted_receiver() {
        let mut registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::channel(4);
        let (id, mut evicted) = registry.register(test_addr(), tx);
        assert!(evicted.try_recv().is_err());
        registry.unregister(id);
        assert!(matches!(
            evicted.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
    }

    #[test]
    fn test_deliver_outcomes() {
        let mut registry = SessionRegistry::new();
        let (tx, mut rx) = mpsc::channel(1);
        registry.register(test_addr(), tx);
        let client = registry.iter_mut().next().unwrap();

        assert_eq!(client.deliver(Bytes::from_static(b"a")), Delivery::Queued);
        assert_eq!(client.deliver(Bytes::from_static(b"b")), Delivery::Dropped);
        assert_eq!(client.lagged_ticks, 1);

        assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"a"));
        assert_eq!(client.deliver(Bytes::from_static(b"c")), Delivery::Queued);
        assert_eq!(client.lagged_ticks, 0);

        drop(rx);
        assert_eq!(client.deliver(Bytes::from_static(b"d")), Delivery::Closed);
    }
}
