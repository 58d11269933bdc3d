//! Peer registry for the wireless side, plus the single wired peer slot.
//!
//! Registry mutation and broadcast iteration share one lock, so a peer can
//! never be registered or unregistered mid-broadcast: every broadcast sees a
//! consistent snapshot of the peer set. Lock acquisition waits at most
//! [`LOCK_TIMEOUT`]; an expired wait is a soft failure
//! ([`BridgeError::LockTimeout`]) reported to the caller, never an internal
//! retry.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::timeout;

use super::message::ConnId;
use crate::error::{BridgeError, Result};
use crate::writer::WriterHandle;

/// Maximum number of simultaneously registered wireless peers.
pub const MAX_WIRELESS_PEERS: usize = 5;

/// Bounded wait for registry and wired-slot locks.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(1);

/// One registered peer: its connection id and the handle of its dedicated
/// writer task.
#[derive(Clone)]
pub struct Peer {
    /// Connection identifier.
    pub id: ConnId,
    /// Sink for outbound bytes to this peer.
    pub writer: WriterHandle,
}

/// Delivery counts from one broadcast, for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastOutcome {
    /// Peers the payload was handed to.
    pub delivered: usize,
    /// Peers whose write failed. Failed peers stay registered; each peer's
    /// own read loop owns its removal on disconnect.
    pub failed: usize,
}

struct Slots {
    slots: [Option<Peer>; MAX_WIRELESS_PEERS],
    count: usize,
}

/// Fixed-size registry of currently connected wireless peers.
pub struct PeerRegistry {
    inner: Mutex<Slots>,
}

impl PeerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Slots {
                slots: std::array::from_fn(|_| None),
                count: 0,
            }),
        }
    }

    async fn lock(&self) -> Result<MutexGuard<'_, Slots>> {
        timeout(LOCK_TIMEOUT, self.inner.lock())
            .await
            .map_err(|_| BridgeError::LockTimeout)
    }

    /// Occupy the first empty slot with `peer`.
    ///
    /// Fails with [`BridgeError::RegistryFull`] when all slots are taken;
    /// the caller must close the connection.
    pub async fn register(&self, peer: Peer) -> Result<()> {
        let mut inner = self.lock().await?;

        let Some(slot) = inner.slots.iter().position(Option::is_none) else {
            tracing::warn!(peer = %peer.id, "peer registry full, registration rejected");
            return Err(BridgeError::RegistryFull);
        };

        let id = peer.id;
        inner.slots[slot] = Some(peer);
        inner.count += 1;
        tracing::info!(peer = %id, slot, total = inner.count, "wireless peer registered");
        Ok(())
    }

    /// Clear the slot holding `id`. A no-op when the peer is not present.
    pub async fn unregister(&self, id: ConnId) -> Result<()> {
        let mut inner = self.lock().await?;

        if let Some(slot) = inner
            .slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|p| p.id == id))
        {
            inner.slots[slot] = None;
            inner.count -= 1;
            tracing::info!(peer = %id, slot, total = inner.count, "wireless peer unregistered");
        }
        Ok(())
    }

    /// Number of registered peers.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.lock().await?.count)
    }

    /// Hand `payload` to every registered peer's writer.
    ///
    /// A failed write is counted but neither aborts delivery to the
    /// remaining peers nor removes the failed peer.
    pub async fn broadcast(&self, payload: Bytes) -> Result<BroadcastOutcome> {
        let inner = self.lock().await?;

        let mut outcome = BroadcastOutcome::default();
        for peer in inner.slots.iter().flatten() {
            match peer.writer.try_send(payload.clone()) {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    outcome.failed += 1;
                    tracing::warn!(peer = %peer.id, error = %e, "broadcast write failed");
                }
            }
        }
        Ok(outcome)
    }
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The single wired peer slot, under its own lock.
///
/// Admission control lives at the adapter: a new wired connection is only
/// accepted while the slot is vacant, and the slot is refilled only after
/// the previous connection is fully torn down.
pub struct WiredSlot {
    inner: Mutex<Option<Peer>>,
}

impl WiredSlot {
    /// Create a vacant slot.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    async fn lock(&self) -> Result<MutexGuard<'_, Option<Peer>>> {
        timeout(LOCK_TIMEOUT, self.inner.lock())
            .await
            .map_err(|_| BridgeError::LockTimeout)
    }

    /// Install the wired peer.
    pub async fn set(&self, peer: Peer) -> Result<()> {
        let mut inner = self.lock().await?;
        tracing::info!(peer = %peer.id, "wired peer set");
        *inner = Some(peer);
        Ok(())
    }

    /// Vacate the slot, returning the id it held.
    pub async fn clear(&self) -> Result<Option<ConnId>> {
        let mut inner = self.lock().await?;
        let id = inner.take().map(|p| p.id);
        if let Some(id) = id {
            tracing::info!(peer = %id, "wired peer cleared");
        }
        Ok(id)
    }

    /// Whether no wired peer is currently installed.
    pub async fn is_vacant(&self) -> Result<bool> {
        Ok(self.lock().await?.is_none())
    }

    /// Writer handle of the current wired peer, if any.
    pub async fn writer(&self) -> Result<Option<WriterHandle>> {
        Ok(self.lock().await?.as_ref().map(|p| p.writer.clone()))
    }
}

impl Default for WiredSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{spawn_writer_task, WriterConfig};

    /// A peer backed by a live writer task over an in-memory pipe. The far
    /// end is returned so it stays open for the test's duration.
    fn live_peer(id: u64) -> (Peer, tokio::io::DuplexStream) {
        let (near, far) = tokio::io::duplex(4096);
        let (writer, _task) = spawn_writer_task(near, WriterConfig::default());
        (Peer { id: ConnId(id), writer }, far)
    }

    /// A peer whose writer task has already been torn down, so every write
    /// to it fails.
    async fn dead_peer(id: u64) -> Peer {
        let (near, _far) = tokio::io::duplex(64);
        let (writer, task) = spawn_writer_task(near, WriterConfig::default());
        task.abort();
        let _ = task.await;
        Peer { id: ConnId(id), writer }
    }

    #[tokio::test]
    async fn test_register_up_to_capacity_then_full() {
        let registry = PeerRegistry::new();
        let mut far_ends = Vec::new();

        for id in 0..MAX_WIRELESS_PEERS as u64 {
            let (peer, far) = live_peer(id);
            far_ends.push(far);
            registry.register(peer).await.unwrap();
        }
        assert_eq!(registry.count().await.unwrap(), MAX_WIRELESS_PEERS);

        let (sixth, _far) = live_peer(99);
        assert!(matches!(
            registry.register(sixth).await,
            Err(BridgeError::RegistryFull)
        ));

        // Freeing any one slot admits exactly one more.
        registry.unregister(ConnId(2)).await.unwrap();
        let (again, _far2) = live_peer(100);
        registry.register(again).await.unwrap();
        assert_eq!(registry.count().await.unwrap(), MAX_WIRELESS_PEERS);
    }

    #[tokio::test]
    async fn test_unregister_absent_is_noop() {
        let registry = PeerRegistry::new();
        registry.unregister(ConnId(42)).await.unwrap();
        assert_eq!(registry.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_counts_one_failure() {
        let registry = PeerRegistry::new();

        let (a, _fa) = live_peer(1);
        let (b, _fb) = live_peer(2);
        registry.register(a).await.unwrap();
        registry.register(b).await.unwrap();
        registry.register(dead_peer(3).await).await.unwrap();

        let outcome = registry
            .broadcast(Bytes::from_static(b"ping"))
            .await
            .unwrap();
        assert_eq!(outcome.delivered, 2);
        assert_eq!(outcome.failed, 1);

        // The failing peer stays registered until explicitly removed.
        assert_eq!(registry.count().await.unwrap(), 3);
        registry.unregister(ConnId(3)).await.unwrap();
        assert_eq!(registry.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_broadcast_empty_registry() {
        let registry = PeerRegistry::new();
        let outcome = registry.broadcast(Bytes::from_static(b"x")).await.unwrap();
        assert_eq!(outcome, BroadcastOutcome::default());
    }

    #[tokio::test]
    async fn test_wired_slot_set_clear() {
        let slot = WiredSlot::new();
        assert!(slot.is_vacant().await.unwrap());
        assert!(slot.writer().await.unwrap().is_none());

        let (peer, _far) = live_peer(7);
        slot.set(peer).await.unwrap();
        assert!(!slot.is_vacant().await.unwrap());
        assert!(slot.writer().await.unwrap().is_some());

        assert_eq!(slot.clear().await.unwrap(), Some(ConnId(7)));
        assert!(slot.is_vacant().await.unwrap());
        assert_eq!(slot.clear().await.unwrap(), None);
    }
}
