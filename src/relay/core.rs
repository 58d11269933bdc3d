//! The relay core: both directional queues, the peer registry, and the
//! wired peer slot, owned by one explicitly constructed object.
//!
//! There is no ambient global bridge state; the [`RelayCore`] is created at
//! startup and handed (via `Arc`) to every task that needs it.

use bytes::Bytes;

use super::message::{ConnId, Direction, RelayMessage, MAX_PAYLOAD};
use super::queue::DirectionalQueue;
use super::registry::{BroadcastOutcome, Peer, PeerRegistry, WiredSlot};
use crate::error::{BridgeError, Result};

/// Bounded, bidirectional forwarding core between the two transports.
pub struct RelayCore {
    /// Wireless → wired traffic.
    to_wired: DirectionalQueue,
    /// Wired → wireless traffic.
    to_wireless: DirectionalQueue,
    /// Connected wireless peers.
    pub registry: PeerRegistry,
    /// The single wired peer.
    pub wired: WiredSlot,
}

impl RelayCore {
    /// Create a relay with empty queues and no peers.
    pub fn new() -> Self {
        Self {
            to_wired: DirectionalQueue::new(),
            to_wireless: DirectionalQueue::new(),
            registry: PeerRegistry::new(),
            wired: WiredSlot::new(),
        }
    }

    fn queue(&self, direction: Direction) -> &DirectionalQueue {
        match direction {
            Direction::FromWireless => &self.to_wired,
            Direction::FromWired => &self.to_wireless,
        }
    }

    /// Enqueue `data` for the opposite side of the bridge.
    ///
    /// Fails only when `data` exceeds [`MAX_PAYLOAD`]; the caller must not
    /// retry the same oversized payload. A full queue evicts its oldest
    /// message, which is logged as a drop, not reported as an error.
    pub fn send(&self, direction: Direction, data: &[u8], source: ConnId) -> Result<()> {
        if data.len() > MAX_PAYLOAD {
            tracing::warn!(
                source = %source,
                len = data.len(),
                "relay payload over the {MAX_PAYLOAD}-byte cap rejected"
            );
            return Err(BridgeError::PayloadTooLarge { len: data.len() });
        }

        let msg = RelayMessage::new(data, source, direction);
        if let Some(evicted) = self.queue(direction).push(msg) {
            tracing::warn!(
                ?direction,
                dropped_len = evicted.len(),
                dropped_source = %evicted.source,
                "queue full: dropped oldest message, keeping newest"
            );
        }

        tracing::debug!(?direction, len = data.len(), source = %source, "message enqueued");
        Ok(())
    }

    /// Dequeue the next message originating from `direction`, waiting as
    /// long as it takes. Intended for the dedicated drain task of that
    /// direction only.
    pub async fn recv(&self, direction: Direction) -> RelayMessage {
        self.queue(direction).recv().await
    }

    /// Register a wireless peer. See [`PeerRegistry::register`].
    pub async fn register_wireless(&self, peer: Peer) -> Result<()> {
        self.registry.register(peer).await
    }

    /// Unregister a wireless peer. See [`PeerRegistry::unregister`].
    pub async fn unregister_wireless(&self, id: ConnId) -> Result<()> {
        self.registry.unregister(id).await
    }

    /// Install the wired peer.
    pub async fn set_wired_peer(&self, peer: Peer) -> Result<()> {
        self.wired.set(peer).await
    }

    /// Remove the wired peer.
    pub async fn clear_wired_peer(&self) -> Result<Option<ConnId>> {
        self.wired.clear().await
    }

    /// Fan a payload out to every registered wireless peer.
    pub async fn broadcast(&self, payload: Bytes) -> Result<BroadcastOutcome> {
        self.registry.broadcast(payload).await
    }
}

impl Default for RelayCore {
    fn default() -> Self {
        Self::new()
    }
}
