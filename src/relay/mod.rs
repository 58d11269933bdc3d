//! Bounded, concurrent relay between the two bridged transports.

mod core;
mod message;
mod queue;
mod registry;

pub use self::core::RelayCore;
pub use message::{ConnId, Direction, RelayMessage, MAX_PAYLOAD};
pub use queue::{DirectionalQueue, QUEUE_DEPTH};
pub use registry::{
    BroadcastOutcome, Peer, PeerRegistry, WiredSlot, LOCK_TIMEOUT, MAX_WIRELESS_PEERS,
};
