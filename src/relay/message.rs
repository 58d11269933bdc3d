//! Relay message envelope and connection identity.

use std::fmt;

use bytes::Bytes;

/// Maximum relay payload size in bytes.
pub const MAX_PAYLOAD: usize = 256;

/// Identifier for one accepted connection, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Which side of the bridge a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Received from a wireless peer, bound for the wired peer.
    FromWireless,
    /// Received from the wired peer, bound for all wireless peers.
    FromWired,
}

/// One relay payload in flight between the two transports.
///
/// Owned exclusively by whichever queue currently holds it: copied in on
/// enqueue, moved out on dequeue. The payload is opaque to the relay.
#[derive(Debug, Clone)]
pub struct RelayMessage {
    /// Payload bytes, at most [`MAX_PAYLOAD`].
    pub payload: Bytes,
    /// Connection the bytes arrived on.
    pub source: ConnId,
    /// Originating side.
    pub direction: Direction,
}

impl RelayMessage {
    /// Build a message, copying the payload. Length is not checked here;
    /// [`RelayCore::send`](crate::relay::RelayCore::send) enforces the cap.
    pub fn new(payload: &[u8], source: ConnId, direction: Direction) -> Self {
        Self {
            payload: Bytes::copy_from_slice(payload),
            source,
            direction,
        }
    }

    /// Payload length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conn_id_display() {
        assert_eq!(ConnId(7).to_string(), "conn#7");
    }

    #[test]
    fn test_message_copies_payload() {
        let data = vec![1u8, 2, 3];
        let msg = RelayMessage::new(&data, ConnId(1), Direction::FromWireless);
        drop(data);

        assert_eq!(&msg.payload[..], &[1, 2, 3]);
        assert_eq!(msg.len(), 3);
        assert!(!msg.is_empty());
    }
}
