//! Error types for atbridge.

use thiserror::Error;

use crate::protocol::DecodeError;
use crate::relay::MAX_PAYLOAD;

/// Main error type for all bridge operations.
///
/// Parsing-layer anomalies never reach this type: the line parser absorbs
/// garbage input silently. Everything here is a per-unit-of-work failure the
/// caller decides to retry, drop, or close on; nothing is fatal to the
/// process.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A recognized command frame failed to decode.
    #[error("decode failure: {0}")]
    Decode(#[from] DecodeError),

    /// No table entry matches the command verb.
    #[error("command {0:?} not found")]
    CommandNotFound(String),

    /// Relay payload exceeds the fixed cap. The caller must not retry the
    /// same oversized payload.
    #[error("payload of {len} bytes exceeds the {MAX_PAYLOAD}-byte cap")]
    PayloadTooLarge {
        /// Length of the rejected payload.
        len: usize,
    },

    /// All wireless peer slots are occupied; the caller must close the
    /// connection.
    #[error("peer registry full")]
    RegistryFull,

    /// A registry lock was not acquired within the bounded wait window.
    /// The operation was abandoned, not retried internally.
    #[error("lock acquisition timed out")]
    LockTimeout,

    /// The peer connection (or its writer task) is gone.
    #[error("connection closed")]
    ConnectionClosed,

    /// The peer's write queue is full.
    #[error("write queue full")]
    WriteBackpressure,
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, BridgeError>;
