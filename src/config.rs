//! Gateway configuration.
//!
//! Plain config structs with serde `Deserialize` derives so a caller can
//! load them from whatever format it likes; the defaults mirror the
//! reference deployment (wired side on port 8888, wireless side on 9999).

use std::net::SocketAddr;

use serde::Deserialize;

use crate::writer::WriterConfig;

/// How a transport's byte streams are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    /// Opaque data stream: non-command bytes are relayed to the other side;
    /// embedded `AT+…\r\n` frames are still recognized and dispatched.
    #[default]
    Bridged,
    /// Pure control channel: command frames are dispatched, everything else
    /// is discarded.
    Control,
}

/// Per-transport settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Listener bind address.
    pub bind_addr: SocketAddr,
    /// Stream interpretation for connections on this transport.
    #[serde(default)]
    pub mode: StreamMode,
}

/// Top-level gateway settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Wireless-side listener (many peers).
    pub wireless: TransportConfig,
    /// Wired-side listener (single peer).
    pub wired: TransportConfig,
    /// Per-connection writer task settings.
    #[serde(skip, default)]
    pub writer: WriterConfig,
    /// Socket read buffer size in bytes.
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
}

fn default_read_buffer_size() -> usize {
    1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            wireless: TransportConfig {
                bind_addr: "0.0.0.0:9999".parse().expect("valid literal"),
                mode: StreamMode::Bridged,
            },
            wired: TransportConfig {
                bind_addr: "0.0.0.0:8888".parse().expect("valid literal"),
                mode: StreamMode::Bridged,
            },
            writer: WriterConfig::default(),
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.wireless.bind_addr.port(), 9999);
        assert_eq!(config.wired.bind_addr.port(), 8888);
        assert_eq!(config.wireless.mode, StreamMode::Bridged);
        assert_eq!(config.read_buffer_size, 1024);
    }
}
