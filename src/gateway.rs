//! Gateway builder and runtime loops.
//!
//! The [`GatewayBuilder`] configures the command table and network settings;
//! [`GatewayBuilder::start`] binds both listeners and spawns the long-lived
//! tasks:
//! 1. one accept loop per transport
//! 2. one connection actor (read loop) plus one writer task per accepted
//!    connection
//! 3. one drain task per relay direction
//!
//! # Example
//!
//! ```ignore
//! use atbridge::{CommandEntry, Gateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = Gateway::builder()
//!         .command(
//!             "CIPMUX",
//!             CommandEntry::new("multi-connection mode").on_set(|params| {
//!                 tracing::info!(?params, "CIPMUX set");
//!             }),
//!         )
//!         .start()
//!         .await?;
//!
//!     gateway.wait_for_shutdown().await;
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::{GatewayConfig, StreamMode};
use crate::error::Result;
use crate::handler::{CommandEntry, CommandTable};
use crate::protocol::LineParser;
use crate::relay::{ConnId, Direction, Peer, RelayCore, MAX_PAYLOAD};
use crate::transport::{bind, next_conn_id};
use crate::writer::spawn_writer_task;

/// Which registry structure a connection's cleanup targets.
#[derive(Debug, Clone, Copy)]
enum PeerRole {
    Wireless,
    Wired,
}

/// Builder for configuring and starting a gateway.
pub struct GatewayBuilder {
    table: CommandTable,
    config: GatewayConfig,
}

impl GatewayBuilder {
    /// Create a builder with an empty command table and default config.
    pub fn new() -> Self {
        Self {
            table: CommandTable::new(),
            config: GatewayConfig::default(),
        }
    }

    /// Register a command entry.
    pub fn command(mut self, verb: &'static str, entry: CommandEntry) -> Self {
        self.table.register(verb, entry);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Bind both listeners and spawn the runtime tasks.
    pub async fn start(mut self) -> Result<Gateway> {
        install_manual_command(&mut self.table);
        Gateway::start(self.table, self.config).await
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running gateway.
pub struct Gateway {
    relay: Arc<RelayCore>,
    wireless_addr: SocketAddr,
    wired_addr: SocketAddr,
    /// Signalled when an accept loop dies.
    shutdown_rx: mpsc::Receiver<()>,
}

impl Gateway {
    /// Create a gateway builder.
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    async fn start(table: CommandTable, config: GatewayConfig) -> Result<Self> {
        let relay = Arc::new(RelayCore::new());
        let table = Arc::new(table);
        let config = Arc::new(config);

        let wireless_listener = bind(config.wireless.bind_addr, "wireless").await?;
        let wired_listener = bind(config.wired.bind_addr, "wired").await?;
        let wireless_addr = wireless_listener.local_addr()?;
        let wired_addr = wired_listener.local_addr()?;

        tokio::spawn(drain_to_wired(relay.clone()));
        tokio::spawn(drain_to_wireless(relay.clone()));

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        {
            let relay = relay.clone();
            let table = table.clone();
            let config = config.clone();
            let shutdown_tx = shutdown_tx.clone();
            tokio::spawn(async move {
                if let Err(e) = accept_wireless(wireless_listener, relay, table, config).await {
                    tracing::error!(error = %e, "wireless accept loop failed");
                }
                let _ = shutdown_tx.send(()).await;
            });
        }

        {
            let relay = relay.clone();
            tokio::spawn(async move {
                if let Err(e) = accept_wired(wired_listener, relay, table, config).await {
                    tracing::error!(error = %e, "wired accept loop failed");
                }
                let _ = shutdown_tx.send(()).await;
            });
        }

        Ok(Self {
            relay,
            wireless_addr,
            wired_addr,
            shutdown_rx,
        })
    }

    /// Shared relay state, for peer-count and wired-slot inspection.
    pub fn relay(&self) -> &RelayCore {
        &self.relay
    }

    /// Resolved wireless listener address (useful when binding port 0).
    pub fn wireless_addr(&self) -> SocketAddr {
        self.wireless_addr
    }

    /// Resolved wired listener address.
    pub fn wired_addr(&self) -> SocketAddr {
        self.wired_addr
    }

    /// Block until an accept loop dies.
    pub async fn wait_for_shutdown(mut self) {
        let _ = self.shutdown_rx.recv().await;
    }
}

/// Register the stock `GMR` manual command, unless the caller provided its
/// own. The manual snapshot is taken after registration so the listing
/// includes `GMR` itself.
fn install_manual_command(table: &mut CommandTable) {
    if table.find("GMR").is_some() {
        return;
    }

    let manual: Arc<OnceLock<String>> = Arc::new(OnceLock::new());
    let snapshot = manual.clone();
    table.register(
        "GMR",
        CommandEntry::new("list all commands and their help").on_execute(move |_| {
            if let Some(text) = snapshot.get() {
                tracing::info!("{text}");
            }
        }),
    );
    let _ = manual.set(table.manual());
}

/// Accept loop for the many-peer wireless transport.
async fn accept_wireless(
    listener: TcpListener,
    relay: Arc<RelayCore>,
    table: Arc<CommandTable>,
    config: Arc<GatewayConfig>,
) -> Result<()> {
    loop {
        let (stream, remote) = listener.accept().await?;
        let id = next_conn_id();
        tracing::info!(peer = %id, %remote, "wireless connection accepted");

        let (read_half, write_half) = stream.into_split();
        let (writer, _writer_task) = spawn_writer_task(write_half, config.writer.clone());

        if let Err(e) = relay.register_wireless(Peer { id, writer }).await {
            // Registry full (or lock timeout): close immediately. Dropping
            // both halves tears the connection down.
            tracing::warn!(peer = %id, error = %e, "rejecting wireless connection");
            continue;
        }

        tokio::spawn(connection_actor(
            read_half,
            id,
            Direction::FromWireless,
            config.wireless.mode,
            PeerRole::Wireless,
            relay.clone(),
            table.clone(),
            config.read_buffer_size,
        ));
    }
}

/// Accept loop for the single-peer wired transport.
///
/// A new connection is only admitted while the wired slot is vacant; the
/// slot refills only after the previous connection's actor has torn down.
async fn accept_wired(
    listener: TcpListener,
    relay: Arc<RelayCore>,
    table: Arc<CommandTable>,
    config: Arc<GatewayConfig>,
) -> Result<()> {
    loop {
        let (stream, remote) = listener.accept().await?;

        match relay.wired.is_vacant().await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(%remote, "wired peer already connected, rejecting");
                continue;
            }
            Err(e) => {
                tracing::warn!(%remote, error = %e, "wired slot unavailable, rejecting");
                continue;
            }
        }

        let id = next_conn_id();
        tracing::info!(peer = %id, %remote, "wired connection accepted");

        let (read_half, write_half) = stream.into_split();
        let (writer, _writer_task) = spawn_writer_task(write_half, config.writer.clone());

        if let Err(e) = relay.set_wired_peer(Peer { id, writer }).await {
            tracing::warn!(peer = %id, error = %e, "rejecting wired connection");
            continue;
        }

        tokio::spawn(connection_actor(
            read_half,
            id,
            Direction::FromWired,
            config.wired.mode,
            PeerRole::Wired,
            relay.clone(),
            table.clone(),
            config.read_buffer_size,
        ));
    }
}

/// Per-connection read loop: parse, dispatch, relay, clean up.
#[allow(clippy::too_many_arguments)]
async fn connection_actor(
    mut reader: OwnedReadHalf,
    id: ConnId,
    direction: Direction,
    mode: StreamMode,
    role: PeerRole,
    relay: Arc<RelayCore>,
    table: Arc<CommandTable>,
    read_buffer_size: usize,
) {
    let mut parser = LineParser::new();
    let mut buf = vec![0u8; read_buffer_size];

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                tracing::info!(peer = %id, "connection closed by peer");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(peer = %id, error = %e, "read failed");
                break;
            }
        };

        let parsed = parser.push(&buf[..n]);

        for line in parsed.commands {
            match line.decode() {
                Ok(cmd) => {
                    if let Err(e) = table.execute(&cmd) {
                        tracing::warn!(peer = %id, error = %e, "command dispatch failed");
                    }
                }
                Err(e) => {
                    tracing::warn!(peer = %id, error = %e, "command decode failed");
                }
            }
        }

        if mode == StreamMode::Bridged && !parsed.passthrough.is_empty() {
            // Relay in cap-sized pieces; a send can only fail on the payload
            // cap, which chunking rules out, but the result is not ignored.
            for chunk in parsed.passthrough.chunks(MAX_PAYLOAD) {
                if let Err(e) = relay.send(direction, chunk, id) {
                    tracing::warn!(peer = %id, error = %e, "relay enqueue failed");
                }
            }
        }
    }

    // Remove the peer from the broadcast/forwarding target set before the
    // socket halves drop, so a dead socket is never targeted for more than
    // one cycle.
    let cleanup = match role {
        PeerRole::Wireless => relay.unregister_wireless(id).await,
        PeerRole::Wired => relay.clear_wired_peer().await.map(|_| ()),
    };
    if let Err(e) = cleanup {
        tracing::warn!(peer = %id, error = %e, "peer cleanup failed");
    }
}

/// Drain wireless→wired traffic toward the wired peer.
async fn drain_to_wired(relay: Arc<RelayCore>) {
    loop {
        let msg = relay.recv(Direction::FromWireless).await;

        match relay.wired.writer().await {
            Ok(Some(writer)) => {
                if let Err(e) = writer.try_send(msg.payload) {
                    tracing::warn!(source = %msg.source, error = %e, "wired write failed");
                }
            }
            Ok(None) => {
                tracing::warn!(source = %msg.source, "no wired peer, message dropped");
            }
            Err(e) => {
                tracing::warn!(source = %msg.source, error = %e, "wired slot busy, message dropped");
            }
        }
    }
}

/// Drain wired→wireless traffic by fanning out to all registered peers.
async fn drain_to_wireless(relay: Arc<RelayCore>) {
    loop {
        let msg = relay.recv(Direction::FromWired).await;

        match relay.broadcast(msg.payload).await {
            Ok(outcome) => {
                tracing::debug!(
                    delivered = outcome.delivered,
                    failed = outcome.failed,
                    "broadcast complete"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "broadcast failed");
            }
        }
    }
}
