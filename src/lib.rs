//! # atbridge
//!
//! A two-network serial-over-TCP gateway: one listener accepts up to five
//! wireless peers, another accepts a single wired peer, and byte traffic
//! is relayed between the two sides through small bounded queues. AT-style
//! command frames (`AT+VERB...\r\n`) embedded in either stream are
//! extracted on the fly and dispatched to registered handlers instead of
//! being relayed.
//!
//! ## Architecture
//!
//! - **Protocol** ([`protocol`]): a streaming line parser that recognizes
//!   `AT+` frames inside arbitrary byte soup, and a decoder that splits a
//!   frame into verb, kind, and quoted comma-separated parameters.
//! - **Handlers** ([`handler`]): a verb-indexed table of per-kind callbacks
//!   with a self-describing manual listing.
//! - **Relay** ([`relay`]): two three-deep evict-oldest queues, a five-slot
//!   wireless peer registry with broadcast fan-out, and the single wired
//!   peer slot.
//! - **Writer** ([`writer`]): one dedicated writer task per connection,
//!   fed through a bounded channel and flushing with vectored writes.
//! - **Gateway** ([`gateway`]): the accept loops, per-connection actors,
//!   and drain tasks that tie the above together over TCP.
//!
//! ## Quick start
//!
//! ```ignore
//! use atbridge::{CommandEntry, Gateway};
//!
//! let gateway = Gateway::builder()
//!     .command(
//!         "RST",
//!         CommandEntry::new("restart the device").on_execute(|_| {
//!             tracing::info!("restart requested");
//!         }),
//!     )
//!     .start()
//!     .await?;
//!
//! gateway.wait_for_shutdown().await;
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod handler;
pub mod protocol;
pub mod relay;
pub mod transport;
pub mod writer;

pub use config::{GatewayConfig, StreamMode, TransportConfig};
pub use error::{BridgeError, Result};
pub use gateway::{Gateway, GatewayBuilder};
pub use handler::{CommandEntry, CommandHandler, CommandTable};
pub use protocol::{Command, CommandKind, DecodeError, LineParser};
pub use relay::{BroadcastOutcome, ConnId, Direction, RelayCore, RelayMessage};
pub use writer::{spawn_writer_task, WriterConfig, WriterHandle};
