//! Dedicated writer task per connection.
//!
//! Every accepted connection gets one long-lived task that owns the socket
//! write half and drains an mpsc channel of outbound chunks:
//!
//! ```text
//! drain task  ─┐
//! broadcast   ─┼─► mpsc::Sender<Bytes> ─► writer task ─► socket
//! handlers    ─┘
//! ```
//!
//! Channel-based writes avoid sharing the write half behind a mutex and let
//! the task batch several chunks into a single vectored write. The bounded
//! channel doubles as backpressure: a full channel fails `try_send` instead
//! of buffering without limit.

use std::io::IoSlice;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{BridgeError, Result};

/// Default outbound channel capacity per connection.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Maximum chunks to coalesce into one vectored write.
const MAX_BATCH_SIZE: usize = 16;

/// Configuration for a connection's writer task.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Outbound channel capacity (chunks).
    pub channel_capacity: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Handle for queueing chunks to one connection's writer task.
///
/// Cheaply cloneable; shared by the drain task, broadcast, and command
/// handlers.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<Bytes>,
}

impl WriterHandle {
    /// Queue a chunk without waiting.
    ///
    /// Fails with [`BridgeError::WriteBackpressure`] when the channel is
    /// full and [`BridgeError::ConnectionClosed`] once the writer task has
    /// exited. This is the write path broadcast failure counts observe.
    pub fn try_send(&self, chunk: Bytes) -> Result<()> {
        self.tx.try_send(chunk).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => BridgeError::WriteBackpressure,
            mpsc::error::TrySendError::Closed(_) => BridgeError::ConnectionClosed,
        })
    }

    /// Queue a chunk, waiting for channel space.
    pub async fn send(&self, chunk: Bytes) -> Result<()> {
        self.tx
            .send(chunk)
            .await
            .map_err(|_| BridgeError::ConnectionClosed)
    }

    /// Whether the writer task is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Spawn the writer task for one connection.
///
/// The task runs until every [`WriterHandle`] is dropped (clean shutdown)
/// or a write fails; either way it releases the socket write half.
pub fn spawn_writer_task<W>(writer: W, config: WriterConfig) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let task = tokio::spawn(writer_loop(rx, writer));
    (WriterHandle { tx }, task)
}

/// Receive chunks and write them out, batching whatever is already queued.
async fn writer_loop<W>(mut rx: mpsc::Receiver<Bytes>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut batch: Vec<Bytes> = Vec::with_capacity(MAX_BATCH_SIZE);

    loop {
        let first = match rx.recv().await {
            Some(chunk) => chunk,
            None => return Ok(()),
        };

        batch.clear();
        batch.push(first);
        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(chunk) => batch.push(chunk),
                Err(_) => break,
            }
        }

        write_batch(&mut writer, &batch).await?;
    }
}

/// Write a batch of chunks with vectored I/O, handling partial writes.
async fn write_batch<W>(writer: &mut W, batch: &[Bytes]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let total: usize = batch.iter().map(Bytes::len).sum();
    if total == 0 {
        return Ok(());
    }

    let mut written = 0;
    while written < total {
        let slices = remaining_slices(batch, written);
        let n = writer.write_vectored(&slices).await?;
        if n == 0 {
            return Err(BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write_vectored returned 0",
            )));
        }
        written += n;
    }

    writer.flush().await?;
    Ok(())
}

/// Build the IoSlice array for the unwritten tail of a batch.
fn remaining_slices(batch: &[Bytes], skip: usize) -> Vec<IoSlice<'_>> {
    let mut slices = Vec::with_capacity(batch.len());
    let mut offset = 0;

    for chunk in batch {
        let end = offset + chunk.len();
        if skip < end && !chunk.is_empty() {
            let start_in_chunk = skip.saturating_sub(offset);
            slices.push(IoSlice::new(&chunk[start_in_chunk..]));
        }
        offset = end;
    }

    slices
}
