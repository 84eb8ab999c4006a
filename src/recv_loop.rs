//! The receive side of an [`EventConn`](crate::EventConn).
//!
//! Reads are bounded by the configured read timeout. Each read outcome is fed
//! to a [`ChunkMerger`], which decides whether bytes are handed to the caller
//! right away or held back because more of the same burst is likely to follow.

use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, trace, warn};

use crate::error::ConnError;
use crate::shutdown::CloseHandle;

/// Merges consecutive reads into incoming items.
///
/// A read that fills the buffer exactly is assumed to be followed by more
/// data and is accumulated; the next shorter read completes the item. This is
/// a heuristic: a burst whose length is an exact multiple of the capacity is
/// only delivered on the next read, empty read or timeout, possibly merged
/// with unrelated data arriving in the meantime.
#[derive(Debug)]
pub(crate) struct ChunkMerger {
    capacity: usize,
    pending: BytesMut,
}

impl ChunkMerger {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            pending: BytesMut::new(),
        }
    }

    /// Feeds the bytes of one successful read. Returns an item if one is
    /// complete.
    pub(crate) fn push(&mut self, chunk: BytesMut) -> Option<Bytes> {
        if chunk.is_empty() {
            return self.flush();
        }
        if chunk.len() >= self.capacity {
            self.pending.extend_from_slice(&chunk);
            return None;
        }
        if self.pending.is_empty() {
            return Some(chunk.freeze());
        }
        self.pending.extend_from_slice(&chunk);
        Some(self.pending.split().freeze())
    }

    /// Delivers whatever is held back, if anything.
    pub(crate) fn flush(&mut self) -> Option<Bytes> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.split().freeze())
        }
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

enum ReadOutcome {
    Data(BytesMut),
    Idle,
    Eof,
    Failed(io::Error),
}

async fn read_chunk<R>(reader: &mut R, capacity: usize, read_timeout: Duration) -> ReadOutcome
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::zeroed(capacity);
    match time::timeout(read_timeout, reader.read(&mut buf[..])).await {
        Err(_) => ReadOutcome::Idle,
        // transports with their own read deadline report expiry this way
        Ok(Err(e)) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
            ReadOutcome::Idle
        }
        Ok(Err(e)) => ReadOutcome::Failed(e),
        Ok(Ok(0)) => ReadOutcome::Eof,
        Ok(Ok(n)) => {
            buf.truncate(n);
            ReadOutcome::Data(buf)
        }
    }
}

/// Runs until the connection is closed, the stream ends, a read fails or the
/// incoming queue has no consumer left.
///
/// The incoming and error senders are dropped on exit, which is how the
/// consumer learns that no more items will arrive.
pub(crate) async fn run<R>(
    mut reader: R,
    capacity: usize,
    read_timeout: Duration,
    incoming: mpsc::Sender<Bytes>,
    errors: mpsc::Sender<ConnError>,
    shutdown: CloseHandle,
) where
    R: AsyncRead + Unpin,
{
    let mut merger = ChunkMerger::new(capacity);

    while !shutdown.is_closed() {
        let outcome = tokio::select! {
            biased;
            _ = shutdown.quit().cancelled() => break,
            outcome = read_chunk(&mut reader, capacity, read_timeout) => outcome,
        };

        let item = match outcome {
            ReadOutcome::Data(chunk) => {
                trace!(len = chunk.len(), pending = merger.pending_len(), "read");
                merger.push(chunk)
            }
            ReadOutcome::Idle => {
                trace!(pending = merger.pending_len(), "read timed out");
                merger.flush()
            }
            ReadOutcome::Eof => {
                debug!("end of stream");
                if let Some(item) = merger.flush() {
                    shutdown.deliver(&incoming, item).await;
                }
                // the incoming queue must end even if nobody drains the errors
                drop(incoming);
                let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed by peer");
                shutdown.deliver(&errors, ConnError::Receive(eof)).await;
                break;
            }
            ReadOutcome::Failed(e) => {
                warn!("read failed: {}", e);
                drop(incoming);
                shutdown.deliver(&errors, ConnError::Receive(e)).await;
                break;
            }
        };

        if let Some(item) = item {
            debug!(len = item.len(), "received");
            if !shutdown.deliver(&incoming, item).await {
                break;
            }
        }
    }

    debug!("receive loop stopped");
}
