use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

/// Closes an [`EventConn`](crate::EventConn) from anywhere, and observes when
/// its loops have finished.
///
/// Obtained through [`EventConn::close_handle`](crate::EventConn::close_handle).
/// Cloning is cheap; every clone refers to the same connection.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    closed: Arc<AtomicBool>,
    quit: CancellationToken,
    tasks: TaskTracker,
}

impl CloseHandle {
    pub(crate) fn new() -> Self {
        Self {
            closed: Arc::new(AtomicBool::new(false)),
            quit: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// Marks the connection closed and tells both loops to stop.
    ///
    /// Returns `true` for the call that actually closed the connection and
    /// `false` for every later call.
    pub fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::AcqRel);
        if first {
            debug!("closing event connection");
        }
        self.quit.cancel();
        first
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Waits until both the send and receive loop have exited and released
    /// their half of the transport.
    ///
    /// This does not close the connection by itself: it also resolves when
    /// the loops stop on their own (end of stream, fatal read error, every
    /// sender dropped).
    pub async fn closed(&self) {
        self.tasks.wait().await;
    }

    pub(crate) fn tasks(&self) -> &TaskTracker {
        &self.tasks
    }

    pub(crate) fn quit(&self) -> &CancellationToken {
        &self.quit
    }

    /// Hands `item` to `tx`, giving up if the connection is closed first.
    ///
    /// Returns `false` if the item was not delivered, either because of the
    /// close or because the receiving side is gone.
    pub(crate) async fn deliver<T>(&self, tx: &mpsc::Sender<T>, item: T) -> bool {
        tokio::select! {
            biased;
            _ = self.quit.cancelled() => false,
            sent = tx.send(item) => sent.is_ok(),
        }
    }
}
