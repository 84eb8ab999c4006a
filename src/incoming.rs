//! Consuming side of the incoming queue, and the helpers that assemble
//! application messages out of raw incoming items.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::trace;

use crate::error::Error;

/// A cloneable handle on the incoming queue of an
/// [`EventConn`](crate::EventConn).
///
/// Items are delivered to exactly one of the clones, in the order the receive
/// loop produced them. Once the receive loop has stopped and the queue is
/// drained, every receive call reports the end (`None` or [`Error::Closed`]).
#[derive(Debug, Clone)]
pub struct Incoming {
    rx: Arc<Mutex<mpsc::Receiver<Bytes>>>,
}

impl Incoming {
    pub(crate) fn new(rx: mpsc::Receiver<Bytes>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Waits for the next item. `None` once the receive loop has stopped.
    pub async fn recv(&self) -> Option<Bytes> {
        self.rx.lock().await.recv().await
    }

    /// Takes the next item if one is ready.
    ///
    /// Returns `Ok(None)` if nothing is queued right now, including when
    /// another clone is currently waiting on the queue.
    pub fn try_recv(&self) -> Result<Option<Bytes>, Error> {
        let Ok(mut rx) = self.rx.try_lock() else {
            return Ok(None);
        };
        match rx.try_recv() {
            Ok(item) => Ok(Some(item)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::Closed),
        }
    }

    /// Collects incoming items until `is_complete` accepts the bytes gathered
    /// so far.
    ///
    /// `is_complete` is checked before the first item is taken, so a
    /// predicate that accepts an empty buffer returns immediately. There is no
    /// timeout; wrap the call in [`tokio::time::timeout`] if one is needed.
    ///
    /// The queue stays locked for the whole call, so items belonging to one
    /// message never end up at another consumer. Dropping the future discards
    /// the bytes gathered so far.
    ///
    /// Returns [`Error::Closed`] if the receive loop stops before the
    /// predicate is satisfied.
    pub async fn recv_until<F>(&self, mut is_complete: F) -> Result<Bytes, Error>
    where
        F: FnMut(&[u8]) -> bool,
    {
        let mut rx = self.rx.lock().await;
        let mut message = BytesMut::new();
        while !is_complete(&message) {
            let chunk = rx.recv().await.ok_or(Error::Closed)?;
            trace!(
                len = chunk.len(),
                total = message.len() + chunk.len(),
                "waiting for message boundary"
            );
            message.extend_from_slice(&chunk);
        }
        Ok(message.freeze())
    }

    /// Like [`recv_until`](Self::recv_until), but runs on a spawned task and
    /// delivers the result through a oneshot channel.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn recv_chan_until<F>(&self, is_complete: F) -> oneshot::Receiver<Result<Bytes, Error>>
    where
        F: FnMut(&[u8]) -> bool + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let incoming = self.clone();
        tokio::spawn(async move {
            let message = incoming.recv_until(is_complete).await;
            // the caller may have stopped waiting
            let _ = tx.send(message);
        });
        rx
    }

    /// Blocking version of [`recv_until`](Self::recv_until) for code that
    /// does not run on the async runtime.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    pub fn blocking_recv_until<F>(&self, mut is_complete: F) -> Result<Bytes, Error>
    where
        F: FnMut(&[u8]) -> bool,
    {
        let mut rx = self.rx.blocking_lock();
        let mut message = BytesMut::new();
        while !is_complete(&message) {
            let chunk = rx.blocking_recv().ok_or(Error::Closed)?;
            message.extend_from_slice(&chunk);
        }
        Ok(message.freeze())
    }

    /// The incoming items as a [`Stream`], ending when the receive loop stops.
    pub fn stream(&self) -> impl Stream<Item = Bytes> + Send + 'static {
        futures::stream::unfold(self.clone(), |incoming| async move {
            let item = incoming.recv().await?;
            Some((item, incoming))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn queue(items: &[&'static str]) -> (mpsc::Sender<Bytes>, Incoming) {
        let (tx, rx) = mpsc::channel(16);
        for &item in items {
            tx.try_send(Bytes::from_static(item.as_bytes())).unwrap();
        }
        (tx, Incoming::new(rx))
    }

    fn ends_with_newline(buf: &[u8]) -> bool {
        buf.last() == Some(&b'\n')
    }

    #[tokio::test]
    async fn recv_until_gathers_chunks() {
        let (_tx, incoming) = queue(&["HEL", "LO", "\n", "next"]);

        let message = incoming.recv_until(ends_with_newline).await.unwrap();
        assert_eq!(message, Bytes::from_static(b"HELLO\n"));
        assert_eq!(incoming.recv().await, Some(Bytes::from_static(b"next")));
    }

    #[tokio::test]
    async fn predicate_is_checked_before_reading() {
        let (_tx, incoming) = queue(&["untouched"]);

        let message = incoming.recv_until(|_| true).await.unwrap();
        assert!(message.is_empty());
        assert_eq!(incoming.try_recv().unwrap(), Some(Bytes::from_static(b"untouched")));
    }

    #[tokio::test]
    async fn recv_until_reports_closed_queue() {
        let (tx, incoming) = queue(&["partial"]);
        drop(tx);

        let result = incoming.recv_until(ends_with_newline).await;
        assert!(matches!(result, Err(Error::Closed)));
        assert!(matches!(incoming.try_recv(), Err(Error::Closed)));
    }

    #[tokio::test]
    async fn recv_chan_until_delivers_on_completion() {
        let (tx, incoming) = queue(&["4 by"]);
        let pending = incoming.recv_chan_until(|buf| buf.len() >= 8);

        tx.send(Bytes::from_static(b"tes!")).await.unwrap();
        let message = pending.await.unwrap().unwrap();
        assert_eq!(message, Bytes::from_static(b"4 bytes!"));
    }

    #[test]
    fn blocking_recv_until_outside_runtime() {
        let (tx, incoming) = queue(&["a", "b"]);
        let producer = std::thread::spawn(move || {
            tx.blocking_send(Bytes::from_static(b"c\n")).unwrap();
        });

        let message = incoming.blocking_recv_until(ends_with_newline).unwrap();
        assert_eq!(message, Bytes::from_static(b"abc\n"));
        producer.join().unwrap();
    }

    #[tokio::test]
    async fn stream_ends_with_the_queue() {
        let (tx, incoming) = queue(&["x", "y"]);
        drop(tx);

        let items: Vec<Bytes> = incoming.stream().collect().await;
        assert_eq!(items, vec![Bytes::from_static(b"x"), Bytes::from_static(b"y")]);
    }
}
