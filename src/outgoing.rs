use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::PollSender;

use crate::error::Error;

/// A cloneable handle on the outgoing queue of an
/// [`EventConn`](crate::EventConn).
///
/// The queue is bounded: when it is full, [`send`](Self::send) waits until the
/// send loop has taken an item off it.
#[derive(Debug, Clone)]
pub struct Outgoing {
    tx: mpsc::Sender<Bytes>,
}

impl Outgoing {
    pub(crate) fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx }
    }

    /// Queues `item` for sending.
    ///
    /// Success means the item was queued, not that it was written; write
    /// failures show up on the connection's error queue.
    pub async fn send(&self, item: impl Into<Bytes>) -> Result<(), Error> {
        self.tx.send(item.into()).await.map_err(|_| Error::Closed)
    }

    /// Queues `item` without waiting; fails with [`Error::Full`] if the queue
    /// has no room.
    pub fn try_send(&self, item: impl Into<Bytes>) -> Result<(), Error> {
        self.tx.try_send(item.into()).map_err(|e| match e {
            TrySendError::Full(_) => Error::Full,
            TrySendError::Closed(_) => Error::Closed,
        })
    }

    /// `true` once the send loop has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Free slots in the queue right now.
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }

    /// Converts the handle into a [`futures::Sink`].
    pub fn into_sink(self) -> PollSender<Bytes> {
        PollSender::new(self.tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::SinkExt;

    #[tokio::test]
    async fn full_queue_rejects_try_send() {
        let (tx, mut rx) = mpsc::channel(2);
        let outgoing = Outgoing::new(tx);

        outgoing.try_send("a").unwrap();
        outgoing.send(vec![b'b']).await.unwrap();
        assert_eq!(outgoing.capacity(), 0);
        assert!(matches!(outgoing.try_send("c"), Err(Error::Full)));

        assert_eq!(rx.recv().await, Some(Bytes::from_static(b"a")));
        outgoing.try_send("c").unwrap();
    }

    #[tokio::test]
    async fn closed_queue_rejects_sends() {
        let (tx, rx) = mpsc::channel(2);
        let outgoing = Outgoing::new(tx);
        drop(rx);

        assert!(outgoing.is_closed());
        assert!(matches!(outgoing.send("a").await, Err(Error::Closed)));
        assert!(matches!(outgoing.try_send("a"), Err(Error::Closed)));
    }

    #[tokio::test]
    async fn sink_feeds_the_queue() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut sink = Outgoing::new(tx).into_sink();

        sink.send(Bytes::from_static(b"via sink")).await.unwrap();
        assert_eq!(rx.recv().await, Some(Bytes::from_static(b"via sink")));
    }
}
