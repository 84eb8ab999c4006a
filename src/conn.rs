use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use futures::Stream;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tracing::{info, info_span, Instrument};

use crate::config::ConnConfig;
use crate::error::{ConnError, Error};
use crate::incoming::Incoming;
use crate::outgoing::Outgoing;
use crate::shutdown::CloseHandle;
use crate::{recv_loop, send_loop};

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// A duplex connection driven by a receive loop and a send loop.
///
/// Construction splits the transport into its read and write halves and
/// spawns one task for each. From then on the connection is used only
/// through queues:
///
/// * outgoing items: [`send`](Self::send), [`try_send`](Self::try_send),
///   [`outgoing`](Self::outgoing)
/// * incoming items: [`recv`](Self::recv), [`recv_until`](Self::recv_until),
///   [`incoming`](Self::incoming)
/// * error reports: [`next_error`](Self::next_error)
///
/// Read failures end the receive loop: one [`ConnError::Receive`] is
/// reported and the incoming queue closes. Write failures are reported as
/// [`ConnError::Send`] and the send loop carries on with the next item.
///
/// Dropping an `EventConn` closes it.
#[derive(Debug)]
pub struct EventConn {
    id: u64,
    outgoing: Outgoing,
    incoming: Incoming,
    errors: mpsc::Receiver<ConnError>,
    shutdown: CloseHandle,
}

impl EventConn {
    /// Wraps `io` using the default [`ConnConfig`].
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new<T>(io: T) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::spawn(io, ConnConfig::default())
    }

    /// Wraps `io` with a custom configuration.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn with_config<T>(io: T, config: ConnConfig) -> Result<Self, Error>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        config.validate()?;
        Ok(Self::spawn(io, config))
    }

    /// Starts both loops. `config` must already be validated.
    pub(crate) fn spawn<T>(io: T, config: ConnConfig) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
        let (out_tx, out_rx) = mpsc::channel(config.outgoing_capacity);
        let (in_tx, in_rx) = mpsc::channel(config.incoming_capacity);
        let (err_tx, err_rx) = mpsc::channel(config.error_capacity);
        let (reader, writer) = tokio::io::split(io);
        let shutdown = CloseHandle::new();

        let span = info_span!("event_conn", id);
        shutdown.tasks().spawn(
            recv_loop::run(
                reader,
                config.read_buffer_capacity,
                config.read_timeout,
                in_tx,
                err_tx.clone(),
                shutdown.clone(),
            )
            .instrument(span.clone()),
        );
        shutdown
            .tasks()
            .spawn(send_loop::run(writer, out_rx, err_tx, shutdown.clone()).instrument(span));
        shutdown.tasks().close();

        info!(
            id,
            read_buffer_capacity = config.read_buffer_capacity,
            "event connection started"
        );

        Self {
            id,
            outgoing: Outgoing::new(out_tx),
            incoming: Incoming::new(in_rx),
            errors: err_rx,
            shutdown,
        }
    }

    /// Process-wide unique id, also recorded on the loops' tracing span.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Queues an item for sending. See [`Outgoing::send`].
    pub async fn send(&self, item: impl Into<Bytes>) -> Result<(), Error> {
        self.outgoing.send(item).await
    }

    /// Queues an item without waiting. See [`Outgoing::try_send`].
    pub fn try_send(&self, item: impl Into<Bytes>) -> Result<(), Error> {
        self.outgoing.try_send(item)
    }

    /// Next incoming item; `None` once the receive loop has stopped and
    /// everything it produced has been consumed.
    pub async fn recv(&self) -> Option<Bytes> {
        self.incoming.recv().await
    }

    /// Next incoming item if one is ready. See [`Incoming::try_recv`].
    pub fn try_recv(&self) -> Result<Option<Bytes>, Error> {
        self.incoming.try_recv()
    }

    /// See [`Incoming::recv_until`].
    pub async fn recv_until<F>(&self, is_complete: F) -> Result<Bytes, Error>
    where
        F: FnMut(&[u8]) -> bool,
    {
        self.incoming.recv_until(is_complete).await
    }

    /// See [`Incoming::recv_chan_until`].
    pub fn recv_chan_until<F>(&self, is_complete: F) -> oneshot::Receiver<Result<Bytes, Error>>
    where
        F: FnMut(&[u8]) -> bool + Send + 'static,
    {
        self.incoming.recv_chan_until(is_complete)
    }

    /// See [`Incoming::blocking_recv_until`].
    pub fn blocking_recv_until<F>(&self, is_complete: F) -> Result<Bytes, Error>
    where
        F: FnMut(&[u8]) -> bool,
    {
        self.incoming.blocking_recv_until(is_complete)
    }

    /// A handle on the outgoing queue that can be moved to other tasks.
    pub fn outgoing(&self) -> Outgoing {
        self.outgoing.clone()
    }

    /// A handle on the incoming queue that can be moved to other tasks.
    pub fn incoming(&self) -> Incoming {
        self.incoming.clone()
    }

    /// Next error report; `None` once both loops have stopped and all
    /// reports have been consumed.
    pub async fn next_error(&mut self) -> Option<ConnError> {
        self.errors.recv().await
    }

    /// Next error report if one is ready.
    pub fn try_next_error(&mut self) -> Option<ConnError> {
        self.errors.try_recv().ok()
    }

    /// The error reports as a [`Stream`].
    pub fn error_stream(&mut self) -> impl Stream<Item = ConnError> + '_ {
        futures::stream::poll_fn(move |cx| self.errors.poll_recv(cx))
    }

    /// Closes the connection: both loops stop at their next suspension point
    /// and drop their half of the transport, which closes it.
    ///
    /// Safe to call more than once; only the first call returns `true`.
    /// Items still queued for sending are discarded. Use
    /// [`closed`](Self::closed) to wait for the loops to finish.
    pub fn close(&self) -> bool {
        let first = self.shutdown.close();
        if first {
            info!(id = self.id, "event connection closed");
        }
        first
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_closed()
    }

    /// Resolves once both loops have exited, whether because of
    /// [`close`](Self::close) or on their own.
    pub async fn closed(&self) {
        self.shutdown.closed().await
    }

    /// A handle that can close this connection from another task.
    pub fn close_handle(&self) -> CloseHandle {
        self.shutdown.clone()
    }
}

impl Drop for EventConn {
    fn drop(&mut self) {
        self.close();
    }
}
