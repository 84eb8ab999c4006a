use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::UdpSocket;
use tracing::trace;

/// A connected UDP socket seen as a byte stream.
///
/// Every read returns at most one datagram and every write sends one
/// datagram. A datagram larger than the read buffer is truncated by the OS,
/// so the buffer should be at least as large as the biggest datagram the peer
/// sends. Empty datagrams are skipped, which keeps a zero-length read free to
/// mean end of stream for the reader; for a datagram socket that never
/// happens.
#[derive(Debug)]
pub struct DatagramStream {
    socket: UdpSocket,
}

impl DatagramStream {
    /// Wraps a socket that has already been `connect`ed to its peer.
    pub fn new(socket: UdpSocket) -> Self {
        Self { socket }
    }

    /// Local address of the socket.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Address of the connected peer.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.socket.peer_addr()
    }

    /// The wrapped socket.
    pub fn get_ref(&self) -> &UdpSocket {
        &self.socket
    }

    /// Unwraps the socket.
    pub fn into_inner(self) -> UdpSocket {
        self.socket
    }
}

impl AsyncRead for DatagramStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }
        loop {
            let before = buf.filled().len();
            ready!(self.socket.poll_recv(cx, buf))?;
            if buf.filled().len() > before {
                return Poll::Ready(Ok(()));
            }
            trace!("skipping empty datagram");
        }
    }
}

impl AsyncWrite for DatagramStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.socket.poll_send(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
