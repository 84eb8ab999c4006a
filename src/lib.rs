//! # event-conn
//!
//! Turns a duplex byte-stream connection into three queues and a close
//! operation:
//!
//! * **Outgoing**: push byte buffers, a background task writes them in order
//! * **Incoming**: pull byte buffers as a background task reads them
//! * **Errors**: read and write failures, reported instead of returned
//!
//! Anything that is `AsyncRead + AsyncWrite` can be wrapped: TCP streams,
//! connected UDP sockets (via [`udp::DatagramStream`]), in-memory pipes, TLS
//! streams, ...
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use event_conn::tcp::dial_tcp;
//!
//! # async fn example() -> Result<(), event_conn::Error> {
//! let conn = dial_tcp(None, "127.0.0.1:110".parse().unwrap()).await?;
//!
//! // Greeting from the server, however many reads it takes
//! let greeting = conn.recv_until(|buf| buf.ends_with(b"\r\n")).await?;
//! println!("{}", String::from_utf8_lossy(&greeting));
//!
//! conn.send("QUIT\r\n").await?;
//! conn.close();
//! # Ok(())
//! # }
//! ```
//!
//! ## How incoming data is chunked
//!
//! The receive loop reads into a buffer of
//! [`read_buffer_capacity`](ConnConfig::read_buffer_capacity) bytes (1440 by
//! default, about one TCP segment):
//!
//! | Read result                 | Effect                                         |
//! |-----------------------------|------------------------------------------------|
//! | buffer filled exactly       | held back, more of the same burst is expected  |
//! | shorter read                | delivered, together with anything held back    |
//! | timeout (500 ms by default) | anything held back is delivered                |
//! | end of stream               | anything held back is delivered, then reported |
//! | any other error             | reported, the receive loop stops               |
//!
//! Item boundaries therefore follow read timing, not the peer's write calls:
//! two quick writes may arrive as one item. There is no framing; use
//! [`EventConn::recv_until`] with a predicate that recognises a complete
//! message when one is needed.
//!
//! ## Errors
//!
//! Failures inside the loops are delivered on the error queue as
//! [`ConnError`]. A read failure is the receive loop's last act: the incoming
//! queue closes before the report is queued, so consumers of the incoming
//! queue are released even when nobody drains the errors. A write failure only concerns the item being
//! written; the send loop moves on to the next one.
//!
//! ## Closing
//!
//! [`EventConn::close`] (or dropping the connection) stops both loops, which
//! release the transport. It may be called any number of times.
//! [`EventConn::closed`] waits until both loops are gone.

pub mod config;
pub mod dial;
pub mod error;
pub mod tcp;
pub mod udp;

mod conn;
mod incoming;
mod outgoing;
mod recv_loop;
mod send_loop;
mod shutdown;

// Re-export main types for convenience
pub use config::{
    ConnConfig, DEFAULT_READ_BUFFER_CAPACITY, DEFAULT_READ_TIMEOUT, MAX_READ_BUFFER_CAPACITY,
};
pub use conn::EventConn;
pub use dial::{dial, dial_with_config, Network};
pub use error::{ConnError, Error, Phase};
pub use incoming::Incoming;
pub use outgoing::Outgoing;
pub use shutdown::CloseHandle;
