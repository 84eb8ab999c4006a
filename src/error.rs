//! Error types.
//!
//! Two kinds of failure exist in this crate:
//!
//! * [`ConnError`] is a *report*: something went wrong inside one of the
//!   background loops. Reports are never returned from a method call, they are
//!   delivered on the connection's error queue.
//! * [`Error`] is returned directly from API calls (dialing, sending on a
//!   closed connection, bad configuration, ...).

use std::fmt;
use std::io;

use thiserror::Error;

/// The loop a [`ConnError`] was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Send,
    Receive,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Send => f.write_str("send"),
            Phase::Receive => f.write_str("receive"),
        }
    }
}

/// A failure reported by the send or receive loop.
///
/// A `Receive` report is always the last thing the receive loop does. A `Send`
/// report only covers the one item that failed to be written.
#[derive(Debug, Error)]
pub enum ConnError {
    #[error("send failed: {0}")]
    Send(#[source] io::Error),
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
}

impl ConnError {
    /// Which loop produced the report.
    pub fn phase(&self) -> Phase {
        match self {
            ConnError::Send(_) => Phase::Send,
            ConnError::Receive(_) => Phase::Receive,
        }
    }

    /// The underlying transport error.
    pub fn io_error(&self) -> &io::Error {
        match self {
            ConnError::Send(e) | ConnError::Receive(e) => e,
        }
    }

    /// Consumes the report, returning the transport error.
    pub fn into_io_error(self) -> io::Error {
        match self {
            ConnError::Send(e) | ConnError::Receive(e) => e,
        }
    }
}

/// Errors returned by the public API.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The queue backing this operation has been shut down, either because
    /// the connection was closed or because its loop terminated.
    #[error("connection closed")]
    Closed,

    #[error("outgoing queue is full")]
    Full,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown network {0:?}")]
    InvalidNetwork(String),

    #[error("no usable address for {0}")]
    NoAddress(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_exposes_phase_and_source() {
        let err = ConnError::Receive(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert_eq!(err.phase(), Phase::Receive);
        assert_eq!(err.io_error().kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(err.to_string(), "receive failed: reset");

        let err = ConnError::Send(io::ErrorKind::BrokenPipe.into());
        assert_eq!(err.phase(), Phase::Send);
        assert_eq!(err.into_io_error().kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn io_errors_convert() {
        let err: Error = io::Error::from(io::ErrorKind::AddrInUse).into();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::AddrInUse));
    }
}
