//! Construction-time configuration for [`EventConn`](crate::EventConn).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::Error;

/// Default read buffer capacity: a TCP MSS on a typical 1500 byte path MTU
/// with some room for tunnel and option overhead.
pub const DEFAULT_READ_BUFFER_CAPACITY: usize = 1440;

/// Largest accepted read buffer capacity. Each read allocates a buffer of
/// this size up front, so larger values are rejected by [`ConnConfig::validate`].
pub const MAX_READ_BUFFER_CAPACITY: usize = 16 * 1024 * 1024;

/// Default interval after which a read without data counts as an idle tick.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Configuration for an [`EventConn`](crate::EventConn)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnConfig {
    /// Size of a single read. A read that fills the buffer exactly is taken
    /// as a sign that more data follows, and is held back until a shorter
    /// read, an empty read or a read timeout.
    pub read_buffer_capacity: usize,
    /// How long one read may wait for data. On expiry, any held-back data is
    /// delivered.
    pub read_timeout: Duration,
    /// Items that can be queued for sending before `send` waits.
    pub outgoing_capacity: usize,
    /// Items the receive loop can hand off before it waits for the consumer.
    pub incoming_capacity: usize,
    /// Error reports that can be queued before the loops wait for the consumer.
    pub error_capacity: usize,
}

impl Default for ConnConfig {
    fn default() -> Self {
        Self {
            read_buffer_capacity: DEFAULT_READ_BUFFER_CAPACITY,
            read_timeout: DEFAULT_READ_TIMEOUT,
            outgoing_capacity: 10,
            incoming_capacity: 1,
            error_capacity: 10,
        }
    }
}

impl ConnConfig {
    /// Sets the size of a single read.
    pub fn with_read_buffer_capacity(mut self, capacity: usize) -> Self {
        self.read_buffer_capacity = capacity;
        self
    }

    /// Sets how long one read may wait for data.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the outgoing queue capacity.
    pub fn with_outgoing_capacity(mut self, capacity: usize) -> Self {
        self.outgoing_capacity = capacity;
        self
    }

    /// Sets the incoming queue capacity.
    pub fn with_incoming_capacity(mut self, capacity: usize) -> Self {
        self.incoming_capacity = capacity;
        self
    }

    /// Sets the error queue capacity.
    pub fn with_error_capacity(mut self, capacity: usize) -> Self {
        self.error_capacity = capacity;
        self
    }

    /// Checks every value is usable.
    ///
    /// Called by [`EventConn::with_config`](crate::EventConn::with_config) and
    /// the dial helpers before any task is spawned. Fails with
    /// [`Error::InvalidConfig`] for a zero value, a read buffer above
    /// [`MAX_READ_BUFFER_CAPACITY`] or a queue capacity tokio cannot allocate.
    pub fn validate(&self) -> Result<(), Error> {
        if self.read_buffer_capacity == 0 {
            return Err(Error::InvalidConfig("read_buffer_capacity must be > 0".into()));
        }
        if self.read_buffer_capacity > MAX_READ_BUFFER_CAPACITY {
            return Err(Error::InvalidConfig(format!(
                "read_buffer_capacity must be <= {MAX_READ_BUFFER_CAPACITY}"
            )));
        }
        if self.read_timeout.is_zero() {
            return Err(Error::InvalidConfig("read_timeout must be > 0".into()));
        }
        // tokio mpsc channels panic outside 1..=MAX_PERMITS
        for (name, value) in [
            ("outgoing_capacity", self.outgoing_capacity),
            ("incoming_capacity", self.incoming_capacity),
            ("error_capacity", self.error_capacity),
        ] {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{name} must be > 0")));
            }
            if value > Semaphore::MAX_PERMITS {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be <= {}",
                    Semaphore::MAX_PERMITS
                )));
            }
        }
        Ok(())
    }

    /// The read buffer capacity as a socket option value.
    pub(crate) fn socket_recv_buffer_size(&self) -> u32 {
        u32::try_from(self.read_buffer_capacity).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = ConnConfig::default();
        assert_eq!(config.read_buffer_capacity, 1440);
        assert_eq!(config.read_timeout, Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let bad = [
            ConnConfig::default().with_read_buffer_capacity(0),
            ConnConfig::default().with_read_buffer_capacity(MAX_READ_BUFFER_CAPACITY + 1),
            ConnConfig::default().with_read_buffer_capacity(usize::MAX),
            ConnConfig::default().with_outgoing_capacity(usize::MAX),
            ConnConfig::default().with_incoming_capacity(usize::MAX),
            ConnConfig::default().with_error_capacity(usize::MAX),
            ConnConfig::default().with_read_timeout(Duration::ZERO),
            ConnConfig::default().with_outgoing_capacity(0),
            ConnConfig::default().with_incoming_capacity(0),
            ConnConfig::default().with_error_capacity(0),
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))), "{config:?}");
        }
    }

    #[test]
    fn largest_read_buffer_is_accepted() {
        let config = ConnConfig::default().with_read_buffer_capacity(MAX_READ_BUFFER_CAPACITY);
        assert!(config.validate().is_ok());
        assert_eq!(config.socket_recv_buffer_size(), 16 * 1024 * 1024);
    }

    #[test]
    fn partial_document_fills_defaults() {
        let config: ConnConfig =
            serde_json::from_str(r#"{ "read_buffer_capacity": 512, "outgoing_capacity": 64 }"#)
                .unwrap();
        assert_eq!(config.read_buffer_capacity, 512);
        assert_eq!(config.outgoing_capacity, 64);
        assert_eq!(config.read_timeout, DEFAULT_READ_TIMEOUT);
        assert_eq!(config.error_capacity, 10);
    }

    #[test]
    fn socket_buffer_size_saturates() {
        let config = ConnConfig::default().with_read_buffer_capacity(usize::MAX);
        assert_eq!(config.socket_recv_buffer_size(), u32::MAX);
    }
}
