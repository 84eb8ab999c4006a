//! UDP support: a stream adapter for connected sockets and the dial helpers.

mod datagram;
mod dial;

pub use datagram::DatagramStream;
pub use dial::{dial_udp, dial_udp_with_config};

pub(crate) use dial::connect;
