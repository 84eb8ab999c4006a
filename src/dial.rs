//! Generic dialing by network name, in the style of `"tcp"` / `"udp4"`.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use tokio::net::{lookup_host, TcpStream};
use tracing::{debug, info};

use crate::config::ConnConfig;
use crate::conn::EventConn;
use crate::error::Error;
use crate::udp::{self, DatagramStream};

/// Transport and address family to dial with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Tcp,
    Tcp4,
    Tcp6,
    Udp,
    Udp4,
    Udp6,
}

impl Network {
    /// Whether this is a byte-stream (TCP) network.
    pub fn is_stream(self) -> bool {
        matches!(self, Network::Tcp | Network::Tcp4 | Network::Tcp6)
    }

    /// Whether `addr` belongs to the address family this network is limited to.
    pub fn accepts(self, addr: &SocketAddr) -> bool {
        match self {
            Network::Tcp | Network::Udp => true,
            Network::Tcp4 | Network::Udp4 => addr.is_ipv4(),
            Network::Tcp6 | Network::Udp6 => addr.is_ipv6(),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Network::Tcp => "tcp",
            Network::Tcp4 => "tcp4",
            Network::Tcp6 => "tcp6",
            Network::Udp => "udp",
            Network::Udp4 => "udp4",
            Network::Udp6 => "udp6",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Network::Tcp),
            "tcp4" => Ok(Network::Tcp4),
            "tcp6" => Ok(Network::Tcp6),
            "udp" => Ok(Network::Udp),
            "udp4" => Ok(Network::Udp4),
            "udp6" => Ok(Network::Udp6),
            _ => Err(Error::InvalidNetwork(s.to_string())),
        }
    }
}

/// Connects to `address` (`"host:port"`) over `network` and wraps the result
/// in an [`EventConn`].
///
/// All addresses `address` resolves to are tried in order, skipping those
/// of the wrong family. Socket options are left at their OS defaults; use
/// [`dial_tcp`](crate::tcp::dial_tcp) or [`dial_udp`](crate::udp::dial_udp)
/// to size the receive buffer.
pub async fn dial(network: &str, address: &str) -> Result<EventConn, Error> {
    dial_with_config(network, address, ConnConfig::default()).await
}

/// Like [`dial`], with an explicit configuration. The configuration is
/// validated before anything is resolved.
pub async fn dial_with_config(
    network: &str,
    address: &str,
    config: ConnConfig,
) -> Result<EventConn, Error> {
    let network: Network = network.parse()?;
    config.validate()?;

    let mut last_err = None;
    for addr in lookup_host(address).await?.filter(|addr| network.accepts(addr)) {
        match connect(network, addr, &config).await {
            Ok(conn) => {
                info!(%network, %addr, id = conn.id(), "dialed");
                return Ok(conn);
            }
            Err(e) => {
                debug!(%network, %addr, "dial attempt failed: {}", e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| Error::NoAddress(format!("{network} {address}"))))
}

async fn connect(network: Network, addr: SocketAddr, config: &ConnConfig) -> Result<EventConn, Error> {
    if network.is_stream() {
        let stream = TcpStream::connect(addr).await?;
        Ok(EventConn::spawn(stream, config.clone()))
    } else {
        let socket = udp::connect(addr).await?;
        Ok(EventConn::spawn(DatagramStream::new(socket), config.clone()))
    }
}
