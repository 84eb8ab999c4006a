use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::info;

use crate::config::ConnConfig;
use crate::conn::EventConn;
use crate::error::Error;
use crate::udp::DatagramStream;

fn unspecified_for(remote: &SocketAddr) -> SocketAddr {
    match remote {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    }
}

/// Opens a UDP socket connected to `remote`, with the OS receive buffer sized
/// to the read buffer capacity.
pub(crate) fn connect_sized(
    local: Option<SocketAddr>,
    remote: SocketAddr,
    config: &ConnConfig,
) -> Result<UdpSocket, Error> {
    let socket = Socket::new(Domain::for_address(remote), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_recv_buffer_size(config.read_buffer_capacity)?;
    let local = local.unwrap_or_else(|| unspecified_for(&remote));
    socket.bind(&local.into())?;
    socket.connect(&remote.into())?;
    socket.set_nonblocking(true)?;
    Ok(UdpSocket::from_std(socket.into())?)
}

/// Plain connected UDP socket on an ephemeral local port.
pub(crate) async fn connect(remote: SocketAddr) -> Result<UdpSocket, Error> {
    let socket = UdpSocket::bind(unspecified_for(&remote)).await?;
    socket.connect(remote).await?;
    Ok(socket)
}

/// Connects a UDP socket to `remote` and wraps it in an [`EventConn`] with the
/// default configuration.
///
/// The socket's receive buffer is set to the read buffer capacity. Without
/// `local`, the socket binds to an ephemeral port on the unspecified address
/// of `remote`'s family.
pub async fn dial_udp(local: Option<SocketAddr>, remote: SocketAddr) -> Result<EventConn, Error> {
    dial_udp_with_config(local, remote, ConnConfig::default()).await
}

/// Like [`dial_udp`], with an explicit configuration.
pub async fn dial_udp_with_config(
    local: Option<SocketAddr>,
    remote: SocketAddr,
    config: ConnConfig,
) -> Result<EventConn, Error> {
    config.validate()?;
    let socket = connect_sized(local, remote, &config)?;
    info!(local = ?socket.local_addr().ok(), %remote, "udp socket connected");
    Ok(EventConn::spawn(DatagramStream::new(socket), config))
}
