use std::net::SocketAddr;

use tokio::net::TcpSocket;
use tracing::info;

use crate::config::ConnConfig;
use crate::conn::EventConn;
use crate::error::Error;

/// Connects to `remote` over TCP and wraps the stream in an [`EventConn`]
/// with the default configuration.
///
/// The socket's receive buffer is set to the read buffer capacity before
/// connecting, optionally after binding to `local`.
pub async fn dial_tcp(local: Option<SocketAddr>, remote: SocketAddr) -> Result<EventConn, Error> {
    dial_tcp_with_config(local, remote, ConnConfig::default()).await
}

/// Like [`dial_tcp`], with an explicit configuration.
pub async fn dial_tcp_with_config(
    local: Option<SocketAddr>,
    remote: SocketAddr,
    config: ConnConfig,
) -> Result<EventConn, Error> {
    config.validate()?;

    let socket = match remote {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    socket.set_recv_buffer_size(config.socket_recv_buffer_size())?;
    if let Some(local) = local {
        socket.bind(local)?;
    }
    let stream = socket.connect(remote).await?;

    info!(local = ?stream.local_addr().ok(), %remote, "tcp connection established");
    Ok(EventConn::spawn(stream, config))
}
