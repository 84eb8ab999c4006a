use std::future::Future;
use std::net::SocketAddr;

use socket2::SockRef;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::ConnConfig;
use crate::conn::EventConn;
use crate::error::Error;

/// TCP listener handing out accepted connections as [`EventConn`]s
pub struct EventListener {
    listener: TcpListener,
    config: ConnConfig,
}

impl EventListener {
    /// Bind to the specified address
    pub async fn bind(addr: &str) -> Result<Self, Error> {
        Self::bind_with_config(addr, ConnConfig::default()).await
    }

    /// Bind with a configuration applied to every accepted connection
    pub async fn bind_with_config(addr: &str, config: ConnConfig) -> Result<Self, Error> {
        config.validate()?;
        let listener = TcpListener::bind(addr).await?;
        info!("event listener bound to {}", addr);

        Ok(Self { listener, config })
    }

    /// Get the local address this listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        self.listener.local_addr().map_err(Error::Io)
    }

    /// Accept the next connection. Its receive buffer is sized like the ones
    /// opened by [`dial_tcp`](crate::tcp::dial_tcp).
    pub async fn accept(&self) -> Result<(EventConn, SocketAddr), Error> {
        let (stream, peer) = self.listener.accept().await?;
        SockRef::from(&stream).set_recv_buffer_size(self.config.read_buffer_capacity)?;
        Ok((EventConn::spawn(stream, self.config.clone()), peer))
    }

    /// Accept connections forever, running `handler` on its own task for each
    pub async fn run<F, Fut>(self, handler: F) -> Result<(), Error>
    where
        F: Fn(EventConn, SocketAddr) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        info!("event listener starting...");

        loop {
            match self.accept().await {
                Ok((conn, peer)) => {
                    info!("New connection {} from {}", conn.id(), peer);

                    let handler = handler.clone();
                    tokio::spawn(async move {
                        handler(conn, peer).await;
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}
