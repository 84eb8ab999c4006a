use std::error::Error;
use std::net::SocketAddr;
use tracing::{info, warn};
use event_conn::{tcp::EventListener, EventConn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting echo server example...");

    // Bind to default port
    let listener = EventListener::bind("127.0.0.1:6969").await?;

    // Run the server with our handler
    listener.run(handle_conn).await?;

    Ok(())
}

/// Echo every incoming item back to the client
async fn handle_conn(mut conn: EventConn, peer: SocketAddr) {
    info!("Connection {}: client {} connected", conn.id(), peer);

    while let Some(item) = conn.recv().await {
        info!("Connection {}: echoing {} bytes", conn.id(), item.len());
        if conn.send(item).await.is_err() {
            break;
        }
    }

    while let Some(err) = conn.try_next_error() {
        warn!("Connection {}: {}", conn.id(), err);
    }
    info!("Connection {}: done", conn.id());
}
