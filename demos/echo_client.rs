use std::error::Error;
use std::time::Duration;
use tracing::info;
use event_conn::tcp::dial_tcp;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting echo client example...");

    // Connect to the server
    let conn = dial_tcp(None, "127.0.0.1:6969".parse()?).await?;

    for line in ["Hello from event-conn!\n", "A second line\n"] {
        info!("Sending {:?}", line.trim_end());
        conn.send(line).await?;

        // Wait for the full line, however it was split on the way back
        let reply = tokio::time::timeout(
            Duration::from_secs(5),
            conn.recv_until(|buf| buf.ends_with(b"\n")),
        )
        .await??;
        info!("Server echoed: {}", String::from_utf8_lossy(&reply).trim_end());
    }

    // Close the connection and wait for both loops to finish
    info!("Closing connection...");
    conn.close();
    conn.closed().await;

    info!("Client example completed successfully!");
    Ok(())
}
