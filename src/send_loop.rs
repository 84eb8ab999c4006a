//! The send side of an [`EventConn`](crate::EventConn).

use std::io;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::ConnError;
use crate::shutdown::CloseHandle;

async fn write_item<W>(writer: &mut W, item: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(item).await?;
    writer.flush().await
}

/// Writes outgoing items in order until the connection is closed or every
/// sender is gone.
///
/// A failed write is reported and the loop moves on to the next item.
pub(crate) async fn run<W>(
    mut writer: W,
    mut outgoing: mpsc::Receiver<Bytes>,
    errors: mpsc::Sender<ConnError>,
    shutdown: CloseHandle,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let item = tokio::select! {
            biased;
            _ = shutdown.quit().cancelled() => break,
            item = outgoing.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        let written = tokio::select! {
            biased;
            _ = shutdown.quit().cancelled() => break,
            written = write_item(&mut writer, &item) => written,
        };

        match written {
            Ok(()) => debug!(len = item.len(), "sent"),
            Err(e) => {
                warn!(len = item.len(), "write failed: {}", e);
                if !shutdown.deliver(&errors, ConnError::Send(e)).await {
                    break;
                }
            }
        }
    }

    if !shutdown.is_closed() {
        // every sender is gone; let the peer see end of stream
        if let Err(e) = writer.shutdown().await {
            debug!("shutdown of write half failed: {}", e);
        }
    }
    debug!("send loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn write_failure_is_reported_and_sending_continues() {
        let writer = Builder::new()
            .write(b"one")
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"))
            .write(b"three")
            .build();
        let (tx, rx) = mpsc::channel(10);
        let (err_tx, mut errors) = mpsc::channel(10);
        let task = tokio::spawn(run(writer, rx, err_tx, CloseHandle::new()));

        for item in ["one", "two", "three"] {
            tx.send(Bytes::from(item)).await.unwrap();
        }
        drop(tx);
        task.await.unwrap();

        let err = errors.recv().await.unwrap();
        assert!(matches!(err, ConnError::Send(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
        assert!(errors.recv().await.is_none());
    }

    #[tokio::test]
    async fn items_are_written_in_order() {
        let (mut peer, local) = tokio::io::duplex(1024);
        let (tx, rx) = mpsc::channel(10);
        let (err_tx, _errors) = mpsc::channel(10);
        let task = tokio::spawn(run(local, rx, err_tx, CloseHandle::new()));

        for i in 0..20u8 {
            tx.send(Bytes::from(vec![i; 3])).await.unwrap();
        }
        drop(tx);
        task.await.unwrap();

        let mut written = Vec::new();
        peer.read_to_end(&mut written).await.unwrap();
        let expected: Vec<u8> = (0..20u8).flat_map(|i| [i; 3]).collect();
        assert_eq!(written, expected);
    }

    #[tokio::test]
    async fn close_stops_the_loop() {
        let (_peer, local) = tokio::io::duplex(16);
        let (_tx, rx) = mpsc::channel(10);
        let (err_tx, _errors) = mpsc::channel(10);
        let shutdown = CloseHandle::new();
        let task = tokio::spawn(run(local, rx, err_tx, shutdown.clone()));

        shutdown.close();
        task.await.unwrap();
    }
}
