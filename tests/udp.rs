//! UDP loopback tests.

use std::time::Duration;

use bytes::Bytes;
use event_conn::udp::{dial_udp, dial_udp_with_config};
use event_conn::{dial, ConnConfig};
use tokio::net::UdpSocket;
use tokio::time::timeout;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn datagrams_both_ways() {
    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let conn = dial_udp(None, peer.local_addr().unwrap()).await.unwrap();

    conn.send("PING").await.unwrap();
    let mut buf = [0u8; 64];
    let (n, from) = timeout(TEST_TIMEOUT, peer.recv_from(&mut buf)).await.unwrap().unwrap();
    assert_eq!(&buf[..n], b"PING");

    peer.send_to(b"PONG", from).await.unwrap();
    let reply = timeout(TEST_TIMEOUT, conn.recv()).await.unwrap();
    assert_eq!(reply, Some(Bytes::from_static(b"PONG")));
}

#[tokio::test]
async fn explicit_local_address_is_used() {
    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let local = {
        let spare = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        spare.local_addr().unwrap()
    };
    let config = ConnConfig::default().with_read_buffer_capacity(2048);
    let conn = dial_udp_with_config(Some(local), peer.local_addr().unwrap(), config)
        .await
        .unwrap();

    conn.send("hi").await.unwrap();
    let mut buf = [0u8; 16];
    let (n, from) = timeout(TEST_TIMEOUT, peer.recv_from(&mut buf)).await.unwrap().unwrap();
    assert_eq!(&buf[..n], b"hi");
    assert_eq!(from, local);
}

#[tokio::test]
async fn dial_by_network_name() {
    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let conn = dial("udp4", &peer.local_addr().unwrap().to_string()).await.unwrap();

    conn.send("hello").await.unwrap();
    let mut buf = [0u8; 16];
    let (n, _) = timeout(TEST_TIMEOUT, peer.recv_from(&mut buf)).await.unwrap().unwrap();
    assert_eq!(&buf[..n], b"hello");
}
