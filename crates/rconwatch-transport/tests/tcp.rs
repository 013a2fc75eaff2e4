//! Integration tests for the TCP connection.
//!
//! These spin up a real listener on a loopback port and verify that
//! bytes actually flow in both directions.

use rconwatch_transport::{Connection, TcpConnection, TransportError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

async fn listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = listener.local_addr().expect("should have addr").to_string();
    (listener, addr)
}

#[tokio::test]
async fn test_tcp_send_and_receive() {
    let (listener, addr) = listener().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("should accept");
        let mut buf = [0u8; 3];
        stream.read_exact(&mut buf).await.expect("should read");
        stream.write_all(b"pong").await.expect("should write");
        buf
    });

    let conn = TcpConnection::connect(&addr).await.expect("should connect");
    conn.send(&[0x02, 0x77, 0x00]).await.expect("should send");

    let reply = conn.recv().await.expect("should recv").expect("not closed");
    assert_eq!(reply, b"pong");
    assert_eq!(server.await.expect("server task"), [0x02, 0x77, 0x00]);
    assert_eq!(conn.peer_addr().to_string(), addr);
}

#[tokio::test]
async fn test_tcp_recv_returns_none_on_peer_close() {
    let (listener, addr) = listener().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("should accept");
        drop(stream);
    });

    let conn = TcpConnection::connect(&addr).await.expect("should connect");
    let chunk = conn.recv().await.expect("clean close is not an error");
    assert!(chunk.is_none());
    conn.close().await.expect("closing twice is harmless");
}

#[tokio::test]
async fn test_tcp_connect_refused() {
    // Bind then drop to get a port that is very likely closed.
    let (listener, addr) = listener().await;
    drop(listener);

    let err = TcpConnection::connect(&addr)
        .await
        .expect_err("nothing is listening");
    assert!(matches!(err, TransportError::ConnectFailed { .. }));
    assert!(err.to_string().contains(&addr));
}

#[tokio::test]
async fn test_tcp_connection_ids_are_unique() {
    let (listener, addr) = listener().await;
    tokio::spawn(async move {
        let _a = listener.accept().await;
        let _b = listener.accept().await;
    });

    let a = TcpConnection::connect(&addr).await.expect("first");
    let b = TcpConnection::connect(&addr).await.expect("second");
    assert_ne!(a.id(), b.id());
}
