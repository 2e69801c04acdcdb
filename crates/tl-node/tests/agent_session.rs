//! Node agent against a hand-driven controller socket

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, UdpSocket};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use tl_core::config::{BackoffConfig, NodeConfig};
use tl_core::TransportKind;
use tl_node::{Agent, FixedSource, LogicalIndicator};

fn node_config(kind: TransportKind, port: u16) -> NodeConfig {
    NodeConfig {
        server_ip: "127.0.0.1".to_string(),
        server_port: Some(port),
        transport: kind,
        reconnect: false,
        backoff: BackoffConfig::fixed(Duration::from_millis(50)),
        connect_timeout: Duration::from_secs(2),
        announce_interval: Duration::from_millis(200),
        ..NodeConfig::default()
    }
}

#[tokio::test]
async fn test_stream_session_commands() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let agent = Agent::new(
        node_config(TransportKind::Stream, port),
        Box::new(FixedSource(42.0)),
        Box::new(LogicalIndicator),
    );
    let mut watcher = agent.watch();
    let cancel = CancellationToken::new();

    let node = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            let mut agent = agent;
            let result = agent.run(&cancel).await;
            (agent, result)
        }
    });

    let (stream, _) = timeout(Duration::from_secs(5), listener.accept())
        .await
        .unwrap()
        .unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut replies = BufReader::new(read_half).lines();

    // Noise is ignored, commands split across writes still parse
    write_half.write_all(b"hello\nset thres").await.unwrap();
    write_half.write_all(b"hold\n30.0\nget temp\n").await.unwrap();

    let reply = timeout(Duration::from_secs(5), replies.next_line())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.as_deref(), Some("42.0"));

    let state = *timeout(
        Duration::from_secs(5),
        watcher.wait_for(|state| state.indicator_on()),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(state.threshold(), 30.0);
    assert_eq!(state.temperature(), 42.0);

    // Closing the controller side ends the agent when reconnect is off
    drop(write_half);
    drop(replies);

    let (agent, result) = timeout(Duration::from_secs(5), node)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
    assert!(!agent.state().indicator_on());
}

#[tokio::test]
async fn test_cancel_while_connected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut config = node_config(TransportKind::Stream, port);
    config.reconnect = true;
    let mut agent = Agent::new(config, Box::new(FixedSource(80.0)), Box::new(LogicalIndicator));
    let mut watcher = agent.watch();
    let cancel = CancellationToken::new();

    let node = tokio::spawn({
        let cancel = cancel.clone();
        async move { agent.run(&cancel).await }
    });

    let (mut stream, _) = listener.accept().await.unwrap();
    stream.write_all(b"get temp\n").await.unwrap();
    timeout(
        Duration::from_secs(5),
        watcher.wait_for(|state| state.indicator_on()),
    )
    .await
    .unwrap()
    .unwrap();

    cancel.cancel();
    timeout(Duration::from_secs(5), node)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(!watcher.borrow().indicator_on());
}

#[tokio::test]
async fn test_datagram_announce_and_poll() {
    let controller = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = controller.local_addr().unwrap().port();

    let mut agent = Agent::new(
        node_config(TransportKind::Datagram, port),
        Box::new(FixedSource(21.5)),
        Box::new(LogicalIndicator),
    );
    let cancel = CancellationToken::new();
    let node = tokio::spawn({
        let cancel = cancel.clone();
        async move { agent.run(&cancel).await }
    });

    // The node speaks first so the controller learns its address
    let mut buf = [0u8; 64];
    let (len, node_addr) = timeout(Duration::from_secs(5), controller.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..len], b"\n");

    controller.send_to(b"get temp\n", node_addr).await.unwrap();

    // Skip any repeated announcements
    let reply = timeout(Duration::from_secs(5), async {
        loop {
            let (len, _) = controller.recv_from(&mut buf).await.unwrap();
            let text = String::from_utf8_lossy(&buf[..len]).trim().to_string();
            if !text.is_empty() {
                break text;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(reply, "21.5");

    cancel.cancel();
    timeout(Duration::from_secs(5), node)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
