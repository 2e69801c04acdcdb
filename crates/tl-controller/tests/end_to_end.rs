//! Controller and node agent talking over loopback

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use tl_controller::{SessionEvent, SessionHandle, SessionManager};
use tl_core::config::{BackoffConfig, ControllerConfig, NodeConfig};
use tl_core::{ConnectionState, TransportKind};
use tl_node::{Agent, FixedSource, LogicalIndicator, NodeState};

const WAIT: Duration = Duration::from_secs(5);

fn controller_config(bind: &str) -> ControllerConfig {
    ControllerConfig {
        stream_bind: bind.to_string(),
        datagram_bind: bind.to_string(),
        poll_interval: Duration::from_millis(50),
        ..ControllerConfig::default()
    }
}

fn node_config(kind: TransportKind, addr: SocketAddr) -> NodeConfig {
    NodeConfig {
        server_ip: addr.ip().to_string(),
        server_port: Some(addr.port()),
        transport: kind,
        backoff: BackoffConfig::fixed(Duration::from_millis(50)),
        connect_timeout: Duration::from_secs(1),
        announce_interval: Duration::from_millis(200),
        ..NodeConfig::default()
    }
}

/// Run a node reporting `temperature`; returns its state feed
fn spawn_node(
    config: NodeConfig,
    temperature: f64,
    cancel: &CancellationToken,
) -> (tokio::sync::watch::Receiver<NodeState>, JoinHandle<()>) {
    let mut agent = Agent::new(
        config,
        Box::new(FixedSource(temperature)),
        Box::new(LogicalIndicator),
    );
    let watcher = agent.watch();
    let cancel = cancel.clone();
    let task = tokio::spawn(async move {
        agent.run(&cancel).await.unwrap();
    });
    (watcher, task)
}

async fn wait_for_event(
    events: &mut broadcast::Receiver<SessionEvent>,
    pred: impl Fn(&SessionEvent) -> bool,
) -> SessionEvent {
    timeout(WAIT, async {
        loop {
            let event = events.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .unwrap()
}

async fn wait_for_state(
    watcher: &mut tokio::sync::watch::Receiver<NodeState>,
    pred: impl FnMut(&NodeState) -> bool,
) -> NodeState {
    *timeout(WAIT, watcher.wait_for(pred))
        .await
        .unwrap()
        .unwrap()
}

fn free_port() -> u16 {
    let spare = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    spare.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_stream_poll_and_threshold() {
    let cancel = CancellationToken::new();
    let manager = SessionManager::new(controller_config("127.0.0.1:0"));
    let (handle, session) = SessionHandle::spawn(manager, cancel.clone());
    let mut events = handle.subscribe();

    let addr = handle.start(TransportKind::Stream).await.unwrap();
    let (mut node, node_task) = spawn_node(node_config(TransportKind::Stream, addr), 42.0, &cancel);

    wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::StateChanged { state: ConnectionState::Connected, .. })
    })
    .await;
    wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::SampleRecorded { sample } if sample.value == 42.0)
    })
    .await;

    // Below the initial threshold of 50
    let state = wait_for_state(&mut node, |s| s.temperature() == 42.0).await;
    assert_eq!(state.threshold(), 50.0);
    assert!(!state.indicator_on());

    assert!(handle.set_threshold(40.0).await.unwrap());
    let state = wait_for_state(&mut node, |s| s.threshold() == 40.0 && s.indicator_on()).await;
    assert_eq!(state.temperature(), 42.0);

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, ConnectionState::Connected);
    assert_eq!(snapshot.temperature, Some(42.0));
    assert!(!snapshot.threshold_pending);

    cancel.cancel();
    timeout(WAIT, session).await.unwrap().unwrap();
    timeout(WAIT, node_task).await.unwrap().unwrap();
    assert!(!node.borrow().indicator_on());
}

#[tokio::test]
async fn test_datagram_round_trip() {
    let cancel = CancellationToken::new();
    let manager = SessionManager::new(controller_config("127.0.0.1:0"));
    let (handle, session) = SessionHandle::spawn(manager, cancel.clone());
    let mut events = handle.subscribe();

    let addr = handle.start(TransportKind::Datagram).await.unwrap();
    let (mut node, node_task) =
        spawn_node(node_config(TransportKind::Datagram, addr), 61.5, &cancel);

    wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::TemperatureChanged { value } if *value == 61.5)
    })
    .await;

    // 61.5 is above the initial threshold
    let state = wait_for_state(&mut node, |s| s.indicator_on()).await;
    assert_eq!(state.threshold(), 50.0);

    assert!(handle.set_threshold(70.0).await.unwrap());
    wait_for_state(&mut node, |s| s.threshold() == 70.0 && !s.indicator_on()).await;

    cancel.cancel();
    timeout(WAIT, session).await.unwrap().unwrap();
    timeout(WAIT, node_task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_restart_greets_with_current_threshold() {
    let bind = format!("127.0.0.1:{}", free_port());
    let cancel = CancellationToken::new();
    let manager = SessionManager::new(controller_config(&bind));
    let (handle, session) = SessionHandle::spawn(manager, cancel.clone());
    let mut events = handle.subscribe();

    let addr = handle.start(TransportKind::Stream).await.unwrap();
    let (mut node, node_task) = spawn_node(node_config(TransportKind::Stream, addr), 42.0, &cancel);
    wait_for_state(&mut node, |s| s.temperature() == 42.0).await;

    handle.stop().await.unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::StateChanged { state: ConnectionState::Idle, .. })
    })
    .await;

    // Changed while nobody is listening
    assert!(handle.set_threshold(47.0).await.unwrap());
    assert!(handle.snapshot().await.unwrap().threshold_pending);

    // The node keeps retrying and is greeted with the new value
    let again = handle.start(TransportKind::Stream).await.unwrap();
    assert_eq!(again, addr);
    let state = wait_for_state(&mut node, |s| s.threshold() == 47.0).await;
    assert!(!state.indicator_on());

    cancel.cancel();
    timeout(WAIT, session).await.unwrap().unwrap();
    timeout(WAIT, node_task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_second_node_is_rejected() {
    let cancel = CancellationToken::new();
    let manager = SessionManager::new(controller_config("127.0.0.1:0"));
    let (handle, session) = SessionHandle::spawn(manager, cancel.clone());
    let mut events = handle.subscribe();

    let addr = handle.start(TransportKind::Stream).await.unwrap();
    let (mut first, first_task) =
        spawn_node(node_config(TransportKind::Stream, addr), 30.0, &cancel);
    wait_for_state(&mut first, |s| s.temperature() == 30.0).await;

    let _intruder = tokio::net::TcpStream::connect(addr).await.unwrap();
    wait_for_event(&mut events, |e| matches!(e, SessionEvent::PeerRejected { .. })).await;

    // The admitted node is still the one being polled
    wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::SampleRecorded { sample } if sample.value == 30.0)
    })
    .await;
    assert_eq!(handle.snapshot().await.unwrap().state, ConnectionState::Connected);

    cancel.cancel();
    timeout(WAIT, session).await.unwrap().unwrap();
    timeout(WAIT, first_task).await.unwrap().unwrap();
}
