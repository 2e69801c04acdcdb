//! Session manager
//!
//! State machine driving one node:
//!
//! ```text
//! Idle --start--> Listening --accepted--> Connected
//!   ^                 ^                       |
//!   |                 +-----disconnected------+
//!   +------------------- stop (from anywhere)
//! ```
//!
//! A bind failure leaves the session idle. The poll tick runs while a TCP
//! node is connected, and for UDP from the moment the socket is bound.

use std::future;
use std::net::SocketAddr;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use tl_core::config::ControllerConfig;
use tl_core::{Channel, ConnectionState, Role, Transport, TransportEvent, TransportKind};
use tl_protocol::{parse_number, Command};

use super::handle::SessionOp;
use super::ticker::Ticker;
use crate::error::SessionError;
use crate::events::{SessionEvent, EVENT_CHANNEL_CAPACITY};
use crate::state::{SessionSnapshot, SessionState};

/// Owns the channel, the poll ticker and the session state
pub struct SessionManager {
    config: ControllerConfig,
    channel: Option<Channel>,
    state: SessionState,
    ticker: Ticker,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    pub fn new(config: ControllerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: SessionState::new(config.initial_threshold, config.history_len),
            ticker: Ticker::new(config.poll_interval),
            channel: None,
            config,
            events,
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<SessionEvent> {
        self.events.clone()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    pub fn is_polling(&self) -> bool {
        self.ticker.is_running()
    }

    /// Bind the configured endpoint for `kind` and start listening.
    ///
    /// A running session is stopped first. On failure the session is idle
    /// and a [`SessionEvent::BindFailed`] is published.
    pub async fn start(&mut self, kind: TransportKind) -> Result<SocketAddr, SessionError> {
        if self.state.connection().is_active() {
            self.stop();
        }

        let addr = self.config.bind_address(kind).to_string();
        let transport = Transport::with_max_line_length(kind, self.config.max_line_length);
        let mut channel = Channel::new(Role::Server, transport);

        let local = match channel.start_listening(&addr).await {
            Ok(local) => local,
            Err(e) => {
                tracing::error!("Failed to start {} on {}: {}", kind, addr, e);
                self.publish(SessionEvent::BindFailed {
                    transport: kind,
                    addr: addr.clone(),
                    reason: e.to_string(),
                });
                return Err(SessionError::Start {
                    kind,
                    addr,
                    source: e,
                });
            }
        };

        tracing::info!("Listening for a node on {} ({})", local, kind);
        self.channel = Some(channel);
        self.state.listening(kind, local);
        self.publish_state();

        if kind == TransportKind::Datagram {
            self.ticker.start();
        }

        Ok(local)
    }

    /// Close the transport and go idle
    pub fn stop(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.stop();
        }
        self.ticker.stop();

        if self.state.connection() != ConnectionState::Idle {
            tracing::info!("Session stopped");
            self.state.idle();
            self.publish_state();
        }
    }

    /// Change the threshold; it reaches the node on the next tick
    pub fn set_threshold(&mut self, value: f64) -> Result<bool, SessionError> {
        if !value.is_finite() {
            return Err(SessionError::InvalidThreshold(value));
        }
        if !self.state.threshold_mut().set(value) {
            return Ok(false);
        }

        tracing::info!("Threshold set to {:.1}", value);
        self.publish(SessionEvent::ThresholdChanged { value });
        Ok(true)
    }

    /// Wait for the next transport event; pends while nothing is bound
    pub async fn next_event(&mut self) -> TransportEvent {
        match self.channel.as_mut() {
            Some(channel) => channel.next_event().await,
            None => future::pending().await,
        }
    }

    /// One poll: push a pending threshold, otherwise ask for a reading
    pub async fn on_tick(&mut self) {
        let command = self.state.threshold().tick_command();
        self.send(command).await;
    }

    pub async fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Accepted(addr) => {
                self.state.connected(addr);
                self.publish_state();

                // Greet with the current threshold, whether or not it changed
                let greeting = self.state.threshold().greeting();
                self.send(greeting).await;

                if !self.ticker.is_running() {
                    self.ticker.start();
                }
            }
            TransportEvent::Rejected(addr) => {
                self.publish(SessionEvent::PeerRejected { addr });
            }
            TransportEvent::AcceptFailed(e) => {
                tracing::warn!("Accept failed: {}", e);
            }
            TransportEvent::Line { from, line } => match parse_number(&line) {
                Ok(value) => {
                    let sample = self.state.record(value);
                    tracing::debug!("Temperature from {}: {}", from, value);
                    self.publish(SessionEvent::SampleRecorded { sample });
                    self.publish(SessionEvent::TemperatureChanged { value });
                }
                Err(e) => {
                    tracing::debug!("Discarding line {:?} from {}: {}", line, from, e);
                }
            },
            TransportEvent::Disconnected(reason) => {
                match reason {
                    Some(reason) => tracing::info!("Node disconnected: {}", reason),
                    None => tracing::info!("Node disconnected"),
                }
                self.ticker.stop();

                let still_bound = self.channel.as_ref().is_some_and(|c| c.is_open());
                if still_bound {
                    self.state.peer_lost();
                    self.publish_state();
                } else {
                    self.stop();
                }
            }
        }
    }

    pub async fn handle_op(&mut self, op: SessionOp) {
        match op {
            SessionOp::Start { kind, reply } => {
                let result = self.start(kind).await;
                let _ = reply.send(result);
            }
            SessionOp::Stop => self.stop(),
            SessionOp::SetThreshold { value, reply } => {
                let _ = reply.send(self.set_threshold(value));
            }
            SessionOp::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    /// Reactor loop; returns when cancelled or every handle is gone
    pub async fn run(mut self, mut ops: mpsc::Receiver<SessionOp>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Session task shutting down");
                    break;
                }

                op = ops.recv() => match op {
                    Some(op) => self.handle_op(op).await,
                    None => {
                        tracing::debug!("All session handles dropped");
                        break;
                    }
                },

                event = next_channel_event(self.channel.as_mut()) => {
                    self.handle_event(event).await;
                }

                _ = self.ticker.tick() => {
                    self.on_tick().await;
                }
            }
        }

        self.stop();
    }

    async fn send(&mut self, command: Command) {
        let Some(channel) = self.channel.as_mut() else {
            return;
        };

        match channel.send_command(&command).await {
            Ok(delivery) if delivery.is_sent() => {
                if let Command::SetThreshold(_) = command {
                    self.state.threshold_mut().mark_sent();
                }
            }
            Ok(_) => tracing::trace!("No node to send {} to", command),
            Err(e) => tracing::warn!("Failed to send {}: {}", command, e),
        }
    }

    fn publish_state(&self) {
        self.publish(SessionEvent::StateChanged {
            state: self.state.connection(),
            peer: self.state.peer(),
        });
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

async fn next_channel_event(channel: Option<&mut Channel>) -> TransportEvent {
    match channel {
        Some(channel) => channel.next_event().await,
        None => future::pending().await,
    }
}
