//! Node agent loop
//!
//! One sequential task: connect, then answer commands line by line until the
//! controller goes away or shutdown is requested. Every suspension point is
//! raced against the cancellation token.

use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use tl_core::config::NodeConfig;
use tl_core::{Channel, TransportError, TransportKind};
use tl_protocol::{format_reading, Command, CommandParser, Incoming, ANNOUNCE_LINE};

use crate::indicator::{Actuator, Indicator, LogicalIndicator};
use crate::link::{ConnectionError, Connector};
use crate::panel;
use crate::sensor::TemperatureSource;
use crate::state::NodeState;

/// Reply sent when the sensor gives an unusable reading
const INVALID_READING_REPLY: f64 = 0.0;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The controller closed the link or it failed
    Disconnected,
    /// Shutdown was requested
    Shutdown,
}

/// The node agent
pub struct Agent {
    config: NodeConfig,
    source: Box<dyn TemperatureSource>,
    actuator: Actuator,
    state: NodeState,
    parser: CommandParser,
    state_tx: watch::Sender<NodeState>,
    show_panel: bool,
}

impl Agent {
    pub fn new(
        config: NodeConfig,
        source: Box<dyn TemperatureSource>,
        indicator: Box<dyn Indicator>,
    ) -> Self {
        let state = NodeState::new();
        let (state_tx, _) = watch::channel(state);
        Self {
            config,
            source,
            actuator: Actuator::new(indicator),
            state,
            parser: CommandParser::new(),
            state_tx,
            show_panel: false,
        }
    }

    /// Print the LED status panel on every re-evaluation
    pub fn with_panel(mut self, show: bool) -> Self {
        self.show_panel = show;
        self
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    /// Follow state changes from another task
    pub fn watch(&self) -> watch::Receiver<NodeState> {
        self.state_tx.subscribe()
    }

    /// Connect, serve, and reconnect until shutdown.
    ///
    /// The indicator is forced off before returning.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<(), ConnectionError> {
        self.init_indicator().await;
        let connector = Connector::from_config(&self.config);

        let result = loop {
            tracing::info!("Connecting to controller at {}", connector.address());
            let mut channel = match connector.connect_with_retry(cancel).await {
                Ok(channel) => channel,
                Err(ConnectionError::Cancelled) => break Ok(()),
                Err(e) => break Err(e),
            };

            let end = self.run_session(&mut channel, cancel).await;
            channel.stop();

            match end {
                SessionEnd::Shutdown => break Ok(()),
                SessionEnd::Disconnected if !self.config.reconnect => {
                    tracing::info!("Controller gone and reconnect disabled");
                    break Ok(());
                }
                SessionEnd::Disconnected => tracing::info!("Controller gone, reconnecting..."),
            }
        };

        self.shutdown();
        result
    }

    /// Serve one connected session
    pub async fn run_session(
        &mut self,
        channel: &mut Channel,
        cancel: &CancellationToken,
    ) -> SessionEnd {
        self.parser.reset();
        let announce_every = match channel.kind() {
            TransportKind::Datagram => Some(self.config.announce_interval),
            TransportKind::Stream => None,
        };

        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => return SessionEnd::Shutdown,
                received = next_line(channel, announce_every) => received,
            };

            let line = match received {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::info!("Controller closed the connection");
                    return SessionEnd::Disconnected;
                }
                Err(e) => {
                    tracing::warn!("Link error: {}", e);
                    return SessionEnd::Disconnected;
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => return SessionEnd::Shutdown,
                _ = self.handle_line(channel, &line) => {}
            }
        }
    }

    /// Set up the indicator off the runtime threads; sysfs export blocks
    async fn init_indicator(&mut self) {
        let placeholder = Actuator::new(Box::new(LogicalIndicator));
        let mut actuator = std::mem::replace(&mut self.actuator, placeholder);

        match tokio::task::spawn_blocking(move || {
            actuator.init();
            actuator
        })
        .await
        {
            Ok(actuator) => self.actuator = actuator,
            Err(e) => tracing::warn!("Indicator setup did not finish: {}", e),
        }
    }

    async fn handle_line(&mut self, channel: &mut Channel, line: &str) {
        match self.parser.feed(line) {
            None => tracing::trace!("Waiting for threshold value"),
            Some(Incoming::Command(Command::SetThreshold(threshold))) => {
                tracing::info!("Threshold set to {:.1}", threshold);
                self.state.apply_threshold(threshold);
                self.refresh_indicator();
            }
            Some(Incoming::Command(Command::GetTemp)) => self.answer_poll(channel).await,
            Some(Incoming::InvalidThreshold(value)) => {
                tracing::warn!("Ignoring invalid threshold {:?}", value);
            }
            Some(Incoming::Unrecognized(other)) => {
                tracing::debug!("Ignoring unknown command {:?}", other);
            }
        }
    }

    async fn answer_poll(&mut self, channel: &mut Channel) {
        let reading = match self.source.read().await {
            Ok(temperature) => Some(temperature),
            Err(e) => {
                tracing::warn!("Sensor gave no usable reading: {}", e);
                None
            }
        };

        let reply = format_reading(reading.unwrap_or(INVALID_READING_REPLY));
        if let Err(e) = channel.send_lines(&[reply]).await {
            tracing::warn!("Failed to send reading: {}", e);
        }

        if let Some(temperature) = reading {
            self.state.apply_reading(temperature);
            self.refresh_indicator();
        }
    }

    fn refresh_indicator(&mut self) {
        self.actuator.set(self.state.indicator_on());
        self.state_tx.send_replace(self.state);

        if self.show_panel {
            println!("{}", panel::status_line(&self.state));
        }
    }

    fn shutdown(&mut self) {
        self.state.force_off();
        self.actuator.set(false);
        self.state_tx.send_replace(self.state);
        tracing::info!("Indicator off");
    }
}

/// Next line from the controller.
///
/// Over UDP the controller cannot tell that the node is there unless it
/// speaks, so the announce line is repeated while no command arrives.
async fn next_line(
    channel: &mut Channel,
    announce_every: Option<Duration>,
) -> Result<Option<String>, TransportError> {
    let Some(every) = announce_every else {
        return channel.receive().await;
    };

    loop {
        match tokio::time::timeout(every, channel.receive()).await {
            Ok(received) => return received,
            Err(_) => {
                tracing::debug!("No command for {:?}, announcing again", every);
                channel.send_lines(&[ANNOUNCE_LINE.to_string()]).await?;
            }
        }
    }
}
