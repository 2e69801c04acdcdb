//! Controller configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::duration_millis;
use crate::types::{TransportKind, DATAGRAM_PORT, STREAM_PORT};

/// Configuration for the controller daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Transport selected at startup
    pub transport: TransportKind,

    /// Address the TCP listener binds to
    pub stream_bind: String,

    /// Address the UDP socket binds to
    pub datagram_bind: String,

    /// Interval between polls of the node
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,

    /// Threshold in effect before the operator changes it
    pub initial_threshold: f64,

    /// Number of samples kept for presentation
    pub history_len: usize,

    /// Longest protocol line accepted from a node
    pub max_line_length: usize,

    /// Start listening immediately instead of waiting for the operator
    pub auto_start: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Stream,
            stream_bind: format!("0.0.0.0:{}", STREAM_PORT),
            datagram_bind: format!("0.0.0.0:{}", DATAGRAM_PORT),
            poll_interval: Duration::from_secs(1),
            initial_threshold: 50.0,
            history_len: 60,
            max_line_length: tl_protocol::MAX_LINE_LENGTH,
            auto_start: true,
        }
    }
}

impl ControllerConfig {
    /// Bind address for the given transport
    pub fn bind_address(&self, kind: TransportKind) -> &str {
        match kind {
            TransportKind::Stream => &self.stream_bind,
            TransportKind::Datagram => &self.datagram_bind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_defaults() {
        let config = ControllerConfig::default();

        assert_eq!(config.bind_address(TransportKind::Stream), "0.0.0.0:8080");
        assert_eq!(config.bind_address(TransportKind::Datagram), "0.0.0.0:8081");
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.initial_threshold, 50.0);
        assert_eq!(config.history_len, 60);
    }

    #[test]
    fn test_controller_partial_toml() {
        let config: ControllerConfig = toml::from_str(
            r#"
            transport = "udp"
            poll_interval = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.transport, TransportKind::Datagram);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        // Unspecified fields keep their defaults
        assert_eq!(config.stream_bind, "0.0.0.0:8080");
    }
}
