//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Well-known TCP port the controller listens on
pub const STREAM_PORT: u16 = 8080;

/// Well-known UDP port the controller binds
pub const DATAGRAM_PORT: u16 = 8081;

/// Which transport carries the protocol lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransportKind {
    /// Connection-oriented TCP stream
    #[default]
    #[serde(rename = "tcp", alias = "stream")]
    Stream,
    /// Connectionless UDP datagrams
    #[serde(rename = "udp", alias = "datagram")]
    Datagram,
}

impl TransportKind {
    /// The well-known port for this transport
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Stream => STREAM_PORT,
            Self::Datagram => DATAGRAM_PORT,
        }
    }

    /// Short lowercase name (`tcp` / `udp`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stream => "tcp",
            Self::Datagram => "udp",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" | "stream" => Ok(Self::Stream),
            "udp" | "datagram" => Ok(Self::Datagram),
            other => Err(format!("unknown transport '{}' (expected tcp or udp)", other)),
        }
    }
}

/// Admission state of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Nothing bound
    #[default]
    Idle,
    /// Bound and waiting for a node
    Listening,
    /// A node is attached
    Connected,
}

impl ConnectionState {
    /// Whether a transport is bound (listening or connected)
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Listening => write!(f, "listening"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// One accepted temperature reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureSample {
    /// Monotonically increasing sample number
    pub index: u64,
    /// Temperature in degrees Celsius
    pub value: f64,
}

impl TemperatureSample {
    /// Create a new sample
    pub fn new(index: u64, value: f64) -> Self {
        Self { index, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_kind_parse() {
        assert_eq!("tcp".parse::<TransportKind>().unwrap(), TransportKind::Stream);
        assert_eq!("UDP".parse::<TransportKind>().unwrap(), TransportKind::Datagram);
        assert_eq!("datagram".parse::<TransportKind>().unwrap(), TransportKind::Datagram);
        assert!("sctp".parse::<TransportKind>().is_err());
    }

    #[test]
    fn test_transport_kind_ports() {
        assert_eq!(TransportKind::Stream.default_port(), 8080);
        assert_eq!(TransportKind::Datagram.default_port(), 8081);
    }

    #[test]
    fn test_transport_kind_serde() {
        let json = serde_json::to_string(&TransportKind::Datagram).unwrap();
        assert_eq!(json, r#""udp""#);

        let kind: TransportKind = serde_json::from_str(r#""stream""#).unwrap();
        assert_eq!(kind, TransportKind::Stream);
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Listening.to_string(), "listening");
        assert!(!ConnectionState::Idle.is_active());
        assert!(ConnectionState::Connected.is_active());
    }
}
