//! Core error types for thermo-link

use std::path::PathBuf;

use thiserror::Error;
use tl_protocol::ProtocolError;

/// Transport-related errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// The local endpoint could not be bound (port in use, permission denied)
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Dialing the remote endpoint failed
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Dialing the remote endpoint did not finish in time
    #[error("Connection to {addr} timed out")]
    ConnectTimeout { addr: String },

    /// The address did not resolve to anything
    #[error("Could not resolve address: {0}")]
    Resolve(String),

    /// Accepting an inbound connection failed
    #[error("Failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    /// A server-only operation was invoked on a client channel
    #[error("Operation requires a server channel")]
    NotServer,

    /// Framing error on the line codec
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// A key carried a value that could not be interpreted
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
