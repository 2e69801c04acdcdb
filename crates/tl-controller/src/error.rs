//! Controller error types

use thiserror::Error;

use tl_core::{TransportError, TransportKind};

/// Errors surfaced by the session manager and its handle
#[derive(Error, Debug)]
pub enum SessionError {
    /// The transport could not be bound
    #[error("Failed to start {kind} on {addr}: {source}")]
    Start {
        kind: TransportKind,
        addr: String,
        #[source]
        source: TransportError,
    },

    /// Thresholds must be finite numbers
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(f64),

    /// The session task is no longer running
    #[error("Session task has stopped")]
    Closed,
}
