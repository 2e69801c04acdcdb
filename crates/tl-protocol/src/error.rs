//! Protocol error types

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A line exceeded the configured maximum length
    #[error("Line too long: {length} bytes exceeds maximum of {max} bytes")]
    LineTooLong { length: usize, max: usize },

    /// A line that should carry a number did not parse as one
    #[error("Invalid number: {0:?}")]
    InvalidNumber(String),

    /// The number parsed but is NaN or infinite
    #[error("Non-finite number: {0}")]
    NonFinite(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
