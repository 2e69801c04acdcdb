//! Command types for the thermo-link protocol
//!
//! Commands flow from the controller to the node. Each command is written as
//! one or more text lines:
//!
//! ```text
//! set threshold      <- keyword line
//! 50.0               <- value line, one fractional digit
//!
//! get temp           <- keyword line only
//! ```
//!
//! The node answers `get temp` with a single line holding the temperature.
//! Nothing is sent in reply to `set threshold`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::number::format_threshold;

/// Keyword line introducing a threshold update
pub const SET_THRESHOLD: &str = "set threshold";

/// Keyword line requesting a temperature reading
pub const GET_TEMP: &str = "get temp";

/// Line a datagram node sends so the controller learns its address.
///
/// It is empty, so a controller that does not understand it simply drops it
/// as a malformed reading.
pub const ANNOUNCE_LINE: &str = "";

/// Protocol commands (controller to node)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "snake_case")]
pub enum Command {
    /// Push a new alarm threshold in degrees Celsius
    SetThreshold(f64),
    /// Ask the node for its current temperature
    GetTemp,
}

impl Command {
    /// The keyword line that starts this command
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::SetThreshold(_) => SET_THRESHOLD,
            Self::GetTemp => GET_TEMP,
        }
    }

    /// Encode the command as the sequence of lines written to the wire
    pub fn to_lines(&self) -> Vec<String> {
        match self {
            Self::SetThreshold(value) => {
                vec![SET_THRESHOLD.to_string(), format_threshold(*value)]
            }
            Self::GetTemp => vec![GET_TEMP.to_string()],
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetThreshold(value) => write!(f, "{} {}", SET_THRESHOLD, format_threshold(*value)),
            Self::GetTemp => f.write_str(GET_TEMP),
        }
    }
}
