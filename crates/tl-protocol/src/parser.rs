//! Node-side command parser
//!
//! Turns the controller's line stream back into [`Command`]s. The parser is a
//! small state machine: after the `set threshold` keyword, the very next line
//! is always consumed as the threshold value, whatever it contains.

use crate::command::{Command, GET_TEMP, SET_THRESHOLD};
use crate::number::parse_number;

/// Result of feeding one line to the parser
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// A complete command
    Command(Command),
    /// The value line after `set threshold` was not a number
    InvalidThreshold(String),
    /// A line that is not a known keyword
    Unrecognized(String),
}

/// Incremental parser for controller commands
#[derive(Debug, Default)]
pub struct CommandParser {
    /// Set after the `set threshold` keyword until the value line arrives
    awaiting_threshold: bool,
}

impl CommandParser {
    /// Create a new parser
    pub fn new() -> Self {
        Self {
            awaiting_threshold: false,
        }
    }

    /// Whether the next line will be taken as a threshold value
    pub fn is_awaiting_value(&self) -> bool {
        self.awaiting_threshold
    }

    /// Feed one line.
    ///
    /// Returns `None` when the line was a keyword that needs a follow-up line.
    pub fn feed(&mut self, line: &str) -> Option<Incoming> {
        if self.awaiting_threshold {
            self.awaiting_threshold = false;
            return Some(match parse_number(line) {
                Ok(value) => Incoming::Command(Command::SetThreshold(value)),
                Err(e) => {
                    tracing::trace!("Threshold value rejected: {}", e);
                    Incoming::InvalidThreshold(line.to_string())
                }
            });
        }

        match line.trim() {
            SET_THRESHOLD => {
                self.awaiting_threshold = true;
                None
            }
            GET_TEMP => Some(Incoming::Command(Command::GetTemp)),
            _ => Some(Incoming::Unrecognized(line.to_string())),
        }
    }

    /// Forget any half-received command (used when a session ends)
    pub fn reset(&mut self) {
        self.awaiting_threshold = false;
    }
}
