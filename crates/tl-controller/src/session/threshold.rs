//! Operator threshold and its pending-send flag

use tl_protocol::Command;

/// The alarm threshold and whether the node still needs to hear about it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdState {
    value: f64,
    dirty: bool,
}

impl ThresholdState {
    /// Start with `value`, considered already known to any node
    pub fn new(value: f64) -> Self {
        Self {
            value,
            dirty: false,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Whether a changed value has not been handed to the transport yet
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Store a new value.
    ///
    /// Returns `false` and leaves the state alone when the value is unchanged
    /// or not finite.
    pub fn set(&mut self, value: f64) -> bool {
        if !value.is_finite() || value == self.value {
            return false;
        }
        self.value = value;
        self.dirty = true;
        true
    }

    /// The command a poll tick should send
    pub fn tick_command(&self) -> Command {
        if self.dirty {
            Command::SetThreshold(self.value)
        } else {
            Command::GetTemp
        }
    }

    /// The command sent to a freshly admitted node, dirty or not
    pub fn greeting(&self) -> Command {
        Command::SetThreshold(self.value)
    }

    /// Record that the current value went out through the transport
    pub fn mark_sent(&mut self) {
        self.dirty = false;
    }
}

impl Default for ThresholdState {
    fn default() -> Self {
        Self::new(50.0)
    }
}
