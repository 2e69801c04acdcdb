//! Events published by the session task
//!
//! Events go out on a broadcast channel. Nobody has to listen: with no
//! subscribers they are simply dropped.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use tl_core::{ConnectionState, TemperatureSample, TransportKind};

/// Capacity of the event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Something observers may want to show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new reading was accepted
    TemperatureChanged { value: f64 },

    /// The operator changed the threshold
    ThresholdChanged { value: f64 },

    /// Admission state changed
    StateChanged {
        state: ConnectionState,
        peer: Option<SocketAddr>,
    },

    /// A sample was appended to the history window
    SampleRecorded { sample: TemperatureSample },

    /// Binding the transport failed; the session stays idle
    BindFailed {
        transport: TransportKind,
        addr: String,
        reason: String,
    },

    /// A second node tried to connect and was turned away
    PeerRejected { addr: SocketAddr },
}
