//! Controller session state
//!
//! Owned by the session task; everything else sees it through events or a
//! [`SessionSnapshot`].

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use tl_core::{ConnectionState, TemperatureSample, TransportKind};

use crate::session::{SampleHistory, ThresholdState};

/// Mutable state of one controller session
#[derive(Debug)]
pub struct SessionState {
    connection: ConnectionState,
    transport: Option<TransportKind>,
    local_addr: Option<SocketAddr>,
    peer: Option<SocketAddr>,
    temperature: Option<f64>,
    threshold: ThresholdState,
    history: SampleHistory,
}

impl SessionState {
    pub fn new(threshold: f64, history_len: usize) -> Self {
        Self {
            connection: ConnectionState::Idle,
            transport: None,
            local_addr: None,
            peer: None,
            temperature: None,
            threshold: ThresholdState::new(threshold),
            history: SampleHistory::new(history_len),
        }
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn transport(&self) -> Option<TransportKind> {
        self.transport
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Last accepted reading
    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    pub fn threshold(&self) -> &ThresholdState {
        &self.threshold
    }

    pub fn threshold_mut(&mut self) -> &mut ThresholdState {
        &mut self.threshold
    }

    pub fn history(&self) -> &SampleHistory {
        &self.history
    }

    /// Bound and waiting for a node
    pub fn listening(&mut self, kind: TransportKind, local_addr: SocketAddr) {
        self.connection = ConnectionState::Listening;
        self.transport = Some(kind);
        self.local_addr = Some(local_addr);
        self.peer = None;
    }

    /// A node was admitted
    pub fn connected(&mut self, peer: SocketAddr) {
        self.connection = ConnectionState::Connected;
        self.peer = Some(peer);
    }

    /// The node went away; the endpoint stays bound
    pub fn peer_lost(&mut self) {
        self.connection = ConnectionState::Listening;
        self.peer = None;
    }

    /// Nothing bound any more
    pub fn idle(&mut self) {
        self.connection = ConnectionState::Idle;
        self.transport = None;
        self.local_addr = None;
        self.peer = None;
    }

    /// Accept a reading into the current temperature and the history
    pub fn record(&mut self, value: f64) -> TemperatureSample {
        self.temperature = Some(value);
        self.history.record(value)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.connection,
            transport: self.transport,
            local_addr: self.local_addr,
            peer: self.peer,
            temperature: self.temperature,
            threshold: self.threshold.value(),
            threshold_pending: self.threshold.is_dirty(),
            samples: self.history.to_vec(),
        }
    }
}

/// Point-in-time copy of the session for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    pub transport: Option<TransportKind>,
    pub local_addr: Option<SocketAddr>,
    pub peer: Option<SocketAddr>,
    pub temperature: Option<f64>,
    pub threshold: f64,
    /// A threshold change has not reached the node yet
    pub threshold_pending: bool,
    /// Recent samples, oldest first
    pub samples: Vec<TemperatureSample>,
}
