//! Cloneable front end to the session task

use std::net::SocketAddr;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tl_core::TransportKind;

use super::manager::SessionManager;
use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::state::SessionSnapshot;

/// Capacity of the operator command queue
const OP_CHANNEL_CAPACITY: usize = 32;

/// Operator requests handled by the session task
#[derive(Debug)]
pub enum SessionOp {
    Start {
        kind: TransportKind,
        reply: oneshot::Sender<Result<SocketAddr, SessionError>>,
    },
    Stop,
    SetThreshold {
        value: f64,
        reply: oneshot::Sender<Result<bool, SessionError>>,
    },
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

/// Handle for driving a running [`SessionManager`]
#[derive(Clone)]
pub struct SessionHandle {
    ops: mpsc::Sender<SessionOp>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Move the manager onto its own task
    pub fn spawn(manager: SessionManager, cancel: CancellationToken) -> (Self, JoinHandle<()>) {
        let (ops, ops_rx) = mpsc::channel(OP_CHANNEL_CAPACITY);
        let events = manager.event_sender();
        let task = tokio::spawn(manager.run(ops_rx, cancel));
        (Self { ops, events }, task)
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Bind `kind` and start listening; returns the bound address
    pub async fn start(&self, kind: TransportKind) -> Result<SocketAddr, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.request(SessionOp::Start { kind, reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    pub async fn stop(&self) -> Result<(), SessionError> {
        self.request(SessionOp::Stop).await
    }

    /// Change the threshold; `Ok(false)` when it was already set
    pub async fn set_threshold(&self, value: f64) -> Result<bool, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.request(SessionOp::SetThreshold { value, reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.request(SessionOp::Snapshot(reply)).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    async fn request(&self, op: SessionOp) -> Result<(), SessionError> {
        self.ops.send(op).await.map_err(|_| SessionError::Closed)
    }
}
