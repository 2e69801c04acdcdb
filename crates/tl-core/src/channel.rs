//! Role-aware wrapper around a [`Transport`]
//!
//! The controller owns a server channel and the node a client channel. Apart
//! from how they start, both forward the transport operations unchanged.

use std::net::SocketAddr;
use std::time::Duration;

use tl_protocol::Command;

use crate::error::TransportError;
use crate::transport::{Delivery, Transport, TransportEvent};
use crate::types::TransportKind;

/// Default time allowed for a client connection attempt
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Which side of the link a channel is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Binds and waits for a node (controller)
    Server,
    /// Dials the controller (node)
    Client,
}

/// A transport together with the role it plays
#[derive(Debug)]
pub struct Channel {
    role: Role,
    transport: Transport,
    connect_timeout: Duration,
}

impl Channel {
    /// Create a channel around an existing transport
    pub fn new(role: Role, transport: Transport) -> Self {
        Self {
            role,
            transport,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Server channel over a fresh transport of the given kind
    pub fn server(kind: TransportKind) -> Self {
        Self::new(Role::Server, Transport::new(kind))
    }

    /// Client channel over a fresh transport of the given kind
    pub fn client(kind: TransportKind) -> Self {
        Self::new(Role::Client, Transport::new(kind))
    }

    /// Set how long a client waits for a connection to complete
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Start the channel: bind for a server, connect for a client.
    ///
    /// Returns the local bound address for a server and the remote address
    /// for a client.
    pub async fn start(&mut self, addr: &str) -> Result<SocketAddr, TransportError> {
        match self.role {
            Role::Server => self.transport.bind_and_wait(addr).await,
            Role::Client => self.transport.connect(addr, self.connect_timeout).await,
        }
    }

    /// Bind a server channel; arrivals are then observed through
    /// [`Channel::next_event`]
    pub async fn start_listening(&mut self, addr: &str) -> Result<SocketAddr, TransportError> {
        if self.role != Role::Server {
            return Err(TransportError::NotServer);
        }
        self.transport.bind_and_wait(addr).await
    }

    /// Close the underlying transport
    pub fn stop(&mut self) {
        self.transport.close();
    }

    pub async fn send_lines(&mut self, lines: &[String]) -> Result<Delivery, TransportError> {
        self.transport.send_lines(lines).await
    }

    /// Encode and send one command
    pub async fn send_command(&mut self, command: &Command) -> Result<Delivery, TransportError> {
        tracing::trace!("-> {}", command);
        self.transport.send_lines(&command.to_lines()).await
    }

    pub async fn receive(&mut self) -> Result<Option<String>, TransportError> {
        self.transport.receive().await
    }

    pub async fn next_event(&mut self) -> TransportEvent {
        self.transport.next_event().await
    }

    pub fn accept_pending(&mut self) -> Option<TransportEvent> {
        self.transport.accept_pending()
    }

    pub fn drop_peer(&mut self) {
        self.transport.drop_peer();
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.transport.peer_addr()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.transport.local_addr()
    }

    pub fn has_peer(&self) -> bool {
        self.transport.has_peer()
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    pub fn kind(&self) -> TransportKind {
        self.transport.kind()
    }

    pub fn role(&self) -> Role {
        self.role
    }
}
