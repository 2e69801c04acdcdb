//! Line transports
//!
//! A [`Transport`] moves protocol lines between the controller and a single
//! node. The stream variant keeps one TCP connection; the datagram variant
//! treats the most recent UDP sender as its peer. Both expose the same
//! operations so the layers above never look at raw sockets.
//!
//! The controller multiplexes accept and read through [`Transport::next_event`];
//! the node pulls lines with [`Transport::receive`].

mod datagram;
mod stream;

use std::net::SocketAddr;
use std::time::Duration;

use tl_protocol::MAX_LINE_LENGTH;

use crate::error::TransportError;
use crate::types::TransportKind;

pub use datagram::DatagramTransport;
pub use stream::StreamTransport;

/// Something the transport observed
#[derive(Debug)]
pub enum TransportEvent {
    /// A new peer was admitted
    Accepted(SocketAddr),
    /// A connection arrived while a peer was active and was closed
    Rejected(SocketAddr),
    /// Accepting an inbound connection failed; the listener stays open
    AcceptFailed(TransportError),
    /// One line from a peer
    Line { from: SocketAddr, line: String },
    /// The peer went away, with an optional reason
    Disconnected(Option<String>),
}

/// Outcome of a send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The lines were handed to the socket
    Sent,
    /// There was nobody to send to; nothing happened
    NoPeer,
}

impl Delivery {
    /// Whether the lines actually left through the socket
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// A line transport over TCP or UDP
#[derive(Debug)]
pub enum Transport {
    Stream(StreamTransport),
    Datagram(DatagramTransport),
}

impl Transport {
    /// Create an unbound transport of the given kind
    pub fn new(kind: TransportKind) -> Self {
        Self::with_max_line_length(kind, MAX_LINE_LENGTH)
    }

    /// Create an unbound transport with a custom line limit
    pub fn with_max_line_length(kind: TransportKind, max_line_length: usize) -> Self {
        match kind {
            TransportKind::Stream => Self::Stream(StreamTransport::new(max_line_length)),
            TransportKind::Datagram => Self::Datagram(DatagramTransport::new(max_line_length)),
        }
    }

    /// Which kind of transport this is
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Stream(_) => TransportKind::Stream,
            Self::Datagram(_) => TransportKind::Datagram,
        }
    }

    /// Bind the local endpoint and start waiting for a peer.
    ///
    /// Any previous listener, socket or peer is closed first.
    pub async fn bind_and_wait(&mut self, addr: &str) -> Result<SocketAddr, TransportError> {
        match self {
            Self::Stream(t) => t.bind_and_wait(addr).await,
            Self::Datagram(t) => t.bind_and_wait(addr).await,
        }
    }

    /// Accept one connection that is already waiting, without blocking.
    ///
    /// Datagram transports have nothing to accept and always return `None`.
    pub fn accept_pending(&mut self) -> Option<TransportEvent> {
        match self {
            Self::Stream(t) => t.accept_pending(),
            Self::Datagram(_) => None,
        }
    }

    /// Reach out to a server endpoint
    pub async fn connect(
        &mut self,
        addr: &str,
        timeout: Duration,
    ) -> Result<SocketAddr, TransportError> {
        match self {
            Self::Stream(t) => t.connect(addr, timeout).await,
            Self::Datagram(t) => t.connect(addr).await,
        }
    }

    /// Send lines to the current peer.
    ///
    /// With no peer this is a no-op reported as [`Delivery::NoPeer`].
    pub async fn send_lines(&mut self, lines: &[String]) -> Result<Delivery, TransportError> {
        if lines.is_empty() {
            return Ok(Delivery::Sent);
        }
        match self {
            Self::Stream(t) => t.send_lines(lines).await,
            Self::Datagram(t) => t.send_lines(lines).await,
        }
    }

    /// Next line from the peer.
    ///
    /// Returns `Ok(None)` once the peer has gone away, or straight away when
    /// the transport is closed. Timeouts are left to the caller.
    pub async fn receive(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            if !self.is_open() {
                return Ok(None);
            }
            match self.next_event().await {
                TransportEvent::Line { line, .. } => return Ok(Some(line)),
                TransportEvent::Disconnected(reason) => {
                    if let Some(reason) = reason {
                        tracing::debug!("Peer disconnected: {}", reason);
                    }
                    return Ok(None);
                }
                TransportEvent::AcceptFailed(e) => return Err(e),
                TransportEvent::Accepted(_) | TransportEvent::Rejected(_) => continue,
            }
        }
    }

    /// Wait for the next thing to happen on this transport.
    ///
    /// Pends forever while nothing is bound or connected, so it can sit in a
    /// `select!` next to other sources.
    pub async fn next_event(&mut self) -> TransportEvent {
        match self {
            Self::Stream(t) => t.next_event().await,
            Self::Datagram(t) => t.next_event().await,
        }
    }

    /// Local address of the bound socket
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            Self::Stream(t) => t.local_addr(),
            Self::Datagram(t) => t.local_addr(),
        }
    }

    /// Address of the current peer
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        match self {
            Self::Stream(t) => t.peer_addr(),
            Self::Datagram(t) => t.peer_addr(),
        }
    }

    /// Whether a peer is currently known
    pub fn has_peer(&self) -> bool {
        self.peer_addr().is_some()
    }

    /// Whether anything is bound or connected
    pub fn is_open(&self) -> bool {
        match self {
            Self::Stream(t) => t.is_open(),
            Self::Datagram(t) => t.is_open(),
        }
    }

    /// Forget the current peer but keep listening
    pub fn drop_peer(&mut self) {
        match self {
            Self::Stream(t) => t.drop_peer(),
            Self::Datagram(t) => t.drop_peer(),
        }
    }

    /// Close the listener or socket and the peer
    pub fn close(&mut self) {
        match self {
            Self::Stream(t) => t.close(),
            Self::Datagram(t) => t.close(),
        }
    }
}

/// Lines go out as one buffer: one write on a stream, one datagram on UDP
fn join_lines(lines: &[String]) -> String {
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_kind_matches_variant() {
        assert_eq!(Transport::new(TransportKind::Stream).kind(), TransportKind::Stream);
        assert_eq!(
            Transport::new(TransportKind::Datagram).kind(),
            TransportKind::Datagram
        );
    }

    #[test]
    fn test_unbound_transport_is_closed() {
        let mut transport = Transport::new(TransportKind::Stream);

        assert!(!transport.is_open());
        assert!(!transport.has_peer());
        assert!(transport.local_addr().is_none());
        assert!(transport.accept_pending().is_none());
    }

    #[test]
    fn test_join_lines() {
        let lines = vec!["set threshold".to_string(), "40.0".to_string()];
        assert_eq!(join_lines(&lines), "set threshold\n40.0");
    }

    #[tokio::test]
    async fn test_send_without_peer_is_noop() {
        let mut transport = Transport::new(TransportKind::Datagram);
        let delivery = transport.send_lines(&["get temp".to_string()]).await.unwrap();
        assert_eq!(delivery, Delivery::NoPeer);

        let mut transport = Transport::new(TransportKind::Stream);
        let delivery = transport.send_lines(&["get temp".to_string()]).await.unwrap();
        assert!(!delivery.is_sent());
    }

    #[tokio::test]
    async fn test_receive_on_closed_transport_returns_none() {
        let mut transport = Transport::new(TransportKind::Stream);
        assert!(transport.receive().await.unwrap().is_none());
    }
}
