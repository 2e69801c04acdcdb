//! UDP datagram transport
//!
//! There is no connection to accept. When bound as a server the transport
//! remembers whoever sent the latest datagram and addresses replies there.
//! When connected as a client the peer is fixed to the server address.

use std::future;
use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use tokio::net::UdpSocket;
use tokio_util::udp::UdpFramed;

use tl_protocol::LineCodec;

use super::{join_lines, Delivery, TransportEvent};
use crate::error::TransportError;

/// UDP transport with last-sender peer tracking
#[derive(Debug)]
pub struct DatagramTransport {
    socket: Option<UdpFramed<LineCodec>>,
    peer: Option<SocketAddr>,
    /// Line held back while its sender is reported as a new peer
    pending: Option<(SocketAddr, String)>,
    /// Follow the most recent sender (server side)
    track_sender: bool,
    max_line_length: usize,
}

impl DatagramTransport {
    /// Create an unbound datagram transport
    pub fn new(max_line_length: usize) -> Self {
        Self {
            socket: None,
            peer: None,
            pending: None,
            track_sender: false,
            max_line_length,
        }
    }

    pub async fn bind_and_wait(&mut self, addr: &str) -> Result<SocketAddr, TransportError> {
        self.close();

        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local = socket.local_addr()?;
        tracing::info!("UDP socket bound on {}", local);

        self.socket = Some(self.framed(socket));
        self.track_sender = true;
        Ok(local)
    }

    pub async fn connect(&mut self, addr: &str) -> Result<SocketAddr, TransportError> {
        self.close();

        let remote = tokio::net::lookup_host(addr)
            .await
            .map_err(|e| TransportError::Resolve(format!("{}: {}", addr, e)))?
            .next()
            .ok_or_else(|| TransportError::Resolve(addr.to_string()))?;

        let local = if remote.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| TransportError::Bind {
                addr: local.to_string(),
                source,
            })?;
        tracing::debug!("UDP socket {} talking to {}", socket.local_addr()?, remote);

        self.socket = Some(self.framed(socket));
        self.peer = Some(remote);
        self.track_sender = false;
        Ok(remote)
    }

    pub async fn send_lines(&mut self, lines: &[String]) -> Result<Delivery, TransportError> {
        let (Some(socket), Some(peer)) = (self.socket.as_mut(), self.peer) else {
            return Ok(Delivery::NoPeer);
        };

        socket.send((join_lines(lines), peer)).await?;
        Ok(Delivery::Sent)
    }

    pub async fn next_event(&mut self) -> TransportEvent {
        if let Some((from, line)) = self.pending.take() {
            return TransportEvent::Line { from, line };
        }

        let Some(socket) = self.socket.as_mut() else {
            return future::pending().await;
        };

        loop {
            match socket.next().await {
                Some(Ok((line, from))) => {
                    if self.track_sender && self.peer != Some(from) {
                        match self.peer.replace(from) {
                            Some(previous) => {
                                tracing::info!("Node moved from {} to {}", previous, from)
                            }
                            None => tracing::info!("Node discovered at {}", from),
                        }
                        self.pending = Some((from, line));
                        return TransportEvent::Accepted(from);
                    }
                    return TransportEvent::Line { from, line };
                }
                Some(Err(e)) => {
                    // A bad datagram does not end anything
                    tracing::warn!("Discarding datagram: {}", e);
                }
                None => {
                    self.socket = None;
                    self.peer = None;
                    return TransportEvent::Disconnected(Some("socket closed".to_string()));
                }
            }
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket
            .as_ref()
            .and_then(|socket| socket.get_ref().local_addr().ok())
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    pub fn drop_peer(&mut self) {
        self.peer = None;
        self.pending = None;
    }

    pub fn close(&mut self) {
        self.socket = None;
        self.peer = None;
        self.pending = None;
        self.track_sender = false;
    }

    fn framed(&self, socket: UdpSocket) -> UdpFramed<LineCodec> {
        UdpFramed::new(socket, LineCodec::with_max_length(self.max_line_length))
    }
}
