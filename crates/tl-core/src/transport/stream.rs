//! TCP stream transport

use std::future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use futures::{FutureExt, SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

use tl_protocol::{LineCodec, ProtocolError};

use super::{join_lines, Delivery, TransportEvent};
use crate::error::TransportError;

/// The one connected node
#[derive(Debug)]
struct StreamPeer {
    addr: SocketAddr,
    framed: Framed<TcpStream, LineCodec>,
}

/// What woke the reactor
enum Ready {
    Accept(io::Result<(TcpStream, SocketAddr)>),
    Read(Option<Result<String, ProtocolError>>),
}

/// TCP transport holding at most one connected peer
#[derive(Debug)]
pub struct StreamTransport {
    listener: Option<TcpListener>,
    peer: Option<StreamPeer>,
    max_line_length: usize,
}

impl StreamTransport {
    /// Create an unbound stream transport
    pub fn new(max_line_length: usize) -> Self {
        Self {
            listener: None,
            peer: None,
            max_line_length,
        }
    }

    pub async fn bind_and_wait(&mut self, addr: &str) -> Result<SocketAddr, TransportError> {
        self.close();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local = listener.local_addr()?;
        tracing::info!("TCP listener bound on {}", local);

        self.listener = Some(listener);
        Ok(local)
    }

    pub fn accept_pending(&mut self) -> Option<TransportEvent> {
        let accepted = self.listener.as_ref()?.accept().now_or_never()?;
        Some(self.on_accept(accepted))
    }

    pub async fn connect(
        &mut self,
        addr: &str,
        timeout: Duration,
    ) -> Result<SocketAddr, TransportError> {
        self.close();

        tracing::debug!("Connecting to {}", addr);
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| TransportError::ConnectTimeout {
                addr: addr.to_string(),
            })?
            .map_err(|source| TransportError::Connect {
                addr: addr.to_string(),
                source,
            })?;

        let remote = stream.peer_addr()?;
        self.attach(stream, remote);
        Ok(remote)
    }

    pub async fn send_lines(&mut self, lines: &[String]) -> Result<Delivery, TransportError> {
        let Some(peer) = self.peer.as_mut() else {
            return Ok(Delivery::NoPeer);
        };

        peer.framed.send(join_lines(lines)).await?;
        Ok(Delivery::Sent)
    }

    pub async fn next_event(&mut self) -> TransportEvent {
        let ready = tokio::select! {
            accepted = accept_from(self.listener.as_ref()) => Ready::Accept(accepted),
            read = read_from(self.peer.as_mut()) => Ready::Read(read),
        };

        match ready {
            Ready::Accept(accepted) => self.on_accept(accepted),
            Ready::Read(Some(Ok(line))) => {
                // A read only completes while a peer is attached
                let from = self.peer_addr().unwrap_or_else(unspecified);
                TransportEvent::Line { from, line }
            }
            Ready::Read(Some(Err(e))) => {
                tracing::warn!("Dropping peer after read error: {}", e);
                self.drop_peer();
                TransportEvent::Disconnected(Some(e.to_string()))
            }
            Ready::Read(None) => {
                if let Some(addr) = self.peer_addr() {
                    tracing::info!("Peer {} closed the connection", addr);
                }
                self.drop_peer();
                TransportEvent::Disconnected(None)
            }
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        match (&self.listener, &self.peer) {
            (Some(listener), _) => listener.local_addr().ok(),
            (None, Some(peer)) => peer.framed.get_ref().local_addr().ok(),
            (None, None) => None,
        }
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer.as_ref().map(|peer| peer.addr)
    }

    pub fn is_open(&self) -> bool {
        self.listener.is_some() || self.peer.is_some()
    }

    pub fn drop_peer(&mut self) {
        self.peer = None;
    }

    pub fn close(&mut self) {
        self.peer = None;
        self.listener = None;
    }

    fn on_accept(&mut self, accepted: io::Result<(TcpStream, SocketAddr)>) -> TransportEvent {
        match accepted {
            Ok((stream, addr)) => {
                if self.peer.is_some() {
                    tracing::warn!("Rejecting {}: a node is already connected", addr);
                    drop(stream);
                    return TransportEvent::Rejected(addr);
                }
                tracing::info!("Node connected from {}", addr);
                self.attach(stream, addr);
                TransportEvent::Accepted(addr)
            }
            Err(e) => {
                tracing::error!("Failed to accept connection: {}", e);
                TransportEvent::AcceptFailed(TransportError::Accept(e))
            }
        }
    }

    fn attach(&mut self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
        }
        self.peer = Some(StreamPeer {
            addr,
            framed: Framed::new(stream, LineCodec::with_max_length(self.max_line_length)),
        });
    }
}

async fn accept_from(listener: Option<&TcpListener>) -> io::Result<(TcpStream, SocketAddr)> {
    match listener {
        Some(listener) => listener.accept().await,
        None => future::pending().await,
    }
}

async fn read_from(peer: Option<&mut StreamPeer>) -> Option<Result<String, ProtocolError>> {
    match peer {
        Some(peer) => peer.framed.next().await,
        None => future::pending().await,
    }
}

fn unspecified() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 0))
}
