//! Controller connector

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use tl_core::config::{BackoffConfig, NodeConfig};
use tl_core::{Channel, TransportError, TransportKind};
use tl_protocol::ANNOUNCE_LINE;

use super::reconnect::Backoff;

/// Connection errors
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Shutdown was requested while connecting
    #[error("Connection attempt cancelled")]
    Cancelled,

    /// The transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Dials the controller
#[derive(Debug, Clone)]
pub struct Connector {
    kind: TransportKind,
    address: String,
    connect_timeout: Duration,
    backoff: BackoffConfig,
}

impl Connector {
    pub fn new(kind: TransportKind, address: impl Into<String>) -> Self {
        Self {
            kind,
            address: address.into(),
            connect_timeout: tl_core::channel::DEFAULT_CONNECT_TIMEOUT,
            backoff: BackoffConfig::default(),
        }
    }

    pub fn from_config(config: &NodeConfig) -> Self {
        Self {
            kind: config.transport,
            address: config.server_address(),
            connect_timeout: config.connect_timeout,
            backoff: config.backoff.clone(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Keep trying until connected or cancelled
    pub async fn connect_with_retry(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Channel, ConnectionError> {
        let mut backoff = Backoff::from_config(&self.backoff);

        loop {
            let attempt = tokio::select! {
                _ = cancel.cancelled() => return Err(ConnectionError::Cancelled),
                attempt = self.try_connect() => attempt,
            };

            match attempt {
                Ok(channel) => return Ok(channel),
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::warn!("Connection failed: {}. Retrying in {:?}", e, delay);

                    tokio::select! {
                        _ = cancel.cancelled() => return Err(ConnectionError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// One connection attempt.
    ///
    /// Over UDP nothing is really connected, so an announce line is sent to
    /// let the controller learn the node's address.
    pub async fn try_connect(&self) -> Result<Channel, ConnectionError> {
        let mut channel = Channel::client(self.kind).with_connect_timeout(self.connect_timeout);
        let remote = channel.start(&self.address).await?;

        if self.kind == TransportKind::Datagram {
            channel.send_lines(&[ANNOUNCE_LINE.to_string()]).await?;
        }

        tracing::info!("Connected to controller at {} ({})", remote, self.kind);
        Ok(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_stops_retrying() {
        // Nothing listens on this port once the listener is dropped
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connector = Connector::new(TransportKind::Stream, addr.to_string())
            .with_backoff(BackoffConfig::fixed(Duration::from_millis(20)));
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            connector.connect_with_retry(&cancel),
        )
        .await
        .unwrap();
        assert!(matches!(result, Err(ConnectionError::Cancelled)));
    }

    #[tokio::test]
    async fn test_retries_until_controller_appears() {
        let spare = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = spare.local_addr().unwrap();
        drop(spare);

        let connector = Connector::new(TransportKind::Stream, addr.to_string())
            .with_backoff(BackoffConfig::fixed(Duration::from_millis(20)));
        let cancel = CancellationToken::new();

        let controller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
            listener.accept().await.unwrap()
        });

        let channel = tokio::time::timeout(
            Duration::from_secs(5),
            connector.connect_with_retry(&cancel),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(channel.peer_addr(), Some(addr));

        controller.await.unwrap();
    }
}
