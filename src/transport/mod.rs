//! # Transport
//!
//! Point-to-point delivery and the inbound message stream.
//!
//! A [`Transport`] has three jobs:
//! - a listen/close lifecycle for accepting inbound messages on a port,
//! - exactly one inbound stream of raw items, claimed once via [`Transport::take_inbound`],
//! - a fire-and-forget [`Transport::send_to`] towards a resolved [`PeerAddr`].
//!
//! [`TcpTransport`] is the default implementation.

pub mod tcp;

pub use tcp::TcpTransport;

use crate::address::PeerAddr;
use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Errors surfaced by a transport implementation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("Transport is already listening on {0}")]
    AlreadyListening(SocketAddr),
    #[error("Transport is not listening")]
    NotListening,
    #[error("Failed to reach {target}: {source}")]
    Connect {
        target: PeerAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Binds `port` and starts accepting inbound messages. Returns the bound address.
    async fn listen(&self, port: u16) -> Result<SocketAddr, TransportError>;

    /// Stops accepting inbound messages.
    async fn close(&self) -> Result<(), TransportError>;

    /// The bound address while listening.
    fn local_addr(&self) -> Option<SocketAddr>;

    /// Claims the inbound stream. Only the first call returns `Some`.
    fn take_inbound(&self) -> Option<mpsc::Receiver<Bytes>>;

    /// Delivers `payload` to `target`.
    async fn send_to(&self, target: &PeerAddr, payload: Bytes) -> Result<(), TransportError>;
}
