//! # TCP Transport
//!
//! One message per connection: a sender connects, writes the encoded message, and shuts
//! its write half down. The accept loop reads each connection to EOF and pushes the bytes
//! onto the inbound stream.

use super::{Transport, TransportError};
use crate::address::PeerAddr;
use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Upper bound on a single inbound message.
pub const MAX_MESSAGE_BYTES: u64 = 16 * 1024 * 1024;

struct Listening {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub struct TcpTransport {
    inbound_tx: mpsc::Sender<Bytes>,
    inbound_rx: Mutex<Option<mpsc::Receiver<Bytes>>>,
    state: Mutex<Option<Listening>>,
}

impl TcpTransport {
    pub fn new(inbound_buffer: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(inbound_buffer);
        Self {
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            state: Mutex::new(None),
        }
    }

    fn listening_addr(&self) -> Option<SocketAddr> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(|listening| listening.addr)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn listen(&self, port: u16) -> Result<SocketAddr, TransportError> {
        if let Some(addr) = self.listening_addr() {
            return Err(TransportError::AlreadyListening(addr));
        }

        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|source| TransportError::Bind { port, source })?;
        let addr = listener.local_addr()?;

        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // A concurrent listen may have won the race while we were binding.
        if let Some(existing) = state.as_ref() {
            return Err(TransportError::AlreadyListening(existing.addr));
        }

        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(accept_loop(listener, self.inbound_tx.clone(), shutdown_rx));
        *state = Some(Listening {
            addr,
            shutdown,
            task,
        });

        info!(%addr, "TCP transport listening");
        Ok(addr)
    }

    async fn close(&self) -> Result<(), TransportError> {
        let listening = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
            .ok_or(TransportError::NotListening)?;

        let _ = listening.shutdown.send(());
        if let Err(e) = listening.task.await {
            warn!(error = %e, "Accept loop task failed");
        }
        info!(addr = %listening.addr, "TCP transport closed");
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.listening_addr()
    }

    fn take_inbound(&self) -> Option<mpsc::Receiver<Bytes>> {
        self.inbound_rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    async fn send_to(&self, target: &PeerAddr, payload: Bytes) -> Result<(), TransportError> {
        let mut stream = TcpStream::connect((target.host.as_str(), target.port))
            .await
            .map_err(|source| TransportError::Connect {
                target: target.clone(),
                source,
            })?;
        stream.write_all(&payload).await?;
        stream.shutdown().await?;
        debug!(%target, bytes = payload.len(), "Sent");
        Ok(())
    }
}

async fn accept_loop(
    listener: TcpListener,
    inbound: mpsc::Sender<Bytes>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(read_message(stream, peer, inbound.clone()));
                }
                Err(e) => warn!(error = %e, "Accept failed"),
            },
        }
    }
    debug!("Accept loop stopped");
}

async fn read_message(stream: TcpStream, peer: SocketAddr, inbound: mpsc::Sender<Bytes>) {
    match read_bounded(stream, MAX_MESSAGE_BYTES).await {
        Ok(Some(buf)) if buf.is_empty() => debug!(%peer, "Empty connection"),
        Ok(Some(buf)) => {
            debug!(%peer, bytes = buf.len(), "Received");
            if inbound.send(Bytes::from(buf)).await.is_err() {
                debug!(%peer, "Inbound stream closed, message dropped");
            }
        }
        Ok(None) => warn!(%peer, limit = MAX_MESSAGE_BYTES, "Message too large, dropped"),
        Err(e) => warn!(%peer, error = %e, "Read failed"),
    }
}

/// Reads `reader` to EOF. Yields `None` when it carries more than `limit` bytes.
async fn read_bounded<R>(reader: R, limit: u64) -> std::io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let len = reader.take(limit + 1).read_to_end(&mut buf).await?;
    if len as u64 > limit {
        return Ok(None);
    }
    Ok(Some(buf))
}
