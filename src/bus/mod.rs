//! # Bus Controller
//!
//! The [`Bus`] maps actor ids to addresses and routes every inbound message.
//!
//! ## Inbound
//! Each raw item from the transport is decoded and classified into a
//! [`Command`](crate::command::Command):
//!
//! | command | effect |
//! |---|---|
//! | `REGISTER_ACTOR` / `UPDATE_ACTOR_ADDRESS` | `upsert(actor_id, actor_address)` |
//! | `DEREGISTER_ACTOR` | `remove(actor_id)` |
//! | `TEST_CACHE_GET` | `lookup(actor_id)`, result goes to the logger only |
//! | anything else | [`Bus::send`] of `action` to `receiver_id` |
//!
//! Decode sentinels and control messages missing their payload fields are logged and
//! dropped. No reply is ever sent back to the producer.
//!
//! ## Outbound
//! [`Bus::send`] encodes, resolves the id through the cache, strictly parses the
//! `host:port` address, and hands the bytes to the transport. Unknown recipients are
//! dropped with a single warning.
//!
//! ## Lifecycle
//! `stopped → listening → stopped`, driven by [`Bus::start`] and [`Bus::stop`]. Stopping only
//! closes the listening socket; buffered messages keep being dispatched until
//! [`Bus::shutdown`] drains the inbound stream.

mod builder;
mod dispatch;
mod error;

pub use builder::BusBuilder;
pub use error::BusError;

use dispatch::Shared;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::logger::BusEvent;

/// Port used when the configuration does not name one.
pub const DEFAULT_PORT: u16 = 5000;

/// Where a dispatched message ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    CacheMutated,
    CacheQueried,
    Forwarded,
    Dropped,
}

/// Handle to a running bus. Built with [`BusBuilder`].
///
/// Dropping the handle lets the listener drain and exit on its own; call
/// [`shutdown`](Bus::shutdown) to wait for that.
pub struct Bus {
    shared: Arc<Shared>,
    shutdown: oneshot::Sender<()>,
    listener: JoinHandle<()>,
}

impl Bus {
    pub fn builder() -> BusBuilder {
        BusBuilder::new()
    }

    /// Binds the transport to `port` and logs the bound address.
    pub async fn start(&self, port: u16) -> Result<SocketAddr, BusError> {
        let addr = self.shared.transport.listen(port).await?;
        self.shared.logger.log(BusEvent::Listening { addr });
        Ok(addr)
    }

    /// Closes the transport's listening socket.
    ///
    /// Messages already on the inbound stream are still dispatched.
    pub async fn stop(&self) -> Result<(), BusError> {
        self.shared.transport.close().await?;
        self.shared.logger.log(BusEvent::Stopped);
        Ok(())
    }

    /// The bound address while listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.shared.transport.local_addr()
    }

    /// Sends `message` to whatever address `actor_id` currently resolves to.
    ///
    /// Best effort: an unknown id, an unusable address, or a transport failure is logged
    /// and the message dropped. Nothing is reported back to the caller.
    ///
    /// The future resolves only after the transport call returns, which for TCP includes
    /// the connect. Callers that must not wait on an unreachable peer should
    /// `tokio::spawn` the send.
    pub async fn send(&self, message: &Value, actor_id: &str) {
        if let Err(e) = self.shared.deliver(message, Some(actor_id)).await {
            self.shared.logger.log(BusEvent::DeliveryFailed {
                actor_id: actor_id.to_string(),
                error: e.to_string(),
            });
        }
    }

    /// Stops listening if needed, drains the inbound stream, and waits for every
    /// in-flight dispatch to finish.
    pub async fn shutdown(self) -> Result<(), BusError> {
        if self.local_addr().is_some() {
            self.stop().await?;
        }
        let _ = self.shutdown.send(());
        self.listener.await?;
        Ok(())
    }
}
