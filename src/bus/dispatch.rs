//! # Dispatch
//!
//! The listener task and the per-message routing logic.
//!
//! ## Concurrency Model
//! A single listener reads the inbound stream and spawns one task per item, so a slow
//! cache or transport call only stalls its own message. Nothing orders two dispatches
//! against each other: a register and a deregister for the same id race at the cache and
//! the last write wins.
//!
//! ## Draining
//! When the bus is shut down the listener closes the inbound stream, keeps dispatching
//! whatever was already buffered, then waits for every in-flight dispatch before exiting.

use super::{BusError, Route};
use crate::address::PeerAddr;
use crate::cache::AddressCache;
use crate::codec::Codec;
use crate::command::Command;
use crate::logger::{BusEvent, BusLogger};
use crate::transport::Transport;
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

/// Collaborators shared by the bus handle, the listener, and every dispatch task.
pub(crate) struct Shared {
    pub(crate) cache: Arc<dyn AddressCache>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) codec: Arc<dyn Codec>,
    pub(crate) logger: Arc<dyn BusLogger>,
}

impl Shared {
    /// Decodes, classifies, and routes one raw inbound item.
    pub(crate) async fn handle(&self, raw: Bytes) {
        let command = Command::classify(self.codec.decode(&raw).await);
        let name = command.name();

        match self.route(command).await {
            Ok(route) => debug!(command = name, ?route, "Routed"),
            Err(e) => self.logger.log(BusEvent::DispatchFailed {
                command: name,
                error: e.to_string(),
            }),
        }
    }

    pub(crate) async fn route(&self, command: Command) -> Result<Route, BusError> {
        match command {
            Command::Register { actor_id, address }
            | Command::UpdateAddress { actor_id, address } => {
                self.cache.upsert(&actor_id, &address).await?;
                Ok(Route::CacheMutated)
            }
            Command::Deregister { actor_id } => {
                self.cache.remove(&actor_id).await?;
                Ok(Route::CacheMutated)
            }
            Command::TestGet { actor_id } => {
                let address = self.cache.lookup(&actor_id).await?;
                self.logger.log(BusEvent::CacheEntry { actor_id, address });
                Ok(Route::CacheQueried)
            }
            Command::Passthrough(message) => {
                let null = Value::Null;
                let action = message.action.as_ref().unwrap_or(&null);
                self.deliver(action, message.receiver_id()).await
            }
            Command::Undecodable(message) => {
                self.logger.log(BusEvent::DecodeFailed {
                    original_error: message.original_error(),
                });
                Ok(Route::Dropped)
            }
            Command::Malformed { kind, reason } => {
                self.logger.log(BusEvent::MalformedCommand { kind, reason });
                Ok(Route::Dropped)
            }
        }
    }

    /// Encode, resolve, forward. Every way of not forwarding is logged once and reported
    /// as [`Route::Dropped`]; only cache failures are returned as errors.
    pub(crate) async fn deliver(
        &self,
        value: &Value,
        actor_id: Option<&str>,
    ) -> Result<Route, BusError> {
        let payload = match self.codec.encode(value).await {
            Ok(payload) => payload,
            Err(sentinel) => {
                self.logger.log(BusEvent::EncodeFailed {
                    original_error: sentinel.original_error(),
                });
                return Ok(Route::Dropped);
            }
        };

        let actor_id = match actor_id {
            Some(actor_id) => actor_id,
            None => {
                self.logger.log(BusEvent::NoAddress { actor_id: None });
                return Ok(Route::Dropped);
            }
        };

        let address = match self.cache.lookup(actor_id).await? {
            Some(address) if !address.is_empty() => address,
            _ => {
                self.logger.log(BusEvent::NoAddress {
                    actor_id: Some(actor_id.to_string()),
                });
                return Ok(Route::Dropped);
            }
        };

        let target = match address.parse::<PeerAddr>() {
            Ok(target) => target,
            Err(error) => {
                self.logger.log(BusEvent::BadAddress {
                    actor_id: actor_id.to_string(),
                    error,
                });
                return Ok(Route::Dropped);
            }
        };

        if let Err(e) = self.transport.send_to(&target, payload).await {
            self.logger.log(BusEvent::DeliveryFailed {
                actor_id: actor_id.to_string(),
                error: e.to_string(),
            });
            return Ok(Route::Dropped);
        }

        debug!(%actor_id, %target, "Forwarded");
        Ok(Route::Forwarded)
    }
}

/// The single listener registered on the transport's inbound stream.
pub(crate) async fn listen_loop(
    shared: Arc<Shared>,
    mut inbound: mpsc::Receiver<Bytes>,
    mut shutdown: oneshot::Receiver<()>,
) {
    info!("Bus listener started");
    let mut dispatches = JoinSet::new();
    let mut draining = false;

    loop {
        tokio::select! {
            raw = inbound.recv() => match raw {
                Some(raw) => {
                    let shared = shared.clone();
                    dispatches.spawn(async move {
                        shared.handle(raw).await;
                    });
                    while let Some(finished) = dispatches.try_join_next() {
                        reap(finished);
                    }
                }
                None => break,
            },
            // Fires on an explicit shutdown and when the bus handle is dropped.
            _ = &mut shutdown, if !draining => {
                debug!("Draining inbound stream");
                draining = true;
                inbound.close();
            }
        }
    }

    while let Some(finished) = dispatches.join_next().await {
        reap(finished);
    }
    info!("Bus listener stopped");
}

fn reap(finished: Result<(), JoinError>) {
    if let Err(e) = finished {
        warn!(error = %e, "Dispatch task failed");
    }
}
