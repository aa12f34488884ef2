//! # Cache Actor
//!
//! An [`AddressCache`] backed by a Tokio task that exclusively owns a `HashMap`.
//!
//! ## Concurrency Model
//! Requests arrive on an mpsc channel and are answered through oneshot channels. The
//! actor processes them one at a time, so each `lookup`/`upsert`/`remove` is atomic with
//! no `Mutex` around the map. Concurrent writers for the same id are applied in arrival
//! order, which gives last-write-wins semantics.
//!
//! ## Shutdown
//! The loop ends when every [`CacheHandle`] has been dropped.

use super::{AddressCache, CacheError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Type alias for the one-shot response channel used by the cache actor.
pub type Response<T> = oneshot::Sender<T>;

/// Requests served by [`CacheActor`].
#[derive(Debug)]
pub enum CacheRequest {
    Lookup {
        actor_id: String,
        respond_to: Response<Option<String>>,
    },
    Upsert {
        actor_id: String,
        address: String,
        respond_to: Response<()>,
    },
    Contains {
        actor_id: String,
        respond_to: Response<bool>,
    },
    Remove {
        actor_id: String,
        respond_to: Response<()>,
    },
}

/// The server half of the in-memory cache.
pub struct CacheActor {
    receiver: mpsc::Receiver<CacheRequest>,
    entries: HashMap<String, String>,
}

impl CacheActor {
    pub fn new(buffer_size: usize) -> (Self, CacheHandle) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            entries: HashMap::new(),
        };
        (actor, CacheHandle::new(sender))
    }

    /// Runs the actor's event loop until every handle is dropped.
    pub async fn run(mut self) {
        info!("Cache actor started");

        while let Some(request) = self.receiver.recv().await {
            match request {
                CacheRequest::Lookup {
                    actor_id,
                    respond_to,
                } => {
                    let address = self.entries.get(&actor_id).cloned();
                    debug!(%actor_id, found = address.is_some(), "Lookup");
                    let _ = respond_to.send(address);
                }
                CacheRequest::Upsert {
                    actor_id,
                    address,
                    respond_to,
                } => {
                    debug!(%actor_id, %address, "Upsert");
                    self.entries.insert(actor_id, address);
                    let _ = respond_to.send(());
                }
                CacheRequest::Contains {
                    actor_id,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.entries.contains_key(&actor_id));
                }
                CacheRequest::Remove {
                    actor_id,
                    respond_to,
                } => {
                    let removed = self.entries.remove(&actor_id).is_some();
                    debug!(%actor_id, removed, "Remove");
                    let _ = respond_to.send(());
                }
            }
        }

        info!(size = self.entries.len(), "Cache actor shutdown");
    }
}

/// Cloneable client for a running [`CacheActor`].
#[derive(Clone)]
pub struct CacheHandle {
    sender: mpsc::Sender<CacheRequest>,
}

impl CacheHandle {
    pub fn new(sender: mpsc::Sender<CacheRequest>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Response<T>) -> CacheRequest,
    ) -> Result<T, CacheError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| CacheError::Closed)?;
        response.await.map_err(|_| CacheError::Dropped)
    }
}

#[async_trait]
impl AddressCache for CacheHandle {
    async fn lookup(&self, actor_id: &str) -> Result<Option<String>, CacheError> {
        let actor_id = actor_id.to_string();
        self.request(|respond_to| CacheRequest::Lookup {
            actor_id,
            respond_to,
        })
        .await
    }

    async fn upsert(&self, actor_id: &str, address: &str) -> Result<(), CacheError> {
        let (actor_id, address) = (actor_id.to_string(), address.to_string());
        self.request(|respond_to| CacheRequest::Upsert {
            actor_id,
            address,
            respond_to,
        })
        .await
    }

    async fn contains(&self, actor_id: &str) -> Result<bool, CacheError> {
        let actor_id = actor_id.to_string();
        self.request(|respond_to| CacheRequest::Contains {
            actor_id,
            respond_to,
        })
        .await
    }

    async fn remove(&self, actor_id: &str) -> Result<(), CacheError> {
        let actor_id = actor_id.to_string();
        self.request(|respond_to| CacheRequest::Remove {
            actor_id,
            respond_to,
        })
        .await
    }
}
