//! # Address Cache
//!
//! The mapping from actor id to `host:port` address that the bus reads and mutates.
//!
//! The bus only depends on the [`AddressCache`] trait. Each call must be atomic on its
//! own and safe to issue concurrently, because every inbound message is dispatched on its
//! own task and the bus takes no locks.
//!
//! [`CacheActor`] is the in-process implementation: a single task owns the map and
//! serves requests over a channel, handing out cloneable [`CacheHandle`]s.

pub mod actor;

pub use actor::{CacheActor, CacheHandle, CacheRequest};

use async_trait::async_trait;

/// Errors surfaced by a cache implementation.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum CacheError {
    #[error("Cache closed")]
    Closed,
    #[error("Cache dropped response channel")]
    Dropped,
    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Storage contract for actor addresses.
#[async_trait]
pub trait AddressCache: Send + Sync + 'static {
    async fn lookup(&self, actor_id: &str) -> Result<Option<String>, CacheError>;

    async fn upsert(&self, actor_id: &str, address: &str) -> Result<(), CacheError>;

    async fn contains(&self, actor_id: &str) -> Result<bool, CacheError>;

    async fn remove(&self, actor_id: &str) -> Result<(), CacheError>;
}
