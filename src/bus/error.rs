//! Error types for the bus controller.

use crate::cache::CacheError;
use crate::transport::TransportError;
use thiserror::Error;

/// Errors returned by [`Bus`](super::Bus) and [`BusBuilder`](super::BusBuilder).
///
/// Construction errors (`MissingCache`, `MissingTransport`, `InboundClaimed`) are returned
/// before any task is spawned. The rest come from lifecycle calls; dispatch failures are
/// never returned, only logged.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("A cache is required to build a bus")]
    MissingCache,

    #[error("A transport is required to build a bus")]
    MissingTransport,

    /// The transport's inbound stream was already claimed by another listener.
    #[error("Transport inbound stream already claimed")]
    InboundClaimed,

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
