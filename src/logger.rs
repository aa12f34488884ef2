//! # Bus Logger
//!
//! Everything the bus reports goes through a [`BusLogger`] as a typed [`BusEvent`]. This is
//! the only place failures become visible, since nothing is ever returned to a message's
//! producer.
//!
//! [`TracingLogger`] is the default and forwards every event to `tracing` with structured
//! fields. Inject a different logger per bus with
//! [`BusBuilder::logger`](crate::bus::BusBuilder::logger); tests use
//! [`RecordingLogger`](crate::mock::RecordingLogger).

use crate::address::AddressError;
use std::net::SocketAddr;
use tracing::{info, warn, Level};

/// A diagnostic event emitted by the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    Listening { addr: SocketAddr },
    Stopped,
    /// Result of a `TEST_CACHE_GET` command.
    CacheEntry {
        actor_id: String,
        address: Option<String>,
    },
    NoAddress { actor_id: Option<String> },
    BadAddress {
        actor_id: String,
        error: AddressError,
    },
    DecodeFailed { original_error: Option<String> },
    EncodeFailed { original_error: Option<String> },
    MalformedCommand { kind: String, reason: &'static str },
    DispatchFailed { command: &'static str, error: String },
    DeliveryFailed { actor_id: String, error: String },
}

impl BusEvent {
    pub fn level(&self) -> Level {
        match self {
            BusEvent::Listening { .. } | BusEvent::Stopped | BusEvent::CacheEntry { .. } => {
                Level::INFO
            }
            _ => Level::WARN,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.level() == Level::WARN
    }
}

pub trait BusLogger: Send + Sync + 'static {
    fn log(&self, event: BusEvent);
}

/// Default logger backed by `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl BusLogger for TracingLogger {
    fn log(&self, event: BusEvent) {
        match event {
            BusEvent::Listening { addr } => info!(%addr, "Bus listening"),
            BusEvent::Stopped => info!("Bus no longer listening"),
            BusEvent::CacheEntry { actor_id, address } => {
                info!(%actor_id, ?address, "Cache entry")
            }
            BusEvent::NoAddress { actor_id } => {
                warn!(?actor_id, "No address found, message dropped")
            }
            BusEvent::BadAddress { actor_id, error } => {
                warn!(%actor_id, %error, "Unusable address, message dropped")
            }
            BusEvent::DecodeFailed { original_error } => {
                warn!(?original_error, "Undecodable message dropped")
            }
            BusEvent::EncodeFailed { original_error } => {
                warn!(?original_error, "Unencodable message dropped")
            }
            BusEvent::MalformedCommand { kind, reason } => {
                warn!(%kind, reason, "Malformed control message dropped")
            }
            BusEvent::DispatchFailed { command, error } => {
                warn!(command, %error, "Dispatch failed")
            }
            BusEvent::DeliveryFailed { actor_id, error } => {
                warn!(%actor_id, %error, "Delivery failed")
            }
        }
    }
}
