//! Runtime orchestration and lifecycle management.
//!
//! - [`BusSystem`] - wires the cache actor, the TCP transport, and the bus together
//! - [`BusConfig`] - process configuration from the environment
//! - [`setup_tracing`] - initializes the tracing/logging infrastructure

pub mod bus_system;
pub mod config;
pub mod tracing;

pub use self::tracing::setup_tracing;
pub use bus_system::BusSystem;
pub use config::*;
