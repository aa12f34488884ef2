//! # Observability & Tracing
//!
//! [`setup_tracing`] installs the process-wide `tracing` subscriber used by the binary.
//!
//! ## Configuration
//!
//! - **Structured logging** with the `tracing` crate
//! - **Configurable log levels** via the `RUST_LOG` environment variable
//! - **Compact format** without the crate/module prefix (`with_target(false)`)
//!
//! ## What Gets Traced
//!
//! - **Bus lifecycle**: listening address, stop, listener start and drain
//! - **Cache actor**: startup, shutdown, and every lookup/upsert/remove at debug level
//! - **Routing**: the command name and resulting route of each inbound message
//! - **Drops**: unknown recipients, unusable addresses, codec sentinels, failed deliveries
//!
//! ## Usage Examples
//!
//! ```bash
//! # Lifecycle and warnings only
//! RUST_LOG=info cargo run
//!
//! # Every routing decision and cache call
//! RUST_LOG=debug cargo run
//!
//! # Only the dispatch path
//! RUST_LOG=actor_bus::bus=debug cargo run
//! ```
//!
//! With `RUST_LOG=debug` a register followed by a forwarded message looks like:
//!
//! ```text
//! INFO Bus listening addr=0.0.0.0:5000
//! DEBUG Upsert actor_id=a address=10.0.0.1:9000
//! DEBUG Routed command="register" route=CacheMutated
//! DEBUG Lookup actor_id=a found=true
//! DEBUG Forwarded actor_id=a target=10.0.0.1:9000
//! DEBUG Routed command="passthrough" route=Forwarded
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // Module paths add nothing; events carry actor_id/command fields
        .compact()
        .init();
}
