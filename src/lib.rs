#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Actor Bus
//!
//! > **Address actors by id, not by location.**
//!
//! This crate is an actor-location message bus built on Tokio. It keeps a mutable mapping
//! from actor ids to `host:port` addresses and routes every inbound message either as a
//! control command that changes the mapping, or as an opaque payload forwarded to whatever
//! address the recipient id currently resolves to.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Collaborators behind traits
//! The bus owns none of its infrastructure. The address store, the network, the wire
//! format, and the log sink are all traits:
//! - [`AddressCache`](cache::AddressCache): `lookup`, `upsert`, `contains`, `remove`.
//! - [`Transport`](transport::Transport): listen/close, one inbound stream, point-to-point `send_to`.
//! - [`Codec`](codec::Codec): single-result `decode`/`encode` that never fail outward.
//! - [`BusLogger`](logger::BusLogger): typed [`BusEvent`](logger::BusEvent)s.
//!
//! The compiler checks that every collaborator is complete; [`BusBuilder`](bus::BusBuilder)
//! only checks that the required ones were supplied.
//!
//! ### Exhaustive routing
//! Every decoded [`Message`](message::Message) is classified once into a
//! [`Command`](command::Command). Routing is a single `match`, so there is no silent
//! fallthrough branch.
//!
//! ## 🚀 Core Concepts
//!
//! ### Control messages
//!
//! | `type` | effect |
//! |---|---|
//! | `REGISTER_ACTOR`, `UPDATE_ACTOR_ADDRESS` | store `payload.actor_address` for `payload.actor_id` |
//! | `DEREGISTER_ACTOR` | forget `payload.actor_id` |
//! | `TEST_CACHE_GET` | log the cached address of `payload.actor_id` |
//! | anything else, or none | forward `action` to `receiver_id` |
//!
//! ### Delivery
//! Best effort. An unknown recipient, an address that is not exactly `host:port`, or a
//! failed connection is logged and the message is dropped. Nothing is acknowledged.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Concurrency Model
//! One listener task reads the inbound stream and spawns one task per message. Dispatches
//! never wait for each other, so nothing is ordered across messages. The cache must be
//! safe for concurrent calls; [`CacheActor`](cache::CacheActor) gets that by owning its
//! map inside a single task.
//!
//! ### 2. Shutdown
//! [`Bus::stop`](bus::Bus::stop) only closes the listening socket.
//! [`Bus::shutdown`](bus::Bus::shutdown) also drains the buffered inbound messages and
//! waits for in-flight dispatches.
//!
//! ### 3. Observability
//! `tracing` everywhere, see [`lifecycle::tracing`].
//!
//! ## 🗺️ Module Tour
//!
//! - [`bus`]: the controller, its builder, and the dispatch loop.
//! - [`command`] / [`message`]: the wire shape and its classification.
//! - [`codec`]: decoding and encoding, JSON by default.
//! - [`cache`]: the address cache trait and the in-process cache actor.
//! - [`transport`]: the transport trait and the TCP implementation.
//! - [`address`]: strict `host:port` parsing.
//! - [`logger`]: bus events and the `tracing` logger.
//! - [`lifecycle`]: configuration, tracing setup, and the [`BusSystem`](lifecycle::BusSystem) wiring.
//! - [`mock`]: in-memory collaborators for tests.
//!
//! ### Running the Bus
//!
//! ```bash
//! # Listen on the default port 5000 with info logs
//! RUST_LOG=info cargo run
//!
//! # Another port
//! ACTOR_BUS_PORT=7000 cargo run
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod address;
pub mod bus;
pub mod cache;
pub mod codec;
pub mod command;
pub mod lifecycle;
pub mod logger;
pub mod message;
pub mod mock;
pub mod transport;
