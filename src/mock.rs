//! # Mock Collaborators
//!
//! In-memory stand-ins for every bus collaborator, for testing the bus without sockets.
//!
//! | Mock | Replaces | Use it to |
//! |------|----------|-----------|
//! | [`MockCache`] | [`AddressCache`] | script lookups, assert the exact cache calls |
//! | [`MockTransport`] | [`Transport`] | inject inbound bytes, inspect listen/close/send calls |
//! | [`RecordingLogger`] | [`BusLogger`] | assert which events were logged |
//!
//! All three are cheap to clone; keep a clone after handing one to the
//! [`BusBuilder`](crate::bus::BusBuilder).
//!
//! ```ignore
//! let cache = MockCache::new();
//! cache.expect_lookup("unknown").return_ok(None);
//!
//! let transport = MockTransport::new();
//! let logger = RecordingLogger::new();
//! let bus = Bus::builder()
//!     .cache(cache.clone())
//!     .transport(transport.clone())
//!     .logger(logger.clone())
//!     .build()?;
//!
//! bus.send(&json!({"op": "ping"}), "unknown").await;
//! assert!(transport.sent().is_empty());
//! assert_eq!(logger.warnings().len(), 1);
//! cache.verify();
//! ```

use crate::address::PeerAddr;
use crate::cache::{AddressCache, CacheError};
use crate::logger::{BusEvent, BusLogger};
use crate::transport::{Transport, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// =============================================================================
// CACHE
// =============================================================================

#[derive(Debug)]
enum Expectation {
    Lookup {
        actor_id: String,
        response: Result<Option<String>, CacheError>,
    },
    Upsert {
        actor_id: String,
        address: String,
        response: Result<(), CacheError>,
    },
    Contains {
        actor_id: String,
        response: Result<bool, CacheError>,
    },
    Remove {
        actor_id: String,
        response: Result<(), CacheError>,
    },
}

#[derive(Default)]
struct CacheState {
    expectations: VecDeque<Expectation>,
    unexpected: Vec<String>,
}

/// An [`AddressCache`] that answers from a queue of expectations, in order.
///
/// A call that does not match the next expectation is answered with
/// `CacheError::Backend` and reported by [`verify`](MockCache::verify).
#[derive(Clone, Default)]
pub struct MockCache {
    state: Arc<Mutex<CacheState>>,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_lookup(&self, actor_id: impl Into<String>) -> LookupExpectationBuilder {
        LookupExpectationBuilder {
            actor_id: actor_id.into(),
            state: self.state.clone(),
        }
    }

    pub fn expect_contains(&self, actor_id: impl Into<String>) -> ContainsExpectationBuilder {
        ContainsExpectationBuilder {
            actor_id: actor_id.into(),
            state: self.state.clone(),
        }
    }

    pub fn expect_upsert(
        &self,
        actor_id: impl Into<String>,
        address: impl Into<String>,
    ) -> UnitExpectationBuilder {
        UnitExpectationBuilder {
            kind: UnitKind::Upsert {
                actor_id: actor_id.into(),
                address: address.into(),
            },
            state: self.state.clone(),
        }
    }

    pub fn expect_remove(&self, actor_id: impl Into<String>) -> UnitExpectationBuilder {
        UnitExpectationBuilder {
            kind: UnitKind::Remove {
                actor_id: actor_id.into(),
            },
            state: self.state.clone(),
        }
    }

    /// Panics if an expectation was not consumed or an unexpected call was made.
    pub fn verify(&self) {
        let state = self.state.lock().unwrap();
        assert!(
            state.unexpected.is_empty(),
            "Unexpected cache calls: {:?}",
            state.unexpected
        );
        assert!(
            state.expectations.is_empty(),
            "Unmet cache expectations: {:?}",
            state.expectations
        );
    }

    fn next(&self, call: String) -> Option<Expectation> {
        let mut state = self.state.lock().unwrap();
        let expectation = state.expectations.pop_front();
        if expectation.is_none() {
            state.unexpected.push(call);
        }
        expectation
    }

    fn mismatch<T>(&self, call: String, expectation: Option<Expectation>) -> Result<T, CacheError> {
        let mut state = self.state.lock().unwrap();
        if let Some(expectation) = expectation {
            state.unexpected.push(format!("{} (expected {:?})", call, expectation));
        }
        Err(CacheError::Backend(format!("unexpected call: {}", call)))
    }
}

#[async_trait]
impl AddressCache for MockCache {
    async fn lookup(&self, actor_id: &str) -> Result<Option<String>, CacheError> {
        let call = format!("lookup({})", actor_id);
        match self.next(call.clone()) {
            Some(Expectation::Lookup {
                actor_id: expected,
                response,
            }) if expected == actor_id => response,
            other => self.mismatch(call, other),
        }
    }

    async fn upsert(&self, actor_id: &str, address: &str) -> Result<(), CacheError> {
        let call = format!("upsert({}, {})", actor_id, address);
        match self.next(call.clone()) {
            Some(Expectation::Upsert {
                actor_id: expected_id,
                address: expected_address,
                response,
            }) if expected_id == actor_id && expected_address == address => response,
            other => self.mismatch(call, other),
        }
    }

    async fn contains(&self, actor_id: &str) -> Result<bool, CacheError> {
        let call = format!("contains({})", actor_id);
        match self.next(call.clone()) {
            Some(Expectation::Contains {
                actor_id: expected,
                response,
            }) if expected == actor_id => response,
            other => self.mismatch(call, other),
        }
    }

    async fn remove(&self, actor_id: &str) -> Result<(), CacheError> {
        let call = format!("remove({})", actor_id);
        match self.next(call.clone()) {
            Some(Expectation::Remove {
                actor_id: expected,
                response,
            }) if expected == actor_id => response,
            other => self.mismatch(call, other),
        }
    }
}

/// Builder for `lookup` expectations.
pub struct LookupExpectationBuilder {
    actor_id: String,
    state: Arc<Mutex<CacheState>>,
}

impl LookupExpectationBuilder {
    pub fn return_ok(self, address: Option<&str>) {
        self.push(Ok(address.map(str::to_string)));
    }

    pub fn return_err(self, error: CacheError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<Option<String>, CacheError>) {
        self.state
            .lock()
            .unwrap()
            .expectations
            .push_back(Expectation::Lookup {
                actor_id: self.actor_id,
                response,
            });
    }
}

/// Builder for `contains` expectations.
pub struct ContainsExpectationBuilder {
    actor_id: String,
    state: Arc<Mutex<CacheState>>,
}

impl ContainsExpectationBuilder {
    pub fn return_ok(self, present: bool) {
        self.push(Ok(present));
    }

    pub fn return_err(self, error: CacheError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<bool, CacheError>) {
        self.state
            .lock()
            .unwrap()
            .expectations
            .push_back(Expectation::Contains {
                actor_id: self.actor_id,
                response,
            });
    }
}

enum UnitKind {
    Upsert { actor_id: String, address: String },
    Remove { actor_id: String },
}

/// Builder for `upsert` and `remove` expectations.
pub struct UnitExpectationBuilder {
    kind: UnitKind,
    state: Arc<Mutex<CacheState>>,
}

impl UnitExpectationBuilder {
    pub fn return_ok(self) {
        self.push(Ok(()));
    }

    pub fn return_err(self, error: CacheError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<(), CacheError>) {
        let expectation = match self.kind {
            UnitKind::Upsert { actor_id, address } => Expectation::Upsert {
                actor_id,
                address,
                response,
            },
            UnitKind::Remove { actor_id } => Expectation::Remove { actor_id, response },
        };
        self.state.lock().unwrap().expectations.push_back(expectation);
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

#[derive(Default)]
struct TransportState {
    listen_calls: Vec<u16>,
    close_calls: usize,
    sent: Vec<(PeerAddr, Bytes)>,
    listening: Option<SocketAddr>,
    fail_sends: bool,
}

/// A [`Transport`] that records every call and exposes its inbound stream for injection.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<TransportState>>,
    inbound_tx: Arc<Mutex<Option<mpsc::Sender<Bytes>>>>,
    inbound_rx: Arc<Mutex<Option<mpsc::Receiver<Bytes>>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(128);
        Self {
            state: Arc::new(Mutex::new(TransportState::default())),
            inbound_tx: Arc::new(Mutex::new(Some(tx))),
            inbound_rx: Arc::new(Mutex::new(Some(rx))),
        }
    }

    /// Pushes a raw item onto the inbound stream.
    pub async fn inject(&self, raw: impl Into<Bytes>) {
        let sender = self.inbound_tx.lock().unwrap().clone();
        let sender = sender.expect("inbound stream already closed");
        sender.send(raw.into()).await.expect("bus listener is gone");
    }

    /// Pushes the JSON encoding of `value` onto the inbound stream.
    pub async fn inject_json(&self, value: &Value) {
        let raw = serde_json::to_vec(value).expect("value serializes");
        self.inject(raw).await;
    }

    /// Closes the inbound stream, as a transport does once it is torn down.
    pub fn close_inbound(&self) {
        self.inbound_tx.lock().unwrap().take();
    }

    /// Makes every subsequent `send_to` fail.
    pub fn fail_sends(&self) {
        self.state.lock().unwrap().fail_sends = true;
    }

    pub fn listen_calls(&self) -> Vec<u16> {
        self.state.lock().unwrap().listen_calls.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.state.lock().unwrap().close_calls
    }

    pub fn sent(&self) -> Vec<(PeerAddr, Bytes)> {
        self.state.lock().unwrap().sent.clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn listen(&self, port: u16) -> Result<SocketAddr, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.listen_calls.push(port);
        if let Some(addr) = state.listening {
            return Err(TransportError::AlreadyListening(addr));
        }
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        state.listening = Some(addr);
        Ok(addr)
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.close_calls += 1;
        state
            .listening
            .take()
            .map(|_| ())
            .ok_or(TransportError::NotListening)
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.state.lock().unwrap().listening
    }

    fn take_inbound(&self) -> Option<mpsc::Receiver<Bytes>> {
        self.inbound_rx.lock().unwrap().take()
    }

    async fn send_to(&self, target: &PeerAddr, payload: Bytes) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_sends {
            return Err(TransportError::Connect {
                target: target.clone(),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            });
        }
        state.sent.push((target.clone(), payload));
        Ok(())
    }
}

// =============================================================================
// LOGGER
// =============================================================================

/// A [`BusLogger`] that keeps every event.
#[derive(Clone, Default)]
pub struct RecordingLogger {
    events: Arc<Mutex<Vec<BusEvent>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BusEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<BusEvent> {
        self.events()
            .into_iter()
            .filter(BusEvent::is_warning)
            .collect()
    }
}

impl BusLogger for RecordingLogger {
    fn log(&self, event: BusEvent) {
        self.events.lock().unwrap().push(event);
    }
}
