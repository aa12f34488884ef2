//! Construction and collaborator validation for [`Bus`].

use super::dispatch::{listen_loop, Shared};
use super::{Bus, BusError};
use crate::cache::AddressCache;
use crate::codec::{Codec, JsonCodec};
use crate::logger::{BusLogger, TracingLogger};
use crate::transport::Transport;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

/// Collects the bus collaborators.
///
/// `cache` and `transport` are required; `codec` defaults to [`JsonCodec`] and `logger`
/// to [`TracingLogger`].
///
/// ```ignore
/// let (cache_actor, cache) = CacheActor::new(32);
/// tokio::spawn(cache_actor.run());
///
/// let bus = BusBuilder::new()
///     .cache(cache)
///     .transport(TcpTransport::new(1024))
///     .build()?;
/// bus.start(DEFAULT_PORT).await?;
/// ```
#[derive(Default)]
pub struct BusBuilder {
    cache: Option<Arc<dyn AddressCache>>,
    transport: Option<Arc<dyn Transport>>,
    codec: Option<Arc<dyn Codec>>,
    logger: Option<Arc<dyn BusLogger>>,
}

impl BusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(mut self, cache: impl AddressCache) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn codec(mut self, codec: impl Codec) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    pub fn logger(mut self, logger: impl BusLogger) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Validates the collaborators, claims the inbound stream, and spawns the listener.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> Result<Bus, BusError> {
        let cache = self.cache.ok_or(BusError::MissingCache)?;
        let transport = self.transport.ok_or(BusError::MissingTransport)?;
        let inbound = transport.take_inbound().ok_or(BusError::InboundClaimed)?;

        let codec: Arc<dyn Codec> = match self.codec {
            Some(codec) => codec,
            None => Arc::new(JsonCodec),
        };
        let logger: Arc<dyn BusLogger> = match self.logger {
            Some(logger) => logger,
            None => Arc::new(TracingLogger),
        };

        let shared = Arc::new(Shared {
            cache,
            transport,
            codec,
            logger,
        });

        let (shutdown, shutdown_rx) = oneshot::channel();
        let listener = tokio::spawn(listen_loop(shared.clone(), inbound, shutdown_rx));
        debug!("Bus built");

        Ok(Bus {
            shared,
            shutdown,
            listener,
        })
    }
}
