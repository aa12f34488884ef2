use crate::bus::{Bus, BusError};
use crate::cache::{CacheActor, CacheHandle};
use crate::lifecycle::BusConfig;
use crate::transport::TcpTransport;
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// The runtime orchestrator for a standalone bus process.
///
/// `BusSystem` is responsible for:
/// - **Lifecycle Management**: Starting the cache actor and the bus, and stopping both
/// - **Dependency Wiring**: Handing the cache handle and a TCP transport to the bus
///
/// # Example
///
/// ```ignore
/// let system = BusSystem::start(&BusConfig::from_env()?).await?;
///
/// // Send through the bus by actor id
/// system.bus.send(&json!({"op": "ping"}), "worker-1").await;
///
/// // Gracefully shut down when done
/// system.shutdown().await?;
/// ```
pub struct BusSystem {
    /// The running bus.
    pub bus: Bus,

    /// Direct access to the address cache the bus uses.
    pub cache: CacheHandle,

    /// Listening address of the transport.
    pub addr: SocketAddr,

    cache_task: JoinHandle<()>,
}

impl BusSystem {
    /// Spawns the cache actor, builds the bus over a [`TcpTransport`], and starts listening
    /// on `config.port`.
    pub async fn start(config: &BusConfig) -> Result<Self, BusError> {
        let (cache_actor, cache) = CacheActor::new(config.cache_buffer);
        let cache_task = tokio::spawn(cache_actor.run());

        let bus = Bus::builder()
            .cache(cache.clone())
            .transport(TcpTransport::new(config.inbound_buffer))
            .build()?;
        let addr = bus.start(config.port).await?;

        Ok(Self {
            bus,
            cache,
            addr,
            cache_task,
        })
    }

    /// Gracefully shuts down the whole system.
    ///
    /// # Shutdown Process
    ///
    /// 1. The bus stops listening and drains its inbound stream.
    /// 2. Every cache handle is dropped, which ends the cache actor's loop.
    /// 3. The cache actor task is awaited.
    pub async fn shutdown(self) -> Result<(), BusError> {
        info!("Shutting down bus system...");

        self.bus.shutdown().await?;
        drop(self.cache);

        if let Err(e) = self.cache_task.await {
            error!("Cache actor task failed: {:?}", e);
            return Err(e.into());
        }

        info!("Bus system shutdown complete.");
        Ok(())
    }
}
