use actor_bus::bus::BusError;
use actor_bus::lifecycle::{setup_tracing, BusConfig, BusSystem};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), BusError> {
    setup_tracing();

    let config = BusConfig::from_env()?;
    info!(?config, "Starting actor bus");

    let system = BusSystem::start(&config).await?;
    info!(addr = %system.addr, "Actor bus ready");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for ctrl-c");
    }

    system.shutdown().await?;
    info!("Actor bus exited");
    Ok(())
}
