//! Flapper game server.

use server::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Flapper Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load()?;
    config.validate()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  Tick rate: {} Hz", config.server.tick_rate);
    info!("  World: {}x{}", config.world.width, config.world.height);

    // Start the game server
    server::run(config).await?;

    Ok(())
}
