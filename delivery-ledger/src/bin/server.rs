//! Delivery ledger server binary

use delivery_ledger::{Config, Ledger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Freightline Delivery Ledger");

    // Load configuration
    let config = Config::from_env()?;

    // Open ledger
    let ledger = Ledger::open(config).await?;
    tracing::info!(owner = %ledger.query().owner(), "Ledger opened successfully");

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down delivery ledger");
    ledger.shutdown().await?;
    Ok(())
}
