//! Streamview - Main Entry Point

use streamview::{init_logging, run, Settings};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_logging(settings.log_level()?, settings.log_json)?;

    info!("=== Streamview v{} ===", env!("CARGO_PKG_VERSION"));
    info!(source = %settings.source, "Starting frame stream viewer...");

    let summary = run(settings).await?;
    if !summary.producer.exit.is_clean() {
        error!(exit = ?summary.producer.exit, "Source failed");
        anyhow::bail!("source failed: {:?}", summary.producer.exit);
    }

    Ok(())
}
