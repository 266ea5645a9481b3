use anyhow::{Context, Result};

use fairway::config::Config;
use fairway::context::Services;

/// One warm-up run over every registered course, then exit
pub async fn warm(config: Config) -> Result<()> {
    let services = Services::init(&config)
        .await
        .context("Failed to initialize services")?;

    let report = services.scheduler.run_once().await;
    services.shutdown().await;

    if let Some(report) = report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
