//! Cultivar decay job
//!
//! Recomputes every stored investment for elapsed time, optionally prunes
//! long-idle investments, and prints the reports as JSON. Meant to be run by
//! an external scheduler such as cron.

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cultivar_tracker::{config::TrackerConfig, InvestmentTracker};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting cultivar-decay v{}", cultivar_common::VERSION);

    // Load configuration
    let config = TrackerConfig::load().context("loading tracker configuration")?;
    info!(
        "Storage config: path={}, lock_timeout_ms={}",
        config.storage.path.display(),
        config.storage.lock_timeout_ms
    );

    let tracker = InvestmentTracker::open(config).context("opening investment store")?;
    let now = Utc::now();

    let decay = tracker.apply_decay_at(now).context("applying decay")?;
    let prune = tracker.prune_if_enabled(now).context("pruning investments")?;

    let recoveries = tracker.store().corruption_recoveries();
    let output = json!({
        "decay": decay,
        "prune": prune,
        "corruption_recoveries": recoveries,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    info!("cultivar-decay finished");
    Ok(())
}
