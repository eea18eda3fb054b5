//! # Baytree Worker
//!
//! Runs one directory sync: staff and volunteers become users, participants
//! become mentees. Ctrl-C stops new imports and lets running ones finish.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://... VIEWS_USERNAME=... VIEWS_PASSWORD=... \
//!     cargo run -p baytree-worker
//! ```

use baytree_worker::{app, config::{Config, LogFormat}};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "baytree_worker=info,baytree_shared=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!("Baytree Worker v{} starting...", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received, finishing in-flight imports...");
            shutdown.cancel();
        }
    });

    let report = app::run(config, cancel).await?;

    if report.cancelled {
        tracing::warn!(processed = report.processed(), "Sync stopped before all records were imported");
    }

    Ok(())
}
