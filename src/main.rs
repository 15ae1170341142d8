use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

mod analytics;
mod config;
mod dashboard;
mod db;
mod source;

use analytics::Pipeline;
use config::{Config, SourceKind};
use dashboard::AppState;
use db::Database;
use source::{ApiSource, PredictionSource};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let provider: Arc<dyn PredictionSource> = match config.source {
        SourceKind::Api => {
            info!("Reading predictions from {}", config.api_url);
            Arc::new(ApiSource::new(&config.api_url)?)
        }
        SourceKind::Sqlite => {
            let db = Database::open(&config.database_path)?;
            info!("Snapshot database opened: {}", config.database_path);
            Arc::new(db)
        }
    };

    let pipeline = Arc::new(Pipeline::new(config.pipeline_settings()));

    if config.report_only {
        let report = source::historical_report(
            Arc::clone(&provider),
            Arc::clone(&pipeline),
            config.max_concurrency,
        )
        .await?;
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
        return Ok(());
    }

    // Warm-up pass so the accuracy summary shows up in the logs at startup
    if let Err(e) = source::historical_report(
        Arc::clone(&provider),
        Arc::clone(&pipeline),
        config.max_concurrency,
    )
    .await
    {
        warn!("Initial historical report failed: {:#}", e);
    }

    let app = dashboard::router(AppState {
        source: provider,
        pipeline,
        max_concurrency: config.max_concurrency,
    });
    let addr: SocketAddr = config
        .dashboard_addr
        .parse()
        .with_context(|| format!("Invalid dashboard address '{}'", config.dashboard_addr))?;
    info!("Dashboard listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run dashboard server (blocks until shutdown)
    axum::serve(listener, app).await?;

    Ok(())
}
