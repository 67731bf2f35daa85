use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tamon::monitor::{DashboardView, RunOutcome};
use tamon::presenter::{present_run, Presenter};
use tamon::replay::ReplayEngine;
use tamon::RequestOverrides;
use tamon_models::agent::AnalystKind;
use tamon_models::config::MonitorConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tamon", about = "Live progress monitor for multi-agent trading analysis runs")]
struct Cli {
    /// Path to configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<String>,

    /// JSON-lines file of engine snapshots to replay
    #[arg(short, long)]
    snapshots: String,

    /// Delay between replayed snapshots, in milliseconds
    #[arg(long, default_value_t = 0)]
    pace_ms: u64,

    /// Instrument to analyze
    #[arg(short, long)]
    ticker: Option<String>,

    /// Analysis date (YYYY-MM-DD). Defaults to today.
    #[arg(short, long)]
    date: Option<String>,

    /// Comma-separated analysts: market,social,news,fundamentals
    #[arg(short, long, value_delimiter = ',')]
    analysts: Option<Vec<AnalystKind>>,

    /// Debate-round depth
    #[arg(long)]
    depth: Option<u32>,

    #[arg(long)]
    provider: Option<String>,

    #[arg(long)]
    quick_model: Option<String>,

    #[arg(long)]
    deep_model: Option<String>,

    /// Emit the feed as JSON lines instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config: MonitorConfig = match &cli.config {
        Some(path) => {
            let config_str = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {path}"))?;
            toml::from_str(&config_str).with_context(|| "Failed to parse config")?
        }
        None => MonitorConfig::default(),
    };

    let analysis_date = cli
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive().format("%Y-%m-%d").to_string());
    let request = tamon::build_request(
        &config,
        RequestOverrides {
            ticker: cli.ticker,
            analysis_date,
            analysts: cli.analysts,
            research_depth: cli.depth,
            provider: cli.provider,
            quick_model: cli.quick_model,
            deep_model: cli.deep_model,
        },
    )?;

    let engine = Arc::new(ReplayEngine::new(
        &cli.snapshots,
        Duration::from_millis(cli.pace_ms),
    ));
    let (controller, mut receiver) = tamon::build_controller(&config, engine);
    let mut view = DashboardView::new(controller.catalog(), config.monitor.progress_history);

    let handle = controller
        .start(request)
        .map_err(|e| anyhow::anyhow!("Run rejected: {e}"))?;

    // Handle shutdown signals
    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received shutdown signal");
        cancel.cancel();
    });

    let mut presenter = Presenter::new(std::io::stdout().lock(), cli.json);
    present_run(&mut receiver, &mut view, &mut presenter)
        .await
        .context("Failed to write run output")?;

    match handle.wait().await {
        RunOutcome::Completed { .. } => Ok(()),
        RunOutcome::Failed(e) => Err(anyhow::anyhow!("Run failed: {e}")),
    }
}
