//! tamon - live progress monitor for multi-agent trading analysis runs.
//!
//! Observes the snapshot stream of an orchestration engine, tracks which
//! agents are working, counts tool/model invocations and report sections,
//! and assembles the final report.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use tamon::monitor::{AnalysisEngine, DashboardView, RunController};
//! use tamon::models::{MonitorConfig, RunRequest};
//! use tamon::replay::ReplayEngine;
//! ```

pub use tamon_core as monitor;
pub use tamon_models as models;

pub mod presenter;
pub mod replay;

use std::sync::Arc;

use anyhow::anyhow;
use tamon_core::{AnalysisEngine, FeedReceiver, RunController};
use tamon_models::agent::AnalystKind;
use tamon_models::config::MonitorConfig;
use tamon_models::run::RunRequest;

/// Start-request fields supplied by the user. Unset fields come from configuration.
#[derive(Debug, Clone, Default)]
pub struct RequestOverrides {
    pub ticker: Option<String>,
    pub analysis_date: String,
    pub analysts: Option<Vec<AnalystKind>>,
    pub research_depth: Option<u32>,
    pub provider: Option<String>,
    pub quick_model: Option<String>,
    pub deep_model: Option<String>,
}

/// Build a RunController and its feed receiver from configuration.
pub fn build_controller(
    config: &MonitorConfig,
    engine: Arc<dyn AnalysisEngine>,
) -> (RunController, FeedReceiver) {
    let (dispatcher, receiver) = tamon_core::channel(config.monitor.channel_capacity);
    (RunController::new(engine, config, dispatcher), receiver)
}

/// Fill a RunRequest from user overrides and configured defaults.
pub fn build_request(
    config: &MonitorConfig,
    overrides: RequestOverrides,
) -> Result<RunRequest, anyhow::Error> {
    let defaults = &config.defaults;
    let provider = overrides
        .provider
        .unwrap_or_else(|| defaults.provider.clone());
    let models = config.provider(&provider);

    let quick_model = match overrides.quick_model {
        Some(model) => model,
        None => models
            .and_then(|m| m.default_quick())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("No quick model configured for provider {provider}"))?,
    };
    let deep_model = match overrides.deep_model {
        Some(model) => model,
        None => models
            .and_then(|m| m.default_deep())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("No deep model configured for provider {provider}"))?,
    };

    Ok(RunRequest {
        symbol: overrides
            .ticker
            .unwrap_or_else(|| defaults.ticker.clone())
            .to_uppercase(),
        analysis_date: overrides.analysis_date,
        analysts: overrides
            .analysts
            .unwrap_or_else(|| defaults.analysts.clone()),
        research_depth: overrides.research_depth.unwrap_or(defaults.research_depth),
        quick_model,
        deep_model,
        provider,
    })
}
