use serde::{Deserialize, Serialize};

use crate::agent::AnalystKind;

/// Parameters for starting one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunRequest {
    /// Instrument identifier, e.g. "SPY".
    pub symbol: String,
    /// Analysis date as entered, expected as `YYYY-MM-DD`. Validated at start.
    pub analysis_date: String,
    /// Selected analyst families. Order is normalized to pipeline order at start.
    pub analysts: Vec<AnalystKind>,
    /// Debate-round depth for both the research and risk discussions.
    pub research_depth: u32,
    pub quick_model: String,
    pub deep_model: String,
    pub provider: String,
}

/// Configuration handed to the orchestration engine for one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_debate_rounds: u32,
    pub max_risk_discuss_rounds: u32,
    pub quick_think_llm: String,
    pub deep_think_llm: String,
    pub llm_provider: String,
}

impl From<&RunRequest> for EngineConfig {
    fn from(request: &RunRequest) -> Self {
        Self {
            max_debate_rounds: request.research_depth,
            max_risk_discuss_rounds: request.research_depth,
            quick_think_llm: request.quick_model.clone(),
            deep_think_llm: request.deep_model.clone(),
            llm_provider: request.provider.clone(),
        }
    }
}

/// Running counters for the active run. Never decrease within a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RunCounters {
    pub tool_calls: u64,
    pub llm_calls: u64,
    pub reports: u64,
}
