use async_trait::async_trait;
use tamon_models::run::{EngineConfig, RunRequest};
use tamon_models::snapshot::Snapshot;

use crate::error::EngineError;

/// The orchestration engine that runs the agent pipeline. Mockable for testing.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// Begin a run and return the stream of snapshots it produces.
    async fn start(
        &self,
        request: &RunRequest,
        config: &EngineConfig,
    ) -> Result<Box<dyn SnapshotStream>, EngineError>;

    /// Map the raw terminal decision field to a human-readable decision.
    fn process_signal(&self, raw_decision: &str) -> String;
}

/// Ordered, cumulative snapshots of one run.
#[async_trait]
pub trait SnapshotStream: Send {
    /// Wait for the next snapshot. `None` means the stream is exhausted.
    async fn next_snapshot(&mut self) -> Option<Result<Snapshot, EngineError>>;
}
