use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tamon_core::{AnalysisEngine, EngineError, SnapshotStream};
use tamon_models::run::{EngineConfig, RunRequest};
use tamon_models::snapshot::Snapshot;
use tracing::debug;

const RATINGS: [&str; 3] = ["BUY", "SELL", "HOLD"];

/// An engine that replays a recorded run from a JSON-lines file, one snapshot per line.
pub struct ReplayEngine {
    path: PathBuf,
    pace: Duration,
}

impl ReplayEngine {
    pub fn new(path: impl AsRef<Path>, pace: Duration) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            pace,
        }
    }
}

#[async_trait]
impl AnalysisEngine for ReplayEngine {
    async fn start(
        &self,
        request: &RunRequest,
        config: &EngineConfig,
    ) -> Result<Box<dyn SnapshotStream>, EngineError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        debug!(
            path = %self.path.display(),
            symbol = %request.symbol,
            provider = %config.llm_provider,
            "Replaying recorded run"
        );

        let lines: Vec<(usize, String)> = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| (i + 1, line.to_string()))
            .collect();

        Ok(Box::new(ReplayStream {
            lines: lines.into_iter(),
            pace: self.pace,
        }))
    }

    fn process_signal(&self, raw_decision: &str) -> String {
        extract_rating(raw_decision)
            .map(str::to_string)
            .unwrap_or_else(|| raw_decision.trim().to_string())
    }
}

struct ReplayStream {
    lines: std::vec::IntoIter<(usize, String)>,
    pace: Duration,
}

#[async_trait]
impl SnapshotStream for ReplayStream {
    async fn next_snapshot(&mut self) -> Option<Result<Snapshot, EngineError>> {
        let (line_no, line) = self.lines.next()?;
        if !self.pace.is_zero() {
            tokio::time::sleep(self.pace).await;
        }
        Some(
            serde_json::from_str(&line)
                .map_err(|e| EngineError::Stream(format!("line {line_no}: {e}"))),
        )
    }
}

/// The last BUY/SELL/HOLD word in `text`, ignoring case.
pub fn extract_rating(text: &str) -> Option<&'static str> {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .filter_map(|word| {
            RATINGS
                .iter()
                .find(|rating| rating.eq_ignore_ascii_case(word))
                .copied()
        })
        .last()
}
