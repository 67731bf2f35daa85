//! Test support: a scripted engine that stands in for the orchestration engine.
//!
//! `ScriptedEngine::channel` hands back a feeder so a test can push snapshots
//! while a run is in flight; dropping the feeder exhausts the stream.

use std::sync::Mutex;

use async_trait::async_trait;
use tamon_models::agent::AnalystKind;
use tamon_models::run::{EngineConfig, RunRequest};
use tamon_models::snapshot::Snapshot;
use tokio::sync::mpsc;

use crate::engine::{AnalysisEngine, SnapshotStream};
use crate::error::EngineError;

type ScriptItem = Result<Snapshot, String>;

/// An engine whose snapshots are supplied by the test.
pub struct ScriptedEngine {
    script: Mutex<Option<mpsc::UnboundedReceiver<ScriptItem>>>,
    start_error: Option<String>,
    configs: Mutex<Vec<EngineConfig>>,
}

/// Sending half of a [`ScriptedEngine::channel`].
pub struct ScriptFeeder {
    tx: mpsc::UnboundedSender<ScriptItem>,
}

impl ScriptFeeder {
    pub fn send(&self, snapshot: Snapshot) {
        let _ = self.tx.send(Ok(snapshot));
    }

    /// Make the stream raise `message` at this point.
    pub fn fail(&self, message: &str) {
        let _ = self.tx.send(Err(message.to_string()));
    }
}

impl ScriptedEngine {
    fn with_receiver(rx: mpsc::UnboundedReceiver<ScriptItem>) -> Self {
        Self {
            script: Mutex::new(Some(rx)),
            start_error: None,
            configs: Mutex::new(Vec::new()),
        }
    }

    pub fn channel() -> (Self, ScriptFeeder) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::with_receiver(rx), ScriptFeeder { tx })
    }

    /// Stream exactly `snapshots`, then end.
    pub fn from_snapshots(snapshots: Vec<Snapshot>) -> Self {
        let (engine, feeder) = Self::channel();
        for snapshot in snapshots {
            feeder.send(snapshot);
        }
        engine
    }

    /// Stream `snapshots`, then raise `message`.
    pub fn failing_after(snapshots: Vec<Snapshot>, message: &str) -> Self {
        let (engine, feeder) = Self::channel();
        for snapshot in snapshots {
            feeder.send(snapshot);
        }
        feeder.fail(message);
        engine
    }

    /// Refuse to start at all.
    pub fn failing_start(message: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(tx);
        let mut engine = Self::with_receiver(rx);
        engine.start_error = Some(message.to_string());
        engine
    }

    /// Engine configurations received by `start`, oldest first.
    pub fn configs(&self) -> Vec<EngineConfig> {
        self.configs
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AnalysisEngine for ScriptedEngine {
    async fn start(
        &self,
        _request: &RunRequest,
        config: &EngineConfig,
    ) -> Result<Box<dyn SnapshotStream>, EngineError> {
        if let Ok(mut configs) = self.configs.lock() {
            configs.push(config.clone());
        }
        if let Some(message) = &self.start_error {
            return Err(EngineError::Start(message.clone()));
        }

        let rx = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.take())
            .ok_or_else(|| EngineError::Start("script already consumed".to_string()))?;

        Ok(Box::new(ScriptStream { rx }))
    }

    fn process_signal(&self, raw_decision: &str) -> String {
        raw_decision.trim().to_string()
    }
}

struct ScriptStream {
    rx: mpsc::UnboundedReceiver<ScriptItem>,
}

#[async_trait]
impl SnapshotStream for ScriptStream {
    async fn next_snapshot(&mut self) -> Option<Result<Snapshot, EngineError>> {
        self.rx
            .recv()
            .await
            .map(|item| item.map_err(EngineError::Stream))
    }
}

/// A valid request for `symbol` on `date` with every analyst selected.
pub fn request(symbol: &str, date: &str) -> RunRequest {
    RunRequest {
        symbol: symbol.to_string(),
        analysis_date: date.to_string(),
        analysts: AnalystKind::ALL.to_vec(),
        research_depth: 1,
        quick_model: "gpt-4o-mini".to_string(),
        deep_model: "gpt-4o".to_string(),
        provider: "openai".to_string(),
    }
}
