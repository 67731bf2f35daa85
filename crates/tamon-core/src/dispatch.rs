//! One-way delivery of run updates from the run task to the presentation side.
//!
//! A bounded `mpsc` channel carries [`Envelope`]s in the order they were
//! published. The consumer folds each envelope into a [`DashboardView`] in a
//! single `apply` call before taking the next one.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tamon_models::agent::{AgentCatalog, AgentStatus};
use tamon_models::feed::{CompositeReport, Envelope, FeedEvent};
use tamon_models::run::RunCounters;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::registry::AgentEntry;

/// Create a connected dispatcher/receiver pair buffering up to `capacity` envelopes.
pub fn channel(capacity: usize) -> (Dispatcher, FeedReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        Dispatcher {
            tx,
            seq: Arc::new(AtomicU64::new(0)),
        },
        FeedReceiver { rx },
    )
}

/// Producer half. Cloned into each run task; only one run publishes at a time.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<Envelope>,
    seq: Arc<AtomicU64>,
}

impl Dispatcher {
    /// Publish `events` as one envelope. Waits only while the buffer is full.
    ///
    /// Returns `false` when the consumer is gone; the run carries on regardless.
    pub async fn publish(&self, run_id: Uuid, events: Vec<FeedEvent>) -> bool {
        if events.is_empty() {
            return true;
        }

        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let envelope = Envelope {
            run_id,
            seq,
            events,
        };

        match self.tx.send(envelope).await {
            Ok(()) => true,
            Err(_) => {
                debug!(%run_id, seq, "Feed receiver dropped, discarding update");
                false
            }
        }
    }
}

/// Consumer half, owned by the presentation side.
#[derive(Debug)]
pub struct FeedReceiver {
    rx: mpsc::Receiver<Envelope>,
}

impl FeedReceiver {
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }

    /// Receive the next envelope and apply it to `view` before returning it.
    pub async fn next_applied(&mut self, view: &mut DashboardView) -> Option<Envelope> {
        let envelope = self.rx.recv().await?;
        view.apply(&envelope);
        Some(envelope)
    }
}

/// How the most recent run ended, as seen by the presentation side.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewOutcome {
    Completed {
        report: CompositeReport,
        decision: String,
    },
    Failed(String),
}

/// Presentation-side mirror of run state, built only from published envelopes.
#[derive(Debug, Clone)]
pub struct DashboardView {
    agents: Vec<AgentEntry>,
    counters: RunCounters,
    progress: VecDeque<String>,
    progress_history: usize,
    run_id: Option<Uuid>,
    symbol: Option<String>,
    last_seq: Option<u64>,
    outcome: Option<ViewOutcome>,
}

impl DashboardView {
    pub fn new(catalog: &AgentCatalog, progress_history: usize) -> Self {
        Self {
            agents: catalog
                .agents()
                .map(|(team, name)| AgentEntry {
                    name: name.to_string(),
                    team: team.to_string(),
                    status: AgentStatus::Pending,
                })
                .collect(),
            counters: RunCounters::default(),
            progress: VecDeque::new(),
            progress_history: progress_history.max(1),
            run_id: None,
            symbol: None,
            last_seq: None,
            outcome: None,
        }
    }

    /// Apply every event of one envelope.
    pub fn apply(&mut self, envelope: &Envelope) {
        self.last_seq = Some(envelope.seq);
        for event in &envelope.events {
            self.apply_event(envelope.run_id, event);
        }
    }

    fn apply_event(&mut self, run_id: Uuid, event: &FeedEvent) {
        match event {
            FeedEvent::RunStarted { symbol, .. } => {
                for agent in &mut self.agents {
                    agent.status = AgentStatus::Pending;
                }
                self.counters = RunCounters::default();
                self.progress.clear();
                self.outcome = None;
                self.run_id = Some(run_id);
                self.symbol = Some(symbol.clone());
            }
            FeedEvent::AgentStatusChanged { agent, status } => {
                if let Some(entry) = self.agents.iter_mut().find(|e| &e.name == agent) {
                    entry.status = *status;
                }
            }
            FeedEvent::CountersChanged(counters) => {
                self.counters = *counters;
            }
            FeedEvent::ProgressLine { text } => {
                if self.progress.len() == self.progress_history {
                    self.progress.pop_front();
                }
                self.progress.push_back(text.clone());
            }
            FeedEvent::RunCompleted { report, decision } => {
                self.outcome = Some(ViewOutcome::Completed {
                    report: report.clone(),
                    decision: decision.clone(),
                });
            }
            FeedEvent::RunFailed { error } => {
                self.outcome = Some(ViewOutcome::Failed(error.clone()));
            }
        }
    }

    pub fn agents(&self) -> &[AgentEntry] {
        &self.agents
    }

    pub fn status(&self, agent: &str) -> Option<AgentStatus> {
        self.agents
            .iter()
            .find(|e| e.name == agent)
            .map(|e| e.status)
    }

    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    pub fn progress(&self) -> impl Iterator<Item = &str> {
        self.progress.iter().map(String::as_str)
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn last_seq(&self) -> Option<u64> {
        self.last_seq
    }

    pub fn outcome(&self) -> Option<&ViewOutcome> {
        self.outcome.as_ref()
    }

    /// True once the current run has completed or failed.
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }
}
