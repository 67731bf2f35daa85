use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tamon_models::agent::AgentCatalog;
use tamon_models::config::{MonitorConfig, MonitorSettings};
use tamon_models::feed::{CompositeReport, FeedEvent};
use tamon_models::run::{EngineConfig, RunRequest};
use tamon_models::snapshot::{SectionKey, Snapshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::dispatch::Dispatcher;
use crate::engine::{AnalysisEngine, SnapshotStream};
use crate::error::{MonitorError, ValidationError};
use crate::report::ReportAccumulator;
use crate::tracker::StatusTracker;

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    Completed {
        report: CompositeReport,
        decision: String,
    },
    Failed(MonitorError),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

/// Handle to an accepted run.
#[derive(Debug)]
pub struct RunHandle {
    run_id: Uuid,
    cancel: CancellationToken,
    join: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Stop consuming snapshots. The run ends as failed with [`MonitorError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this run, for handing to a signal handler.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn wait(self) -> RunOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(run_id = %self.run_id, error = %e, "Run task did not finish");
                RunOutcome::Failed(MonitorError::Aborted(e.to_string()))
            }
        }
    }
}

/// Starts runs one at a time and drives each on a background task.
///
/// State is `idle` or `running`; a start request while running is rejected
/// without touching the active run.
pub struct RunController {
    engine: Arc<dyn AnalysisEngine>,
    catalog: Arc<AgentCatalog>,
    providers: BTreeSet<String>,
    settings: MonitorSettings,
    dispatcher: Dispatcher,
    busy: Arc<AtomicBool>,
}

impl RunController {
    pub fn new(
        engine: Arc<dyn AnalysisEngine>,
        config: &MonitorConfig,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            engine,
            catalog: Arc::new(AgentCatalog::default()),
            providers: config.providers.keys().cloned().collect(),
            settings: config.monitor.clone(),
            dispatcher,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn catalog(&self) -> &AgentCatalog {
        &self.catalog
    }

    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Check a request without changing any state. Returns the parsed analysis date.
    pub fn validate(&self, request: &RunRequest) -> Result<NaiveDate, ValidationError> {
        if request.symbol.trim().is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        let date = NaiveDate::parse_from_str(request.analysis_date.trim(), "%Y-%m-%d")
            .map_err(|_| ValidationError::InvalidDate(request.analysis_date.clone()))?;
        if request.analysts.is_empty() {
            return Err(ValidationError::NoAnalysts);
        }
        if request.research_depth == 0 {
            return Err(ValidationError::ZeroDepth);
        }
        if !self.providers.contains(&request.provider) {
            return Err(ValidationError::UnknownProvider(request.provider.clone()));
        }
        Ok(date)
    }

    /// Validate `request` and, if no run is active, start it on a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, mut request: RunRequest) -> Result<RunHandle, MonitorError> {
        let analysis_date = self.validate(&request)?;

        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(symbol = %request.symbol, "Rejected start: run already in progress");
            return Err(MonitorError::RunInProgress);
        }
        let guard = BusyGuard(Arc::clone(&self.busy));

        request.symbol = request.symbol.trim().to_string();
        request.analysts.sort();
        request.analysts.dedup();

        let run_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let run = ActiveRun {
            run_id,
            request,
            analysis_date,
            engine: Arc::clone(&self.engine),
            catalog: Arc::clone(&self.catalog),
            settings: self.settings.clone(),
            dispatcher: self.dispatcher.clone(),
            cancel: cancel.clone(),
        };

        let dispatcher = self.dispatcher.clone();
        let join = tokio::spawn(async move {
            let _guard = guard;
            // A panic in the engine unwinds only the inner task; the feed still hears about it.
            match tokio::spawn(run.drive()).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let err = MonitorError::Aborted(e.to_string());
                    error!(%run_id, error = %err, "Run task did not finish");
                    dispatcher
                        .publish(
                            run_id,
                            vec![FeedEvent::RunFailed {
                                error: err.to_string(),
                            }],
                        )
                        .await;
                    RunOutcome::Failed(err)
                }
            }
        });

        Ok(RunHandle {
            run_id,
            cancel,
            join,
        })
    }
}

/// Returns the controller to idle when the run task ends, however it ends.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Everything one run task owns.
struct ActiveRun {
    run_id: Uuid,
    request: RunRequest,
    analysis_date: NaiveDate,
    engine: Arc<dyn AnalysisEngine>,
    catalog: Arc<AgentCatalog>,
    settings: MonitorSettings,
    dispatcher: Dispatcher,
    cancel: CancellationToken,
}

impl ActiveRun {
    async fn drive(self) -> RunOutcome {
        let start = Instant::now();
        info!(
            run_id = %self.run_id,
            symbol = %self.request.symbol,
            date = %self.analysis_date,
            analysts = ?self.request.analysts,
            "Starting run"
        );

        match self.execute().await {
            Ok((report, decision)) => {
                self.dispatcher
                    .publish(
                        self.run_id,
                        vec![
                            FeedEvent::ProgressLine {
                                text: "Analysis complete".to_string(),
                            },
                            FeedEvent::RunCompleted {
                                report: report.clone(),
                                decision: decision.clone(),
                            },
                        ],
                    )
                    .await;
                info!(
                    run_id = %self.run_id,
                    decision = %decision,
                    sections = report.sections.len(),
                    elapsed_ms = start.elapsed().as_millis(),
                    "Run completed"
                );
                RunOutcome::Completed { report, decision }
            }
            Err(e) => {
                warn!(
                    run_id = %self.run_id,
                    error = %e,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Run failed"
                );
                self.dispatcher
                    .publish(
                        self.run_id,
                        vec![FeedEvent::RunFailed {
                            error: e.to_string(),
                        }],
                    )
                    .await;
                RunOutcome::Failed(e)
            }
        }
    }

    async fn execute(&self) -> Result<(CompositeReport, String), MonitorError> {
        let mut tracker = StatusTracker::new(
            &self.catalog,
            &self.request.analysts,
            self.settings.progress_max_chars,
        );
        let mut accumulator = ReportAccumulator::new();

        let mut opening = vec![
            FeedEvent::RunStarted {
                run_id: self.run_id,
                symbol: self.request.symbol.clone(),
                analysis_date: self.analysis_date,
            },
            FeedEvent::ProgressLine {
                text: "Running analysis...".to_string(),
            },
        ];
        opening.extend(tracker.kickoff().into_iter().map(FeedEvent::from));
        self.dispatcher.publish(self.run_id, opening).await;

        let engine_config = EngineConfig::from(&self.request);
        let mut stream = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(MonitorError::Cancelled),
            started = self.engine.start(&self.request, &engine_config) => started?,
        };

        let timeout = self.settings.snapshot_timeout();
        let mut last: Option<Snapshot> = None;
        let mut count: u64 = 0;

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(MonitorError::Cancelled),
                next = next_snapshot(stream.as_mut(), timeout) => next?,
            };
            let Some(snapshot) = next else {
                break;
            };
            count += 1;

            let observation = tracker.observe(&snapshot);
            accumulator.capture(&snapshot);
            debug!(
                run_id = %self.run_id,
                snapshot = count,
                changes = observation.changes.len(),
                new_sections = observation.new_sections.len(),
                "Observed snapshot"
            );

            let mut events: Vec<FeedEvent> = observation
                .changes
                .into_iter()
                .map(FeedEvent::from)
                .collect();
            if let Some(counters) = observation.counters {
                events.push(FeedEvent::CountersChanged(counters));
            }
            for section in observation.new_sections {
                events.push(FeedEvent::ProgressLine {
                    text: format!("{} report received", section.heading()),
                });
            }
            if let Some(text) = observation.progress {
                events.push(FeedEvent::ProgressLine { text });
            }
            self.dispatcher.publish(self.run_id, events).await;

            last = Some(snapshot);
        }

        let raw_decision = last
            .as_ref()
            .and_then(|s| s.filled_section(SectionKey::FinalDecision))
            .ok_or_else(|| {
                MonitorError::ProtocolViolation(format!(
                    "stream ended after {count} snapshots without {}",
                    SectionKey::FinalDecision.field_name()
                ))
            })?;

        let decision = self.engine.process_signal(raw_decision);
        Ok((accumulator.finalize(decision.clone()), decision))
    }
}

async fn next_snapshot(
    stream: &mut dyn SnapshotStream,
    timeout: Option<Duration>,
) -> Result<Option<Snapshot>, MonitorError> {
    let next = match timeout {
        Some(limit) => tokio::time::timeout(limit, stream.next_snapshot())
            .await
            .map_err(|_| MonitorError::Timeout(limit.as_secs()))?,
        None => stream.next_snapshot().await,
    };
    Ok(next.transpose()?)
}
