pub mod controller;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod registry;
pub mod report;
pub mod tracker;

pub mod test_support;

pub use controller::{RunController, RunHandle, RunOutcome};
pub use dispatch::{channel, DashboardView, Dispatcher, FeedReceiver, ViewOutcome};
pub use engine::{AnalysisEngine, SnapshotStream};
pub use error::{EngineError, MonitorError, ValidationError};
pub use registry::{AgentEntry, AgentRegistry};
pub use report::ReportAccumulator;
pub use tracker::{Observation, StatusTracker};
