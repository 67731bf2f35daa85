pub mod agent;
pub mod config;
pub mod feed;
pub mod run;
pub mod snapshot;

pub use agent::{AgentCatalog, AgentStatus, AnalystKind, Team};
pub use config::{MonitorConfig, MonitorSettings, ProviderModels, RunDefaults};
pub use feed::{CompositeReport, Envelope, FeedEvent, ReportSection, StatusChange};
pub use run::{EngineConfig, RunCounters, RunRequest};
pub use snapshot::{Message, MessageKind, SectionKey, Snapshot, ToolCall};
