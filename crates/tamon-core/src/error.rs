use thiserror::Error;

/// A start request that was rejected before any run state was touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Symbol must not be empty")]
    EmptySymbol,

    #[error("Invalid analysis date {0:?}: expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("At least one analyst must be selected")]
    NoAnalysts,

    #[error("Research depth must be at least 1")]
    ZeroDepth,

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

/// Failure raised by the orchestration engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine failed to start: {0}")]
    Start(String),

    #[error("Engine stream error: {0}")]
    Stream(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("A run is already in progress")]
    RunInProgress,

    #[error("Stream error: {0}")]
    Stream(#[from] EngineError),

    #[error("Snapshot wait timed out after {0} seconds")]
    Timeout(u64),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Run task aborted: {0}")]
    Aborted(String),
}
