use crate::pipeline::LifecycleState;
use thiserror::Error;

/// Result type for event pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors surfaced synchronously to callers of the pipeline API
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The ingestion queue stayed full for the whole bounded wait
    #[error("Ingestion queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// Invalid setup detected at configure time
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The operation is not allowed in the current lifecycle state
    #[error("Cannot {operation} while pipeline is {state}")]
    Lifecycle {
        operation: &'static str,
        state: LifecycleState,
    },

    /// The operator chain is frozen because the pipeline has been started
    #[error("Pipeline has already been started")]
    AlreadyRunning,

    /// Event failed factory validation
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Processing thread could not be spawned or joined
    #[error("Thread error: {0}")]
    ThreadError(String),

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ConfigLoad(#[from] serde_json::Error),

    /// Configuration file could not be read
    #[error("Failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),
}

/// Failure of a single operator on a single event.
///
/// Scoped to that event: the loop records it and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperatorError {
    /// The operator reported a failure
    #[error("{0}")]
    Failed(String),

    /// The operator panicked while processing
    #[error("operator panicked: {0}")]
    Panicked(String),
}

impl OperatorError {
    /// Shorthand for `OperatorError::Failed`
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}
