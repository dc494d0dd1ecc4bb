//! Error types for the agent worker

use thiserror::Error;

/// Result type alias for worker operations
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Errors that can occur while executing a task
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Core storage/queue error
    #[error(transparent)]
    Core(#[from] harbor_core::Error),

    /// Failed to spawn the agent process
    #[error("Failed to spawn agent process: {message}")]
    SpawnFailed {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Invalid agent type
    #[error("Invalid agent type: {agent_type}")]
    InvalidAgentType { agent_type: String },

    /// Execution timeout
    #[error("Execution timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Shutdown arrived while the task was in flight
    #[error("Execution cancelled by shutdown")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    /// Create a SpawnFailed error
    pub fn spawn_failed(message: impl Into<String>) -> Self {
        Self::SpawnFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a SpawnFailed error with source
    pub fn spawn_failed_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::SpawnFailed {
            message: message.into(),
            source: Some(source),
        }
    }
}
