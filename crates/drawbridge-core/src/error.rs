use thiserror::Error;

use crate::event::FailureKind;

#[derive(Debug, Error)]
pub enum AgentError {
    /// `submit` was called while a run was still in progress. Rejected before
    /// any history mutation or event emission.
    #[error("a run is already in progress")]
    AlreadyRunning,

    /// The model kept requesting tools past the configured iteration cap.
    #[error("run did not converge within {limit} iterations")]
    IterationLimitExceeded { limit: u32 },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("tool '{name}' failed: {message}")]
    Tool { name: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AgentError {
    /// Classify this error for the `run_failed` event payload.
    ///
    /// `AlreadyRunning` is caller misuse and never reaches the event stream;
    /// it is grouped with protocol errors here only for totality.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            AgentError::IterationLimitExceeded { .. } => FailureKind::IterationLimit,
            AgentError::Tool { .. } => FailureKind::Tool,
            AgentError::AlreadyRunning
            | AgentError::Provider(_)
            | AgentError::Other(_) => FailureKind::Protocol,
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
