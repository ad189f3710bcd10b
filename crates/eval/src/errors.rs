use crate::types::FailureCause;
use std::path::PathBuf;
use thiserror::Error;

/// A result type for agent evaluation
pub type Result<T> = std::result::Result<T, EvalError>;

/// An error occurring while evaluating a candidate with the external agent
#[derive(Error, Debug)]
pub enum EvalError {
    /// When the configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// When the agent process cannot be spawned
    #[error("Agent launch error: {0}")]
    Launch(#[source] std::io::Error),
    /// When the agent process terminates with an error status
    #[error("Agent exited with {0}")]
    AgentExit(String),
    /// When the run artifact is still missing after polling
    #[error("Artifact {path:?} not found after {attempts} attempts")]
    ArtifactTimeout {
        /// Expected artifact location
        path: PathBuf,
        /// Number of existence checks performed
        attempts: usize,
    },
    /// When the run artifact cannot be read
    #[error("Artifact read error: {0}")]
    ArtifactRead(#[source] std::io::Error),
    /// When the energy consumption line is missing
    #[error("Energy consumption not found in {0}")]
    PatternNotFound(String),
    /// When the energy value is not a finite non-negative number
    #[error("Invalid energy value: {0}")]
    InvalidValue(String),
    /// When the candidate is rejected by the range policy
    #[error("Candidate out of range: {0}")]
    OutOfRange(String),
    /// When anything else goes wrong (e.g. a panic in a custom launcher)
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl EvalError {
    /// The failure tag reported alongside the failure sentinel
    pub fn cause(&self) -> FailureCause {
        match self {
            EvalError::InvalidConfig(_) => FailureCause::Unclassified,
            EvalError::Launch(_) => FailureCause::Launch,
            EvalError::AgentExit(_) => FailureCause::AgentExit,
            EvalError::ArtifactTimeout { .. } => FailureCause::ArtifactTimeout,
            EvalError::ArtifactRead(_) => FailureCause::ArtifactRead,
            EvalError::PatternNotFound(_) => FailureCause::PatternNotFound,
            EvalError::InvalidValue(_) => FailureCause::InvalidValue,
            EvalError::OutOfRange(_) => FailureCause::OutOfRange,
            EvalError::Unexpected(_) => FailureCause::Unclassified,
        }
    }
}
