//! Job error model.

use thiserror::Error;

use plainjob_core::PayloadError;

use crate::job::JobState;

/// Result type used by job construction and state changes.
pub type JobResult<T> = Result<T, JobError>;

#[derive(Debug, Error)]
pub enum JobError {
    /// Every job must name the queue it belongs to.
    #[error("queue name must not be empty")]
    EmptyQueueName,

    /// A job identifier failed to parse.
    #[error("invalid job id: {0}")]
    InvalidId(String),

    /// The job's state does not allow the requested change.
    #[error("cannot move job from {from} to {to}")]
    InvalidTransition { from: JobState, to: JobState },

    #[error("progress must be between 0 and 100, got {0}")]
    InvalidProgress(u8),

    #[error(transparent)]
    Payload(#[from] PayloadError),
}

impl JobError {
    pub fn invalid_transition(from: JobState, to: JobState) -> Self {
        Self::InvalidTransition { from, to }
    }
}
