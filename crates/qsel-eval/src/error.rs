//! Evaluation error types.

use thiserror::Error;

/// Errors raised while scoring executions.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The candidate under evaluation does not exist.
    #[error("candidate not found: {0}")]
    CandidateNotFound(String),

    /// Underlying persistence failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] qsel_sched::SchedError),

    /// Anything else that stops an evaluation.
    #[error("evaluation error: {0}")]
    Evaluation(String),
}

/// Result type alias for evaluation operations.
pub type EvalResult<T> = Result<T, EvalError>;
