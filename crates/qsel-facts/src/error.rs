//! Error handling for the fact layer.

use thiserror::Error;

/// Result type for fact-layer operations.
pub type FactResult<T> = Result<T, FactError>;

/// Errors that can occur in the fact layer.
#[derive(Debug, Error)]
pub enum FactError {
    /// A rule head could not be parsed into a signature.
    #[error("Malformed rule signature: {0}")]
    MalformedSignature(String),

    /// A required variable had no binding during query assembly.
    #[error("Unbound variable in rule '{rule}': {variable}")]
    UnboundVariable { rule: String, variable: String },

    /// The fact store rejected a write.
    #[error("Fact store error: {0}")]
    Store(String),

    /// The external evaluator failed.
    ///
    /// Callers that evaluate rules treat this as "no solution"; it only
    /// propagates from the raw evaluator API.
    #[error("Evaluator error: {0}")]
    Evaluator(String),
}
