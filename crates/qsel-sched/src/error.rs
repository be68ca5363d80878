//! Error handling for the selection pipeline.

use thiserror::Error;

/// Result type for pipeline operations.
pub type SchedResult<T> = Result<T, SchedError>;

/// Errors that can occur during selection-pipeline operations.
#[derive(Debug, Error)]
pub enum SchedError {
    /// Job not found in storage.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Candidate not found in storage.
    #[error("Candidate not found: {0}")]
    CandidateNotFound(String),

    /// No connector registered for a required compiler or provider.
    ///
    /// This is a configuration error and fatal to the job that hit it.
    #[error("No connector available: {0}")]
    NoConnector(String),

    /// A collaborator (connector, translator, ranking service) failed.
    #[error("Connector error: {0}")]
    Connector(String),

    /// Persistence error.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Internal pipeline error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<qsel_hal::HalError> for SchedError {
    fn from(e: qsel_hal::HalError) -> Self {
        match e {
            qsel_hal::HalError::NoConnector(msg) => SchedError::NoConnector(msg),
            other => SchedError::Connector(other.to_string()),
        }
    }
}
