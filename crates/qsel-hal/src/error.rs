//! Error types for the HAL crate.

use thiserror::Error;

/// Errors that can occur in HAL operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// No connector registered for a required SDK or provider.
    #[error("No connector available: {0}")]
    NoConnector(String),

    /// Authentication with a provider failed.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The connector rejected or could not compile the circuit.
    #[error("Compilation failed: {0}")]
    CompilationFailed(String),

    /// The translator could not be reached or misbehaved.
    #[error("Translation error: {0}")]
    Translation(String),

    /// The ranking service could not be reached or misbehaved.
    #[error("Ranking error: {0}")]
    Ranking(String),

    /// A circuit was handed to a connector in a language it cannot accept.
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic connector-side error.
    #[error("Connector error: {0}")]
    Connector(String),
}

/// Result type for HAL operations.
pub type HalResult<T> = Result<T, HalError>;
