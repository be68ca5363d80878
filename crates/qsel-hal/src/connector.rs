//! Compiler connector contract and credentials.

use std::fmt;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use qsel_model::{Circuit, CircuitLanguage};

use crate::error::HalResult;

/// Credentials for talking to a provider on behalf of a user.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct ProviderCredentials {
    /// Provider the credentials belong to.
    pub provider: String,
    /// Access tokens keyed by token name (e.g. `token`, `hub`, `group`).
    #[serde(skip_serializing)]
    pub tokens: FxHashMap<String, String>,
}

impl ProviderCredentials {
    /// Create empty credentials for a provider.
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            tokens: FxHashMap::default(),
        }
    }

    /// Add a named token.
    pub fn with_token(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tokens.insert(name.into(), value.into());
        self
    }

    /// Look up a token by name.
    pub fn token(&self, name: &str) -> Option<&str> {
        self.tokens.get(name).map(String::as_str)
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("provider", &self.provider)
            .field("tokens", &"[REDACTED]")
            .finish()
    }
}

/// Metrics and artifacts of a successful compilation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitInformation {
    /// Depth of the transpiled circuit.
    pub depth: u32,
    /// Width (qubits used) of the transpiled circuit.
    pub width: u32,
    /// Total gate count after transpilation.
    pub gate_count: u32,
    /// Multi-qubit gate count after transpilation.
    pub multi_qubit_gate_count: u32,
    /// Measurement operations after transpilation.
    pub measurement_count: u32,
    /// The transpiled circuit source.
    pub transpiled_circuit: String,
    /// Language of `transpiled_circuit`.
    pub transpiled_language: CircuitLanguage,
}

/// Trait for compiler connectors.
///
/// A connector wraps one compiler SDK and knows how to transpile a circuit
/// for the devices of the providers it supports. Connectors MUST be safe
/// for concurrent use: multiple selection jobs share them.
///
/// # Contract
///
/// - `supported_sdks()` and `supported_providers()` MUST be cheap and
///   reflect construction-time configuration.
/// - `compile()` MUST return [`HalError::UnsupportedLanguage`] rather than
///   guessing when handed a language outside `languages_for` the SDK.
/// - A compile failure caused by the circuit (too wide, unroutable) is an
///   `Err`; the caller treats it as a filtered-out candidate, not a fault.
#[async_trait]
pub trait CompilerConnector: Send + Sync {
    /// Name of this connector.
    fn name(&self) -> &str;

    /// Provider names this connector can target.
    fn supported_providers(&self) -> Vec<String>;

    /// SDK names this connector wraps.
    fn supported_sdks(&self) -> Vec<String>;

    /// Circuit languages the given SDK accepts natively.
    fn languages_for(&self, sdk: &str) -> Vec<CircuitLanguage>;

    /// Compile `circuit` for `qpu_name` at `provider`.
    async fn compile(
        &self,
        circuit: &Circuit,
        language: &CircuitLanguage,
        provider: &str,
        qpu_name: &str,
        credentials: &ProviderCredentials,
    ) -> HalResult<CircuitInformation>;
}
