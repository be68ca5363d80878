//! Quantum circuit descriptor.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CircuitId(pub Uuid);

impl CircuitId {
    /// Create a new random circuit ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CircuitId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CircuitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Language a circuit is expressed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitLanguage {
    /// OpenQASM 2.0 source.
    OpenQasm2,
    /// OpenQASM 3.0 source.
    OpenQasm3,
    /// Serialized Qiskit circuit.
    Qiskit,
    /// Rigetti Quil source.
    Quil,
    /// Any language qsel does not know about; carried verbatim.
    Other(String),
}

impl CircuitLanguage {
    /// Canonical lowercase name of the language.
    pub fn as_str(&self) -> &str {
        match self {
            CircuitLanguage::OpenQasm2 => "openqasm2",
            CircuitLanguage::OpenQasm3 => "openqasm3",
            CircuitLanguage::Qiskit => "qiskit",
            CircuitLanguage::Quil => "quil",
            CircuitLanguage::Other(name) => name,
        }
    }

    /// Parse a language name (case-insensitive). Unknown names are preserved
    /// as [`CircuitLanguage::Other`].
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "openqasm2" | "qasm2" => CircuitLanguage::OpenQasm2,
            "openqasm3" | "qasm3" | "openqasm" => CircuitLanguage::OpenQasm3,
            "qiskit" => CircuitLanguage::Qiskit,
            "quil" => CircuitLanguage::Quil,
            other => CircuitLanguage::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for CircuitLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A quantum circuit with its static, pre-compilation metrics.
///
/// Circuits are immutable once analyzed: the pipeline reads them but never
/// writes back. Per-device metrics after transpilation live on the
/// candidate, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circuit {
    /// Unique circuit identifier.
    pub id: CircuitId,

    /// Human-readable name.
    pub name: String,

    /// Language of `source`.
    pub language: CircuitLanguage,

    /// Number of qubits the circuit acts on.
    pub width: u32,

    /// Circuit depth before transpilation.
    pub depth: u32,

    /// Total gate count.
    pub gate_count: u32,

    /// Number of gates acting on more than one qubit.
    pub multi_qubit_gate_count: u32,

    /// Number of measurement operations.
    pub measurement_count: u32,

    /// Serialized circuit source.
    pub source: String,
}

impl Circuit {
    /// Create a circuit from source with its analyzed metrics.
    pub fn new(name: impl Into<String>, language: CircuitLanguage, source: impl Into<String>) -> Self {
        Self {
            id: CircuitId::new(),
            name: name.into(),
            language,
            width: 0,
            depth: 0,
            gate_count: 0,
            multi_qubit_gate_count: 0,
            measurement_count: 0,
            source: source.into(),
        }
    }

    /// Set the static circuit metrics.
    pub fn with_metrics(mut self, width: u32, depth: u32, gate_count: u32) -> Self {
        self.width = width;
        self.depth = depth;
        self.gate_count = gate_count;
        self
    }

    /// Set the multi-qubit gate count.
    pub fn with_multi_qubit_gates(mut self, count: u32) -> Self {
        self.multi_qubit_gate_count = count;
        self
    }

    /// Set the measurement count.
    pub fn with_measurements(mut self, count: u32) -> Self {
        self.measurement_count = count;
        self
    }
}
