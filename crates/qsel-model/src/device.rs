//! Providers, QPUs and compiler SDKs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::circuit::CircuitLanguage;

/// Unique identifier for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderId(pub Uuid);

impl ProviderId {
    /// Create a new random provider ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProviderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A quantum cloud provider offering one or more QPUs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    /// Unique provider identifier.
    pub id: ProviderId,

    /// Provider name, e.g. `ibmq`.
    pub name: String,
}

impl Provider {
    /// Create a provider with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ProviderId::new(),
            name: name.into(),
        }
    }
}

/// Unique identifier for a QPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QpuId(pub Uuid);

impl QpuId {
    /// Create a new random QPU ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for QpuId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QpuId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A quantum processing unit (or simulator) as advertised by a provider.
///
/// Decoherence figures (`t1`, `t2`) and gate times are in microseconds,
/// averaged over the device. `queue_size` is the provider-reported number
/// of jobs waiting on the device at catalog-refresh time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Qpu {
    /// Unique QPU identifier.
    pub id: QpuId,

    /// Device name, e.g. `ibmq_lima`.
    pub name: String,

    /// Name of the provider offering this device.
    pub provider: String,

    /// Number of physical qubits.
    pub qubit_count: u32,

    /// Jobs currently waiting in the device queue.
    pub queue_size: u32,

    /// Average T1 relaxation time (µs).
    pub t1: f64,

    /// Average T2 dephasing time (µs).
    pub t2: f64,

    /// Maximum gate time (µs).
    pub max_gate_time: f64,

    /// Average single-gate error rate.
    pub avg_gate_error: f64,

    /// Whether the device is a simulator rather than real hardware.
    pub is_simulator: bool,
}

impl Qpu {
    /// Create a QPU descriptor for a hardware device.
    pub fn new(name: impl Into<String>, provider: impl Into<String>, qubit_count: u32) -> Self {
        Self {
            id: QpuId::new(),
            name: name.into(),
            provider: provider.into(),
            qubit_count,
            queue_size: 0,
            t1: 0.0,
            t2: 0.0,
            max_gate_time: 0.0,
            avg_gate_error: 0.0,
            is_simulator: false,
        }
    }

    /// Create a QPU descriptor for a simulator.
    pub fn simulator(name: impl Into<String>, provider: impl Into<String>, qubit_count: u32) -> Self {
        Self {
            is_simulator: true,
            ..Self::new(name, provider, qubit_count)
        }
    }

    /// Set the decoherence figures (µs).
    pub fn with_decoherence(mut self, t1: f64, t2: f64) -> Self {
        self.t1 = t1;
        self.t2 = t2;
        self
    }

    /// Set the maximum gate time (µs).
    pub fn with_max_gate_time(mut self, max_gate_time: f64) -> Self {
        self.max_gate_time = max_gate_time;
        self
    }

    /// Set the average gate error rate.
    pub fn with_gate_error(mut self, avg_gate_error: f64) -> Self {
        self.avg_gate_error = avg_gate_error;
        self
    }

    /// Set the current queue size.
    pub fn with_queue_size(mut self, queue_size: u32) -> Self {
        self.queue_size = queue_size;
        self
    }

    /// Number of gate layers the device can hold before decoherence,
    /// i.e. `t1 / max_gate_time`. Zero when gate time is unknown.
    pub fn decoherence_depth(&self) -> f64 {
        if self.max_gate_time > 0.0 {
            self.t1 / self.max_gate_time
        } else {
            0.0
        }
    }
}

/// Unique identifier for an SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SdkId(pub Uuid);

impl SdkId {
    /// Create a new random SDK ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SdkId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SdkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A compiler SDK (e.g. qiskit, pytket) usable to transpile circuits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sdk {
    /// Unique SDK identifier.
    pub id: SdkId,

    /// SDK name, lowercase by convention.
    pub name: String,

    /// Circuit languages the SDK accepts natively.
    pub accepted_languages: Vec<CircuitLanguage>,
}

impl Sdk {
    /// Create an SDK descriptor.
    pub fn new(
        name: impl Into<String>,
        accepted_languages: impl IntoIterator<Item = CircuitLanguage>,
    ) -> Self {
        Self {
            id: SdkId::new(),
            name: name.into(),
            accepted_languages: accepted_languages.into_iter().collect(),
        }
    }

    /// Check whether the SDK accepts a language without translation.
    pub fn accepts(&self, language: &CircuitLanguage) -> bool {
        self.accepted_languages.contains(language)
    }
}
