//! Job and candidate types for the selection pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use qsel_hal::CircuitInformation;
use qsel_model::{CircuitId, CircuitLanguage, Qpu};

/// Unique identifier for a selection job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionJobId(pub Uuid);

impl SelectionJobId {
    /// Create a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a job ID from a string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for SelectionJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SelectionJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub Uuid);

impl CandidateId {
    /// Create a new random candidate ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CandidateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a selection job.
///
/// Transitions are monotonic and not resumable: a job runs once, to
/// `Ready` or `Failed`. There is no pause or cancel primitive; the only
/// externally visible mutation point is polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionJobStatus {
    /// Job created; no candidates generated yet.
    Initialized,
    /// Candidate generation, compilation or policy application in progress.
    Running,
    /// Terminal: the candidate set is final.
    Ready,
    /// Terminal: the pipeline could not run at all.
    Failed { reason: String },
}

impl SelectionJobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SelectionJobStatus::Ready | SelectionJobStatus::Failed { .. }
        )
    }

    /// Check if the job finished with a final candidate set.
    pub fn is_ready(&self) -> bool {
        matches!(self, SelectionJobStatus::Ready)
    }

    /// Get a human-readable status name.
    pub fn name(&self) -> &'static str {
        match self {
            SelectionJobStatus::Initialized => "Initialized",
            SelectionJobStatus::Running => "Running",
            SelectionJobStatus::Ready => "Ready",
            SelectionJobStatus::Failed { .. } => "Failed",
        }
    }
}

impl std::fmt::Display for SelectionJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionJobStatus::Failed { reason } => write!(f, "Failed: {reason}"),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// A selection job: one asynchronous narrowing of the candidate space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionJob {
    /// Unique job identifier.
    pub id: SelectionJobId,

    /// Current status.
    pub status: SelectionJobStatus,

    /// User who submitted the job.
    pub user_id: Uuid,

    /// The original circuit being placed.
    pub circuit_id: CircuitId,

    /// Ordered ids of the job's surviving candidates. Only meaningful,
    /// and immutable, once the status is `Ready`.
    pub candidates: Vec<CandidateId>,

    /// Job creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl SelectionJob {
    /// Create a new job for a circuit.
    pub fn new(user_id: Uuid, circuit_id: CircuitId) -> Self {
        Self {
            id: SelectionJobId::new(),
            status: SelectionJobStatus::Initialized,
            user_id,
            circuit_id,
            candidates: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Whether the final candidate set is available.
    pub fn ready(&self) -> bool {
        self.status.is_ready()
    }
}

/// One (QPU, provider, compiler) triple considered for executing a circuit.
///
/// Belongs to exactly one job; deleted candidates are never re-created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique candidate identifier.
    pub id: CandidateId,

    /// Owning job.
    pub job_id: SelectionJobId,

    /// Owning user.
    pub user_id: Uuid,

    /// Provider name.
    pub provider: String,

    /// QPU (device) name.
    pub qpu_name: String,

    /// Compiler SDK name.
    pub compiler: String,

    /// Whether the device is a simulator.
    pub is_simulator: bool,

    /// Device queue size at generation time.
    pub queue_size: u32,

    /// Device qubit count.
    pub qubit_count: u32,

    /// Device average T1 time (µs).
    pub t1: f64,

    /// Device average T2 time (µs).
    pub t2: f64,

    /// Device maximum gate time (µs).
    pub max_gate_time: f64,

    /// Device average gate error rate.
    pub avg_gate_error: f64,

    /// Circuit width after compilation for this device; 0 until compiled.
    pub analyzed_width: u32,

    /// Circuit depth after compilation for this device; 0 until compiled.
    pub analyzed_depth: u32,

    /// Total gate count after compilation.
    pub analyzed_gate_count: u32,

    /// Multi-qubit gate count after compilation.
    pub analyzed_multi_qubit_gate_count: u32,

    /// Transpiled circuit source, once compiled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transpiled_circuit: Option<String>,

    /// Language of the transpiled circuit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transpiled_language: Option<CircuitLanguage>,

    /// Predicted histogram-intersection value from the ranking service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_histogram_intersection: Option<f64>,
}

impl Candidate {
    /// Create a candidate for a device/compiler pair.
    pub fn new(job_id: SelectionJobId, user_id: Uuid, qpu: &Qpu, compiler: impl Into<String>) -> Self {
        Self {
            id: CandidateId::new(),
            job_id,
            user_id,
            provider: qpu.provider.clone(),
            qpu_name: qpu.name.clone(),
            compiler: compiler.into(),
            is_simulator: qpu.is_simulator,
            queue_size: qpu.queue_size,
            qubit_count: qpu.qubit_count,
            t1: qpu.t1,
            t2: qpu.t2,
            max_gate_time: qpu.max_gate_time,
            avg_gate_error: qpu.avg_gate_error,
            analyzed_width: 0,
            analyzed_depth: 0,
            analyzed_gate_count: 0,
            analyzed_multi_qubit_gate_count: 0,
            transpiled_circuit: None,
            transpiled_language: None,
            predicted_histogram_intersection: None,
        }
    }

    /// Attach analyzed metrics from a successful compilation.
    pub fn apply_compilation(&mut self, info: CircuitInformation) {
        self.analyzed_width = info.width;
        self.analyzed_depth = info.depth;
        self.analyzed_gate_count = info.gate_count;
        self.analyzed_multi_qubit_gate_count = info.multi_qubit_gate_count;
        self.transpiled_circuit = Some(info.transpiled_circuit);
        self.transpiled_language = Some(info.transpiled_language);
    }

    /// A candidate with zero analyzed width and depth never passed
    /// compilation and must be pruned.
    pub fn failed_compilation(&self) -> bool {
        self.analyzed_width == 0 && self.analyzed_depth == 0
    }

    /// Decoherence-budget and qubit-count feasibility check.
    ///
    /// Simulators are always feasible; hardware must fit the circuit both
    /// in qubits and in decoherence-limited depth:
    /// `t1 / max_gate_time >= analyzed_depth && qubit_count >= analyzed_width`.
    pub fn is_feasible(&self) -> bool {
        if self.is_simulator {
            return true;
        }
        let decoherence_depth = if self.max_gate_time > 0.0 {
            self.t1 / self.max_gate_time
        } else {
            0.0
        };
        decoherence_depth >= f64::from(self.analyzed_depth)
            && self.qubit_count >= self.analyzed_width
    }
}
