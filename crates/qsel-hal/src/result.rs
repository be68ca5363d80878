//! Execution results and measurement histograms.
//!
//! The execution state machine:
//!
//! ```text
//!   Initialized ──→ Running ──→ Finished
//!                      │
//!                      └──→ Failed(message in status_message)
//! ```
//!
//! **Invariants:**
//! - Terminal states (`Finished`, `Failed`) are permanent.
//! - `histogram_intersection` is only ever set to a value in (0, 1].

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an execution result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionResultId(pub Uuid);

impl ExecutionResultId {
    /// Create a new random execution result ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExecutionResultId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionResultId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Execution record created, nothing submitted yet.
    Initialized,
    /// Execution is running on the device.
    Running,
    /// Execution finished and the histogram is available.
    Finished,
    /// Execution failed; see the status message.
    Failed,
}

impl ExecutionStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Finished | ExecutionStatus::Failed)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Initialized => write!(f, "Initialized"),
            ExecutionStatus::Running => write!(f, "Running"),
            ExecutionStatus::Finished => write!(f, "Finished"),
            ExecutionStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Measurement outcome histogram: bitstring → observed count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts(FxHashMap<String, u64>);

impl Counts {
    /// Create an empty histogram.
    pub fn new() -> Self {
        Self(FxHashMap::default())
    }

    /// Create a histogram from outcome/count pairs.
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, u64)>) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Count for an outcome; absent outcomes count as zero.
    pub fn get(&self, outcome: &str) -> u64 {
        self.0.get(outcome).copied().unwrap_or(0)
    }

    /// Record additional observations of an outcome.
    pub fn add(&mut self, outcome: impl Into<String>, count: u64) {
        *self.0.entry(outcome.into()).or_insert(0) += count;
    }

    /// Total number of observations.
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Number of distinct outcomes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the histogram is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over (outcome, count) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// The most frequent outcome, if any.
    pub fn most_frequent(&self) -> Option<(&str, u64)> {
        self.0
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(k, v)| (k.as_str(), *v))
    }

    /// Outcomes present in either `self` or `other`, deduplicated.
    pub fn union_outcomes<'a>(&'a self, other: &'a Counts) -> Vec<&'a str> {
        let mut outcomes: Vec<&str> = self.0.keys().map(String::as_str).collect();
        for key in other.0.keys() {
            if !self.0.contains_key(key) {
                outcomes.push(key);
            }
        }
        outcomes
    }
}

/// Result of one circuit execution.
///
/// Owned by whichever caller created it (a candidate execution or a plain
/// implementation execution) and never shared between owners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Unique result identifier.
    pub id: ExecutionResultId,

    /// Current status.
    pub status: ExecutionStatus,

    /// Human-readable status message (failure reason, progress note).
    pub status_message: String,

    /// Measurement histogram; empty until `Finished`.
    pub counts: Counts,

    /// Number of shots executed.
    pub shots: u64,

    /// Histogram-intersection similarity against the calibration run.
    /// Unset until computed; always in (0, 1] once set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histogram_intersection: Option<f64>,

    /// Candidate this execution belongs to, when it came from the
    /// selection pipeline. Plain implementation executions leave it unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<Uuid>,

    /// User the execution ran for; drives per-user execution history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,

    /// Time the record was created.
    pub created_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// Create a fresh execution record.
    pub fn new(shots: u64) -> Self {
        Self {
            id: ExecutionResultId::new(),
            status: ExecutionStatus::Initialized,
            status_message: String::new(),
            counts: Counts::new(),
            shots,
            histogram_intersection: None,
            candidate_id: None,
            user_id: None,
            created_at: Utc::now(),
        }
    }

    /// Attach the owning candidate.
    pub fn for_candidate(mut self, candidate_id: Uuid) -> Self {
        self.candidate_id = Some(candidate_id);
        self
    }

    /// Attach the owning user.
    pub fn for_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Mark the execution running.
    pub fn running(mut self) -> Self {
        self.status = ExecutionStatus::Running;
        self
    }

    /// Mark the execution finished with its histogram.
    pub fn finished(mut self, counts: Counts) -> Self {
        self.status = ExecutionStatus::Finished;
        self.counts = counts;
        self
    }

    /// Mark the execution failed.
    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.status = ExecutionStatus::Failed;
        self.status_message = message.into();
        self
    }

    /// Store a computed histogram-intersection value.
    ///
    /// Values outside (0, 1] are ignored: a non-positive intersection means
    /// "no evidence", not "evidence of zero similarity".
    pub fn set_histogram_intersection(&mut self, value: f64) {
        if value > 0.0 && value <= 1.0 {
            self.histogram_intersection = Some(value);
        }
    }
}
