//! Prediction-based candidate ranking contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HalResult;

/// Static circuit metrics handed to the ranking service as criteria.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingCriteria {
    /// Pre-compilation circuit width.
    pub width: u32,
    /// Pre-compilation circuit depth.
    pub depth: u32,
    /// Total gate count.
    pub gate_count: u32,
    /// Multi-qubit gate count.
    pub multi_qubit_gate_count: u32,
    /// Measurement count.
    pub measurement_count: u32,
    /// Relative importance of queue size vs. predicted fidelity, in [0, 1].
    pub queue_importance: f64,
}

/// One alternative (candidate) submitted for ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingAlternative {
    /// Candidate identifier; the service echoes these back ordered.
    pub id: Uuid,
    /// Device queue size.
    pub queue_size: u32,
    /// Device T1 (µs).
    pub t1: f64,
    /// Device maximum gate time (µs).
    pub max_gate_time: f64,
    /// Device average gate error rate.
    pub avg_gate_error: f64,
    /// Analyzed depth on this device.
    pub analyzed_depth: u32,
    /// Analyzed width on this device.
    pub analyzed_width: u32,
}

/// A historical sample used for weight learning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightLearningSample {
    /// The alternative as it looked when the execution ran.
    pub alternative: RankingAlternative,
    /// Histogram-intersection value obtained for the execution, in (0, 1].
    pub histogram_intersection: f64,
}

/// Trait for MCDA ranking services.
///
/// The numeric ranking methods (TOPSIS, ELECTRE, PROMETHEE) stay behind
/// this boundary; qsel only consumes the resulting order. A service that
/// cannot produce a usable ordering returns `Ok(None)` and the caller keeps
/// its candidate set unchanged.
#[async_trait]
pub trait RankingService: Send + Sync {
    /// Rank alternatives for the given criteria, best first.
    async fn rank(
        &self,
        criteria: &RankingCriteria,
        alternatives: &[RankingAlternative],
    ) -> HalResult<Option<Vec<Uuid>>>;

    /// Feed finished executions back into the prediction model.
    async fn learn_weights(&self, samples: &[WeightLearningSample]) -> HalResult<()>;
}
