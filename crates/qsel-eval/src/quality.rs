//! Execution scoring against the calibration run.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use qsel_hal::{
    ExecutionResult, ExecutionStatus, RankingAlternative, RankingService, WeightLearningSample,
};
use qsel_sched::{Candidate, CandidateId, StateStore};

use crate::error::{EvalError, EvalResult};
use crate::histogram::histogram_intersection;

/// Evaluator configuration.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Interval between calibration-result polls.
    pub poll_interval: Duration,

    /// Maximum number of polls before giving up on the calibration run.
    pub max_attempts: u32,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_attempts: 60,
        }
    }
}

/// Scores finished executions by histogram intersection against the
/// calibration run of the same job.
pub struct QualityEvaluator {
    store: Arc<dyn StateStore>,
    ranking: Option<Arc<dyn RankingService>>,
    config: EvaluatorConfig,
}

impl QualityEvaluator {
    /// Create an evaluator over the shared state store.
    pub fn new(store: Arc<dyn StateStore>, config: EvaluatorConfig) -> Self {
        Self {
            store,
            ranking: None,
            config,
        }
    }

    /// Feed computed scores back into a prediction model.
    pub fn with_ranking(mut self, ranking: Arc<dyn RankingService>) -> Self {
        self.ranking = Some(ranking);
        self
    }

    /// Score the finished execution of a candidate.
    ///
    /// Best effort: any failure along the way leaves the execution
    /// unscored and returns `None`.
    pub async fn evaluate(&self, candidate_id: &CandidateId) -> Option<f64> {
        match self.try_evaluate(candidate_id).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Evaluation of candidate {} failed: {e}", candidate_id);
                None
            }
        }
    }

    async fn try_evaluate(&self, candidate_id: &CandidateId) -> EvalResult<Option<f64>> {
        let candidate = self
            .store
            .load_candidate(candidate_id)
            .await?
            .ok_or_else(|| EvalError::CandidateNotFound(candidate_id.to_string()))?;

        let Some(result) = self.store.load_result_for_candidate(candidate_id).await? else {
            debug!("Candidate {} has no execution result yet", candidate_id);
            return Ok(None);
        };
        if result.status != ExecutionStatus::Finished {
            debug!(
                "Candidate {} execution is {}; not scoring",
                candidate_id, result.status
            );
            return Ok(None);
        }

        // The calibration run is its own execution of the same circuit, so
        // a simulator execution is compared against itself.
        if candidate.is_simulator {
            self.record(&candidate, result, 1.0).await?;
            return Ok(Some(1.0));
        }

        let siblings = self.store.list_candidates(&candidate.job_id).await?;
        let Some(calibration) = siblings.into_iter().find(|c| c.is_simulator) else {
            debug!(
                "Job {} has no calibration candidate; not scoring {}",
                candidate.job_id, candidate_id
            );
            return Ok(None);
        };

        let Some(calibration_result) = self.await_calibration(&calibration.id).await? else {
            return Ok(None);
        };

        let value = histogram_intersection(
            &result.counts,
            &calibration_result.counts,
            calibration_result.shots,
        );
        if !(value > 0.0 && value <= 1.0) {
            debug!(
                "Intersection {value} for candidate {} carries no evidence; dropping",
                candidate_id
            );
            return Ok(None);
        }

        self.record(&candidate, result, value).await?;
        Ok(Some(value))
    }

    /// Poll for the calibration run to finish, with a bounded budget.
    async fn await_calibration(
        &self,
        calibration_id: &CandidateId,
    ) -> EvalResult<Option<ExecutionResult>> {
        for _ in 0..self.config.max_attempts {
            match self.store.load_result_for_candidate(calibration_id).await? {
                Some(result) if result.status == ExecutionStatus::Finished => {
                    return Ok(Some(result));
                }
                Some(result) if result.status == ExecutionStatus::Failed => {
                    debug!("Calibration run {} failed; not scoring", calibration_id);
                    return Ok(None);
                }
                _ => {}
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }

        warn!(
            "Calibration run {} not finished after {} polls; giving up",
            calibration_id, self.config.max_attempts
        );
        Ok(None)
    }

    /// Persist the score and feed it back into the prediction model.
    async fn record(
        &self,
        candidate: &Candidate,
        mut result: ExecutionResult,
        value: f64,
    ) -> EvalResult<()> {
        result.set_histogram_intersection(value);
        self.store.save_result(&result).await?;

        if let Some(ranking) = &self.ranking {
            let sample = WeightLearningSample {
                alternative: RankingAlternative {
                    id: candidate.id.0,
                    queue_size: candidate.queue_size,
                    t1: candidate.t1,
                    max_gate_time: candidate.max_gate_time,
                    avg_gate_error: candidate.avg_gate_error,
                    analyzed_depth: candidate.analyzed_depth,
                    analyzed_width: candidate.analyzed_width,
                },
                histogram_intersection: value,
            };
            if let Err(e) = ranking.learn_weights(&[sample]).await {
                warn!("Weight learning rejected sample for {}: {e}", candidate.id);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    use qsel_hal::{Counts, HalResult, RankingCriteria};
    use qsel_model::Qpu;
    use qsel_sched::{MemoryStore, SelectionJobId};

    struct RecordingRanking {
        samples: Mutex<Vec<WeightLearningSample>>,
    }

    #[async_trait]
    impl RankingService for RecordingRanking {
        async fn rank(
            &self,
            _criteria: &RankingCriteria,
            _alternatives: &[RankingAlternative],
        ) -> HalResult<Option<Vec<Uuid>>> {
            Ok(None)
        }

        async fn learn_weights(&self, samples: &[WeightLearningSample]) -> HalResult<()> {
            self.samples.lock().unwrap().extend_from_slice(samples);
            Ok(())
        }
    }

    fn fast_config() -> EvaluatorConfig {
        EvaluatorConfig {
            poll_interval: Duration::from_millis(10),
            max_attempts: 3,
        }
    }

    fn hardware(job_id: SelectionJobId, user_id: Uuid) -> Candidate {
        let qpu = Qpu::new("ibmq_lima", "ibmq", 5)
            .with_decoherence(100.0, 80.0)
            .with_max_gate_time(10.0);
        Candidate::new(job_id, user_id, &qpu, "qiskit")
    }

    fn simulator(job_id: SelectionJobId, user_id: Uuid) -> Candidate {
        let qpu = Qpu::simulator("aer_simulator", "ibmq", 32);
        Candidate::new(job_id, user_id, &qpu, "qiskit")
    }

    async fn finish(store: &MemoryStore, candidate: &Candidate, counts: Counts, shots: u64) {
        let result = ExecutionResult::new(shots)
            .for_candidate(candidate.id.0)
            .for_user(candidate.user_id)
            .running()
            .finished(counts);
        store.save_result(&result).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulator_scores_one() {
        let store = Arc::new(MemoryStore::new());
        let job_id = SelectionJobId::new();
        let sim = simulator(job_id, Uuid::new_v4());
        store.save_candidate(&sim).await.unwrap();
        finish(&store, &sim, Counts::from_pairs([("00", 1000u64)]), 1000).await;

        let evaluator = QualityEvaluator::new(store.clone(), fast_config());
        assert_eq!(evaluator.evaluate(&sim.id).await, Some(1.0));

        let stored = store.load_result_for_candidate(&sim.id).await.unwrap().unwrap();
        assert_eq!(stored.histogram_intersection, Some(1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hardware_scored_against_calibration() {
        let store = Arc::new(MemoryStore::new());
        let job_id = SelectionJobId::new();
        let user_id = Uuid::new_v4();

        let device = hardware(job_id, user_id);
        let sim = simulator(job_id, user_id);
        store.save_candidate(&device).await.unwrap();
        store.save_candidate(&sim).await.unwrap();

        finish(
            &store,
            &device,
            Counts::from_pairs([("00", 450u64), ("01", 150u64), ("11", 400u64)]),
            1000,
        )
        .await;
        finish(
            &store,
            &sim,
            Counts::from_pairs([("00", 500u64), ("11", 500u64)]),
            1000,
        )
        .await;

        let ranking = Arc::new(RecordingRanking {
            samples: Mutex::new(Vec::new()),
        });
        let evaluator =
            QualityEvaluator::new(store.clone(), fast_config()).with_ranking(ranking.clone());

        // min(450,500) + min(400,500) = 850 over 1000 calibration shots.
        assert_eq!(evaluator.evaluate(&device.id).await, Some(0.85));

        let stored = store
            .load_result_for_candidate(&device.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.histogram_intersection, Some(0.85));

        let samples = ranking.samples.lock().unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].histogram_intersection, 0.85);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_calibration_result_leaves_unscored() {
        let store = Arc::new(MemoryStore::new());
        let job_id = SelectionJobId::new();
        let user_id = Uuid::new_v4();

        let device = hardware(job_id, user_id);
        let sim = simulator(job_id, user_id);
        store.save_candidate(&device).await.unwrap();
        store.save_candidate(&sim).await.unwrap();
        finish(&store, &device, Counts::from_pairs([("00", 100u64)]), 100).await;
        // No calibration execution saved at all.

        let evaluator = QualityEvaluator::new(store.clone(), fast_config());
        assert_eq!(evaluator.evaluate(&device.id).await, None);

        let stored = store
            .load_result_for_candidate(&device.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.histogram_intersection.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_calibration_leaves_unscored() {
        let store = Arc::new(MemoryStore::new());
        let job_id = SelectionJobId::new();
        let user_id = Uuid::new_v4();

        let device = hardware(job_id, user_id);
        let sim = simulator(job_id, user_id);
        store.save_candidate(&device).await.unwrap();
        store.save_candidate(&sim).await.unwrap();
        finish(&store, &device, Counts::from_pairs([("00", 100u64)]), 100).await;

        let failed = ExecutionResult::new(100)
            .for_candidate(sim.id.0)
            .failed("device went offline");
        store.save_result(&failed).await.unwrap();

        let evaluator = QualityEvaluator::new(store.clone(), fast_config());
        assert_eq!(evaluator.evaluate(&device.id).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disjoint_histograms_store_nothing() {
        let store = Arc::new(MemoryStore::new());
        let job_id = SelectionJobId::new();
        let user_id = Uuid::new_v4();

        let device = hardware(job_id, user_id);
        let sim = simulator(job_id, user_id);
        store.save_candidate(&device).await.unwrap();
        store.save_candidate(&sim).await.unwrap();
        finish(&store, &device, Counts::from_pairs([("01", 100u64)]), 100).await;
        finish(&store, &sim, Counts::from_pairs([("00", 100u64)]), 100).await;

        let evaluator = QualityEvaluator::new(store.clone(), fast_config());
        assert_eq!(evaluator.evaluate(&device.id).await, None);

        let stored = store
            .load_result_for_candidate(&device.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.histogram_intersection.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_candidate_is_unscored() {
        let store = Arc::new(MemoryStore::new());
        let evaluator = QualityEvaluator::new(store, fast_config());
        assert_eq!(evaluator.evaluate(&CandidateId::new()).await, None);
    }
}
