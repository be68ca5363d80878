//! Preference-driven narrowing of the compiled candidate set.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use qsel_hal::{
    ExecutionResult, RankingAlternative, RankingCriteria, RankingService,
};
use qsel_model::Circuit;

use crate::error::SchedResult;
use crate::job::{Candidate, CandidateId};
use crate::persistence::StateStore;

/// How a user wants the final candidate set narrowed.
///
/// When both preferences are requested, short waiting time wins; the
/// request layer resolves that before the policy engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionPreference {
    /// Keep the devices with the shortest queues.
    ShortWaitingTime,
    /// Keep the devices predicted to give the most precise results.
    PreciseResults,
}

/// Policy engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Upper bound on the candidate set after a preference is applied.
    /// The calibration candidate does not count against this bound.
    pub max_candidates: usize,

    /// Relative importance of queue size for prediction-based ranking,
    /// in [0, 1].
    pub queue_importance: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_candidates: 5,
            queue_importance: 0.5,
        }
    }
}

impl PolicyConfig {
    /// Bound the post-policy candidate set.
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates.max(1);
        self
    }

    /// Set the queue-importance weight for prediction-based ranking.
    pub fn with_queue_importance(mut self, queue_importance: f64) -> Self {
        self.queue_importance = queue_importance.clamp(0.0, 1.0);
        self
    }
}

/// Applies the selected preference to the compiled survivors.
///
/// Candidates dropped here are deleted from storage, exactly like
/// candidates dropped during compilation.
pub struct SelectionPolicyEngine {
    store: Arc<dyn StateStore>,
    ranking: Option<Arc<dyn RankingService>>,
    config: PolicyConfig,
}

impl SelectionPolicyEngine {
    /// Create a policy engine without a ranking service.
    pub fn new(store: Arc<dyn StateStore>, config: PolicyConfig) -> Self {
        Self {
            store,
            ranking: None,
            config,
        }
    }

    /// Attach a prediction-based ranking service.
    pub fn with_ranking(mut self, ranking: Arc<dyn RankingService>) -> Self {
        self.ranking = Some(ranking);
        self
    }

    /// Narrow `candidates` per the user's preference and garbage-collect
    /// the rest from storage.
    ///
    /// With no preference the set passes through untouched. The calibration
    /// candidate, when present, is always part of the returned set even if
    /// the preference would have dropped it.
    pub async fn apply(
        &self,
        circuit: &Circuit,
        candidates: Vec<Candidate>,
        calibration: Option<CandidateId>,
        preference: Option<SelectionPreference>,
        history: &[ExecutionResult],
    ) -> SchedResult<Vec<Candidate>> {
        let mut kept = match preference {
            None => candidates.clone(),
            Some(SelectionPreference::ShortWaitingTime) => {
                self.shortest_queues(candidates.clone())
            }
            Some(SelectionPreference::PreciseResults) => {
                self.rank_by_prediction(circuit, candidates.clone(), history)
                    .await
            }
        };

        self.reinsert_calibration(&mut kept, &candidates, calibration);

        // Garbage-collect everything the preference dropped.
        let kept_ids: Vec<CandidateId> = kept.iter().map(|c| c.id).collect();
        for candidate in &candidates {
            if !kept_ids.contains(&candidate.id) {
                self.store.delete_candidate(&candidate.id).await?;
            }
        }

        // Survivors are re-read from storage; copies mutated in memory
        // during ranking are not trusted.
        let mut survivors = Vec::with_capacity(kept_ids.len());
        for id in &kept_ids {
            if let Some(stored) = self.store.load_candidate(id).await? {
                survivors.push(stored);
            }
        }
        Ok(survivors)
    }

    /// Order by device queue size ascending and keep the head of the list.
    fn shortest_queues(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.sort_by_key(|c| c.queue_size);
        candidates.truncate(self.config.max_candidates);
        candidates
    }

    /// Order by the ranking service's prediction and keep the head.
    ///
    /// Prediction needs evidence: at least one historical execution with a
    /// histogram intersection strictly inside (0, 1). A lone perfect score
    /// carries no information about how devices differ. Without evidence,
    /// or when the service declines or fails, the full set passes through.
    async fn rank_by_prediction(
        &self,
        circuit: &Circuit,
        candidates: Vec<Candidate>,
        history: &[ExecutionResult],
    ) -> Vec<Candidate> {
        let Some(ranking) = &self.ranking else {
            debug!("No ranking service configured; keeping full candidate set");
            return candidates;
        };

        let evidence = history.iter().any(|r| {
            r.histogram_intersection
                .is_some_and(|v| v > 0.0 && v < 1.0)
        });
        if !evidence {
            debug!("No usable execution history; keeping full candidate set");
            return candidates;
        }

        let criteria = RankingCriteria {
            width: circuit.width,
            depth: circuit.depth,
            gate_count: circuit.gate_count,
            multi_qubit_gate_count: circuit.multi_qubit_gate_count,
            measurement_count: circuit.measurement_count,
            queue_importance: self.config.queue_importance,
        };
        let alternatives: Vec<RankingAlternative> = candidates
            .iter()
            .map(|c| RankingAlternative {
                id: c.id.0,
                queue_size: c.queue_size,
                t1: c.t1,
                max_gate_time: c.max_gate_time,
                avg_gate_error: c.avg_gate_error,
                analyzed_depth: c.analyzed_depth,
                analyzed_width: c.analyzed_width,
            })
            .collect();

        let order = match ranking.rank(&criteria, &alternatives).await {
            Ok(Some(order)) if !order.is_empty() => order,
            Ok(_) => {
                warn!("Ranking service produced no ordering; keeping full candidate set");
                return candidates;
            }
            Err(e) => {
                warn!("Ranking service failed: {e}; keeping full candidate set");
                return candidates;
            }
        };

        let mut by_id: FxHashMap<CandidateId, Candidate> =
            candidates.into_iter().map(|c| (c.id, c)).collect();
        let mut ordered = Vec::new();
        for id in order {
            if let Some(candidate) = by_id.remove(&CandidateId(id)) {
                ordered.push(candidate);
            }
        }
        ordered.truncate(self.config.max_candidates);
        ordered
    }

    /// Put the calibration candidate back if a preference dropped it.
    fn reinsert_calibration(
        &self,
        kept: &mut Vec<Candidate>,
        all: &[Candidate],
        calibration: Option<CandidateId>,
    ) {
        let Some(calibration_id) = calibration else {
            return;
        };
        if kept.iter().any(|c| c.id == calibration_id) {
            return;
        }
        if let Some(candidate) = all.iter().find(|c| c.id == calibration_id) {
            debug!("Re-inserting calibration candidate {}", calibration_id);
            kept.push(candidate.clone());
        }
    }
}
