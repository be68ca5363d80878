//! In-memory persistence for tests and single-process deployments.

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use qsel_hal::ExecutionResult;

use crate::error::SchedResult;
use crate::job::{Candidate, CandidateId, SelectionJob, SelectionJobId, SelectionJobStatus};
use crate::persistence::StateStore;

/// In-memory state store.
#[derive(Default)]
pub struct MemoryStore {
    jobs: RwLock<FxHashMap<SelectionJobId, SelectionJob>>,
    candidates: RwLock<FxHashMap<CandidateId, Candidate>>,
    /// Execution results keyed by owning candidate.
    results: RwLock<FxHashMap<CandidateId, ExecutionResult>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn save_job(&self, job: &SelectionJob) -> SchedResult<()> {
        let mut jobs = self.jobs.write().await;
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn load_job(&self, job_id: &SelectionJobId) -> SchedResult<Option<SelectionJob>> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(job_id).cloned())
    }

    async fn update_job_status(
        &self,
        job_id: &SelectionJobId,
        status: SelectionJobStatus,
    ) -> SchedResult<()> {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            job.status = status;
        }
        Ok(())
    }

    async fn delete_job(&self, job_id: &SelectionJobId) -> SchedResult<bool> {
        let mut jobs = self.jobs.write().await;
        let removed = jobs.remove(job_id).is_some();
        drop(jobs);

        // Cascade to owned candidates and their results.
        let mut candidates = self.candidates.write().await;
        let owned: Vec<CandidateId> = candidates
            .values()
            .filter(|c| c.job_id == *job_id)
            .map(|c| c.id)
            .collect();
        for id in &owned {
            candidates.remove(id);
        }
        drop(candidates);

        let mut results = self.results.write().await;
        for id in &owned {
            results.remove(id);
        }

        Ok(removed)
    }

    async fn save_candidate(&self, candidate: &Candidate) -> SchedResult<()> {
        let mut candidates = self.candidates.write().await;
        candidates.insert(candidate.id, candidate.clone());
        Ok(())
    }

    async fn load_candidate(&self, candidate_id: &CandidateId) -> SchedResult<Option<Candidate>> {
        let candidates = self.candidates.read().await;
        Ok(candidates.get(candidate_id).cloned())
    }

    async fn delete_candidate(&self, candidate_id: &CandidateId) -> SchedResult<bool> {
        let mut candidates = self.candidates.write().await;
        let removed = candidates.remove(candidate_id).is_some();
        drop(candidates);

        let mut results = self.results.write().await;
        results.remove(candidate_id);

        Ok(removed)
    }

    async fn list_candidates(&self, job_id: &SelectionJobId) -> SchedResult<Vec<Candidate>> {
        let candidates = self.candidates.read().await;
        Ok(candidates
            .values()
            .filter(|c| c.job_id == *job_id)
            .cloned()
            .collect())
    }

    async fn save_result(&self, result: &ExecutionResult) -> SchedResult<()> {
        if let Some(candidate_id) = result.candidate_id {
            let mut results = self.results.write().await;
            results.insert(CandidateId(candidate_id), result.clone());
        }
        Ok(())
    }

    async fn load_result_for_candidate(
        &self,
        candidate_id: &CandidateId,
    ) -> SchedResult<Option<ExecutionResult>> {
        let results = self.results.read().await;
        Ok(results.get(candidate_id).cloned())
    }

    async fn list_results_for_user(&self, user_id: &Uuid) -> SchedResult<Vec<ExecutionResult>> {
        let results = self.results.read().await;
        Ok(results
            .values()
            .filter(|r| r.user_id.as_ref() == Some(user_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qsel_model::{CircuitId, Qpu};

    #[tokio::test]
    async fn test_job_roundtrip_and_status_update() {
        let store = MemoryStore::new();
        let job = SelectionJob::new(Uuid::new_v4(), CircuitId::new());
        store.save_job(&job).await.unwrap();

        store
            .update_job_status(&job.id, SelectionJobStatus::Running)
            .await
            .unwrap();

        let loaded = store.load_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, SelectionJobStatus::Running);
    }

    #[tokio::test]
    async fn test_delete_job_cascades() {
        let store = MemoryStore::new();
        let job = SelectionJob::new(Uuid::new_v4(), CircuitId::new());
        store.save_job(&job).await.unwrap();

        let qpu = Qpu::new("ibmq_lima", "ibmq", 5);
        let candidate = Candidate::new(job.id, job.user_id, &qpu, "qiskit");
        store.save_candidate(&candidate).await.unwrap();

        let result = ExecutionResult::new(1000)
            .for_candidate(candidate.id.0)
            .for_user(job.user_id);
        store.save_result(&result).await.unwrap();

        assert!(store.delete_job(&job.id).await.unwrap());
        assert!(store.load_candidate(&candidate.id).await.unwrap().is_none());
        assert!(
            store
                .load_result_for_candidate(&candidate.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_results_by_user() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let job = SelectionJob::new(user, CircuitId::new());
        let qpu = Qpu::new("ibmq_lima", "ibmq", 5);

        for _ in 0..2 {
            let candidate = Candidate::new(job.id, user, &qpu, "qiskit");
            store.save_candidate(&candidate).await.unwrap();
            let result = ExecutionResult::new(100)
                .for_candidate(candidate.id.0)
                .for_user(user);
            store.save_result(&result).await.unwrap();
        }

        assert_eq!(store.list_results_for_user(&user).await.unwrap().len(), 2);
        assert!(
            store
                .list_results_for_user(&Uuid::new_v4())
                .await
                .unwrap()
                .is_empty()
        );
    }
}
