//! Persistence layer for job, candidate and execution-result state.

mod json_store;
mod memory_store;

pub use json_store::JsonStore;
pub use memory_store::MemoryStore;

use async_trait::async_trait;
use uuid::Uuid;

use qsel_hal::ExecutionResult;

use crate::error::SchedResult;
use crate::job::{Candidate, CandidateId, SelectionJob, SelectionJobId, SelectionJobStatus};

/// Trait for persistent pipeline state storage.
///
/// Jobs exclusively own their candidates: deleting a job cascades to its
/// candidates and their execution results.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Save a job to the store.
    async fn save_job(&self, job: &SelectionJob) -> SchedResult<()>;

    /// Load a job from the store.
    async fn load_job(&self, job_id: &SelectionJobId) -> SchedResult<Option<SelectionJob>>;

    /// Update a job's status.
    async fn update_job_status(
        &self,
        job_id: &SelectionJobId,
        status: SelectionJobStatus,
    ) -> SchedResult<()>;

    /// Delete a job and everything it owns.
    async fn delete_job(&self, job_id: &SelectionJobId) -> SchedResult<bool>;

    /// Save (insert or replace) a candidate.
    async fn save_candidate(&self, candidate: &Candidate) -> SchedResult<()>;

    /// Load a candidate.
    async fn load_candidate(&self, candidate_id: &CandidateId) -> SchedResult<Option<Candidate>>;

    /// Delete a candidate.
    async fn delete_candidate(&self, candidate_id: &CandidateId) -> SchedResult<bool>;

    /// All candidates belonging to a job.
    async fn list_candidates(&self, job_id: &SelectionJobId) -> SchedResult<Vec<Candidate>>;

    /// Save an execution result.
    async fn save_result(&self, result: &ExecutionResult) -> SchedResult<()>;

    /// Load the execution result attached to a candidate.
    async fn load_result_for_candidate(
        &self,
        candidate_id: &CandidateId,
    ) -> SchedResult<Option<ExecutionResult>>;

    /// All execution results owned by a user (execution history).
    async fn list_results_for_user(&self, user_id: &Uuid) -> SchedResult<Vec<ExecutionResult>>;
}
