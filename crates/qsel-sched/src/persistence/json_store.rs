//! JSON file-based persistence for development and small deployments.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::fs;
use tokio::sync::RwLock;
use uuid::Uuid;

use qsel_hal::ExecutionResult;

use crate::error::{SchedError, SchedResult};
use crate::job::{Candidate, CandidateId, SelectionJob, SelectionJobId, SelectionJobStatus};
use crate::persistence::StateStore;

/// JSON file-based state store.
///
/// Stores each job, candidate and result as a separate JSON file.
/// Suitable for development and single-node use.
pub struct JsonStore {
    /// Base directory for storage.
    base_dir: PathBuf,

    /// In-memory cache of jobs.
    cache: RwLock<FxHashMap<SelectionJobId, SelectionJob>>,
}

impl JsonStore {
    /// Create a new JSON store at the given path.
    pub async fn new(base_dir: impl AsRef<Path>) -> SchedResult<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();

        fs::create_dir_all(base_dir.join("jobs")).await?;
        fs::create_dir_all(base_dir.join("candidates")).await?;
        fs::create_dir_all(base_dir.join("results")).await?;

        let store = Self {
            base_dir,
            cache: RwLock::new(FxHashMap::default()),
        };
        store.load_all_jobs().await?;

        Ok(store)
    }

    fn job_path(&self, job_id: &SelectionJobId) -> PathBuf {
        self.base_dir.join("jobs").join(format!("{job_id}.json"))
    }

    fn candidate_path(&self, candidate_id: &CandidateId) -> PathBuf {
        self.base_dir
            .join("candidates")
            .join(format!("{candidate_id}.json"))
    }

    fn result_path(&self, candidate_id: &CandidateId) -> PathBuf {
        self.base_dir
            .join("results")
            .join(format!("{candidate_id}.json"))
    }

    async fn load_all_jobs(&self) -> SchedResult<()> {
        let jobs_dir = self.base_dir.join("jobs");
        let mut cache = self.cache.write().await;

        let mut entries = fs::read_dir(&jobs_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match fs::read_to_string(&path).await {
                    Ok(content) => match serde_json::from_str::<SelectionJob>(&content) {
                        Ok(job) => {
                            cache.insert(job.id, job);
                        }
                        Err(e) => {
                            tracing::warn!("Failed to parse job file {:?}: {}", path, e);
                        }
                    },
                    Err(e) => {
                        tracing::warn!("Failed to read job file {:?}: {}", path, e);
                    }
                }
            }
        }

        Ok(())
    }

    async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> SchedResult<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SchedError::IoError(e)),
        }
    }

    async fn remove_file(path: &Path) -> SchedResult<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SchedError::IoError(e)),
        }
    }
}

#[async_trait]
impl StateStore for JsonStore {
    async fn save_job(&self, job: &SelectionJob) -> SchedResult<()> {
        let json = serde_json::to_string_pretty(job)?;
        fs::write(self.job_path(&job.id), json).await?;

        let mut cache = self.cache.write().await;
        cache.insert(job.id, job.clone());

        Ok(())
    }

    async fn load_job(&self, job_id: &SelectionJobId) -> SchedResult<Option<SelectionJob>> {
        {
            let cache = self.cache.read().await;
            if let Some(job) = cache.get(job_id) {
                return Ok(Some(job.clone()));
            }
        }

        match Self::read_json::<SelectionJob>(&self.job_path(job_id)).await? {
            Some(job) => {
                let mut cache = self.cache.write().await;
                cache.insert(job.id, job.clone());
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    async fn update_job_status(
        &self,
        job_id: &SelectionJobId,
        status: SelectionJobStatus,
    ) -> SchedResult<()> {
        let Some(mut job) = self.load_job(job_id).await? else {
            return Err(SchedError::JobNotFound(job_id.to_string()));
        };
        job.status = status;
        self.save_job(&job).await
    }

    async fn delete_job(&self, job_id: &SelectionJobId) -> SchedResult<bool> {
        for candidate in self.list_candidates(job_id).await? {
            self.delete_candidate(&candidate.id).await?;
        }

        let mut cache = self.cache.write().await;
        cache.remove(job_id);
        drop(cache);

        Self::remove_file(&self.job_path(job_id)).await
    }

    async fn save_candidate(&self, candidate: &Candidate) -> SchedResult<()> {
        let json = serde_json::to_string_pretty(candidate)?;
        fs::write(self.candidate_path(&candidate.id), json).await?;
        Ok(())
    }

    async fn load_candidate(&self, candidate_id: &CandidateId) -> SchedResult<Option<Candidate>> {
        Self::read_json(&self.candidate_path(candidate_id)).await
    }

    async fn delete_candidate(&self, candidate_id: &CandidateId) -> SchedResult<bool> {
        Self::remove_file(&self.result_path(candidate_id)).await?;
        Self::remove_file(&self.candidate_path(candidate_id)).await
    }

    async fn list_candidates(&self, job_id: &SelectionJobId) -> SchedResult<Vec<Candidate>> {
        let dir = self.base_dir.join("candidates");
        let mut candidates = Vec::new();

        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            if let Some(candidate) = Self::read_json::<Candidate>(&path).await? {
                if candidate.job_id == *job_id {
                    candidates.push(candidate);
                }
            }
        }

        Ok(candidates)
    }

    async fn save_result(&self, result: &ExecutionResult) -> SchedResult<()> {
        let Some(candidate_id) = result.candidate_id else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(result)?;
        fs::write(self.result_path(&CandidateId(candidate_id)), json).await?;
        Ok(())
    }

    async fn load_result_for_candidate(
        &self,
        candidate_id: &CandidateId,
    ) -> SchedResult<Option<ExecutionResult>> {
        Self::read_json(&self.result_path(candidate_id)).await
    }

    async fn list_results_for_user(&self, user_id: &Uuid) -> SchedResult<Vec<ExecutionResult>> {
        let dir = self.base_dir.join("results");
        let mut results = Vec::new();

        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            if let Some(result) = Self::read_json::<ExecutionResult>(&path).await? {
                if result.user_id.as_ref() == Some(user_id) {
                    results.push(result);
                }
            }
        }

        Ok(results)
    }
}
