//! qsel selection pipeline.
//!
//! Owns the asynchronous job lifecycle that narrows the full
//! (QPU × provider × compiler) candidate space for a circuit down to a
//! bounded, preference-ranked set:
//!
//! ```text
//!   submit() ──→ Initialized ──→ Running ──→ Ready
//!                                   │
//!                                   └──→ Failed(reason)
//!
//!   Running = generate ──→ compile (join) ──→ policy ──→ finalize
//! ```
//!
//! Each job runs on its own detached tokio task; callers receive the job
//! id immediately and poll for `Ready`. Within a job, per-candidate
//! compilations run through a bounded worker pool and rejoin before the
//! selection policy is applied. Candidates that fail compilation or the
//! feasibility check are deleted from storage, never merely flagged, and
//! never re-created afterwards.

mod error;
mod generator;
mod job;
mod manager;
mod pipeline;
mod policy;
pub mod persistence;

pub use error::{SchedError, SchedResult};
pub use generator::{CandidateGenerator, GeneratedSet, GeneratorConfig};
pub use job::{Candidate, CandidateId, SelectionJob, SelectionJobId, SelectionJobStatus};
pub use manager::{JobManager, JobManagerConfig, SelectionRequest};
pub use pipeline::CompilationPipeline;
pub use policy::{PolicyConfig, SelectionPolicyEngine, SelectionPreference};
pub use persistence::{JsonStore, MemoryStore, StateStore};
