//! qsel Hardware/Compiler Abstraction Layer
//!
//! This crate defines the contracts qsel holds against its external
//! collaborators, so the selection pipeline can be exercised against mocks
//! and wired to real services without changes:
//!
//! - [`CompilerConnector`]: compiles a circuit for a concrete
//!   (provider, device) pair and reports the analyzed metrics.
//! - [`TranslatorService`]: best-effort circuit-language translation.
//! - [`RankingService`]: prediction-based candidate ordering (MCDA
//!   services behind one trait; the numeric methods stay external).
//! - [`ConnectorRegistry`]: name-keyed connector discovery.
//! - [`ExecutionResult`] / [`Counts`]: unified measurement-histogram
//!   result handling.
//!
//! # Design principles
//!
//! - **Async-native**: every method that may do I/O is async.
//! - **Thread-safe**: `Send + Sync` bounds enable shared ownership across
//!   concurrently running selection jobs.
//! - **Soft failure at the edges**: a translator that cannot translate
//!   returns `Ok(None)`, a ranking service with nothing usable returns
//!   `Ok(None)`; only infrastructure problems surface as [`HalError`].

mod connector;
mod error;
mod ranking;
mod registry;
mod result;
mod translator;

pub use connector::{CircuitInformation, CompilerConnector, ProviderCredentials};
pub use error::{HalError, HalResult};
pub use ranking::{RankingAlternative, RankingCriteria, RankingService, WeightLearningSample};
pub use registry::ConnectorRegistry;
pub use result::{Counts, ExecutionResult, ExecutionResultId, ExecutionStatus};
pub use translator::TranslatorService;
