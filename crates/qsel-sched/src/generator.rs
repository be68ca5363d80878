//! Candidate generation: the full pre-compilation candidate space.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use qsel_model::Qpu;

use crate::job::{Candidate, CandidateId, SelectionJobId};

/// Configuration for candidate generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Providers a job may target; `None` means all. Matched
    /// case-insensitively.
    pub provider_allow_list: Option<Vec<String>>,

    /// Device name of the designated calibration simulator.
    pub calibration_simulator: String,

    /// Simulator device names that duplicate the designated simulator and
    /// are skipped outright (e.g. statevector/unitary variants).
    pub non_canonical_simulators: Vec<String>,

    /// (compiler, device) pairs that are explicitly incompatible.
    pub incompatible_pairs: Vec<(String, String)>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider_allow_list: None,
            calibration_simulator: "aer_simulator".to_string(),
            non_canonical_simulators: Vec::new(),
            incompatible_pairs: Vec::new(),
        }
    }
}

impl GeneratorConfig {
    /// Restrict generation to the given providers.
    pub fn with_allowed_providers(
        mut self,
        providers: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.provider_allow_list = Some(providers.into_iter().map(Into::into).collect());
        self
    }

    /// Set the designated calibration simulator device name.
    pub fn with_calibration_simulator(mut self, name: impl Into<String>) -> Self {
        self.calibration_simulator = name.into();
        self
    }

    /// Skip a duplicate simulator device.
    pub fn skip_simulator(mut self, name: impl Into<String>) -> Self {
        self.non_canonical_simulators.push(name.into());
        self
    }

    /// Mark a (compiler, device) pair incompatible.
    pub fn exclude_pair(mut self, compiler: impl Into<String>, device: impl Into<String>) -> Self {
        self.incompatible_pairs.push((compiler.into(), device.into()));
        self
    }

    fn provider_allowed(&self, provider: &str) -> bool {
        match &self.provider_allow_list {
            None => true,
            Some(allowed) => allowed.iter().any(|p| p.eq_ignore_ascii_case(provider)),
        }
    }

    fn pair_excluded(&self, compiler: &str, device: &str) -> bool {
        self.incompatible_pairs
            .iter()
            .any(|(c, d)| c.eq_ignore_ascii_case(compiler) && d.eq_ignore_ascii_case(device))
    }
}

/// The generated candidate space plus the calibration candidate handle.
#[derive(Debug, Clone)]
pub struct GeneratedSet {
    /// All generated candidates, pre-compilation.
    pub candidates: Vec<Candidate>,

    /// The candidate whose device is the designated calibration simulator.
    /// Callers keep this handle through every later pruning step.
    pub calibration: Option<CandidateId>,
}

/// Enumerates feasible-by-construction (QPU, provider, compiler) triples.
#[derive(Debug, Clone, Default)]
pub struct CandidateGenerator {
    config: GeneratorConfig,
}

impl CandidateGenerator {
    /// Create a generator with the given configuration.
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Generate the full candidate space for a job.
    ///
    /// A provider with zero QPUs simply contributes nothing. An empty
    /// compiler set yields an empty space; the job still completes with an
    /// empty result list.
    pub fn generate(
        &self,
        job_id: SelectionJobId,
        user_id: Uuid,
        qpus: &[Qpu],
        compilers: &[String],
    ) -> GeneratedSet {
        if compilers.is_empty() {
            warn!("No compilers requested or registered; candidate space is empty");
            return GeneratedSet {
                candidates: Vec::new(),
                calibration: None,
            };
        }

        let mut candidates = Vec::new();
        let mut calibration = None;

        for qpu in qpus {
            if !self.config.provider_allowed(&qpu.provider) {
                debug!("Provider {} not in allow-list; skipping {}", qpu.provider, qpu.name);
                continue;
            }
            if qpu.is_simulator
                && self
                    .config
                    .non_canonical_simulators
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(&qpu.name))
            {
                debug!("Skipping duplicate simulator {}", qpu.name);
                continue;
            }

            for compiler in compilers {
                if self.config.pair_excluded(compiler, &qpu.name) {
                    debug!("Skipping incompatible pair ({compiler}, {})", qpu.name);
                    continue;
                }

                let candidate = Candidate::new(job_id, user_id, qpu, compiler.clone());
                if calibration.is_none()
                    && qpu.name.eq_ignore_ascii_case(&self.config.calibration_simulator)
                {
                    calibration = Some(candidate.id);
                }
                candidates.push(candidate);
            }
        }

        debug!(
            "Generated {} candidates for job {} (calibration: {:?})",
            candidates.len(),
            job_id,
            calibration
        );
        GeneratedSet {
            candidates,
            calibration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devices() -> Vec<Qpu> {
        vec![
            Qpu::new("ibmq_lima", "ibmq", 5)
                .with_decoherence(100.0, 80.0)
                .with_max_gate_time(10.0),
            Qpu::simulator("aer_simulator", "ibmq", 32),
            Qpu::simulator("statevector_simulator", "ibmq", 32),
            Qpu::new("aspen_m", "rigetti", 80),
        ]
    }

    fn compilers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_full_cross_product_with_skips() {
        let generator = CandidateGenerator::new(
            GeneratorConfig::default().skip_simulator("statevector_simulator"),
        );
        let set = generator.generate(
            SelectionJobId::new(),
            Uuid::new_v4(),
            &devices(),
            &compilers(&["qiskit", "pytket"]),
        );

        // 3 devices survive (statevector dropped) × 2 compilers.
        assert_eq!(set.candidates.len(), 6);
        assert!(set.calibration.is_some());
        let calibration = set
            .candidates
            .iter()
            .find(|c| Some(c.id) == set.calibration)
            .unwrap();
        assert_eq!(calibration.qpu_name, "aer_simulator");
    }

    #[test]
    fn test_provider_allow_list_case_insensitive() {
        let generator = CandidateGenerator::new(
            GeneratorConfig::default().with_allowed_providers(["IBMQ"]),
        );
        let set = generator.generate(
            SelectionJobId::new(),
            Uuid::new_v4(),
            &devices(),
            &compilers(&["qiskit"]),
        );
        assert!(set.candidates.iter().all(|c| c.provider == "ibmq"));
    }

    #[test]
    fn test_incompatible_pair_skipped() {
        let generator = CandidateGenerator::new(
            GeneratorConfig::default().exclude_pair("pytket", "aer_simulator"),
        );
        let set = generator.generate(
            SelectionJobId::new(),
            Uuid::new_v4(),
            &devices(),
            &compilers(&["qiskit", "pytket"]),
        );
        assert!(
            !set.candidates
                .iter()
                .any(|c| c.compiler == "pytket" && c.qpu_name == "aer_simulator")
        );
        // The qiskit/simulator pairing still exists and is the calibration.
        assert!(set.calibration.is_some());
    }

    #[test]
    fn test_empty_compiler_set_yields_empty_space() {
        let generator = CandidateGenerator::default();
        let set = generator.generate(SelectionJobId::new(), Uuid::new_v4(), &devices(), &[]);
        assert!(set.candidates.is_empty());
        assert!(set.calibration.is_none());
    }

    #[test]
    fn test_candidates_carry_job_and_user() {
        let job_id = SelectionJobId::new();
        let user_id = Uuid::new_v4();
        let generator = CandidateGenerator::default();
        let set = generator.generate(job_id, user_id, &devices(), &compilers(&["qiskit"]));
        assert!(set.candidates.iter().all(|c| c.job_id == job_id && c.user_id == user_id));
    }
}
