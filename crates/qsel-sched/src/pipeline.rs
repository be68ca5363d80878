//! Compilation orchestration: feasibility-check and annotate candidates.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use rustc_hash::FxHashMap;
use tracing::debug;

use qsel_hal::{
    CompilerConnector, ConnectorRegistry, ProviderCredentials, TranslatorService,
};
use qsel_model::{Circuit, CircuitLanguage};

use crate::error::SchedResult;
use crate::job::Candidate;
use crate::persistence::StateStore;

/// Default width of the per-job compilation worker pool.
const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Turns generated candidates into feasibility-checked, metric-annotated
/// entries, deleting the rest from storage.
pub struct CompilationPipeline {
    registry: Arc<ConnectorRegistry>,
    translator: Arc<dyn TranslatorService>,
    store: Arc<dyn StateStore>,
    max_concurrent: usize,
}

impl CompilationPipeline {
    /// Create a pipeline over a connector registry and translator.
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        translator: Arc<dyn TranslatorService>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            registry,
            translator,
            store,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    /// Bound the compilation worker pool.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// The shared connector registry.
    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    /// Compile every candidate and return the survivors.
    ///
    /// A compiler with no registered connector is a configuration error and
    /// fatal to the whole job; it is detected up front, before any work is
    /// spawned. Per-candidate failures (translation unavailable, compile
    /// rejected, infeasible on the device) drop that candidate only.
    ///
    /// Candidates run through a bounded worker pool; the method returns
    /// only after every compilation has completed (the join point before
    /// policy application).
    pub async fn compile_all(
        &self,
        circuit: &Circuit,
        candidates: Vec<Candidate>,
        credentials: &FxHashMap<String, ProviderCredentials>,
    ) -> SchedResult<Vec<Candidate>> {
        // Pre-flight connector lookup: fail the job before spawning work.
        let mut connectors: FxHashMap<String, Arc<dyn CompilerConnector>> = FxHashMap::default();
        for candidate in &candidates {
            if !connectors.contains_key(&candidate.compiler) {
                let connector = self.registry.for_sdk(&candidate.compiler)?;
                connectors.insert(candidate.compiler.clone(), connector);
            }
        }

        let outcomes: Vec<(Candidate, bool)> = stream::iter(candidates)
            .map(|candidate| {
                let connector = connectors[&candidate.compiler].clone();
                let creds = credentials
                    .get(&candidate.provider)
                    .cloned()
                    .unwrap_or_else(|| ProviderCredentials::new(candidate.provider.clone()));
                async move {
                    let kept = self.compile_one(circuit, &connector, &creds, &candidate).await;
                    match kept {
                        Some(candidate) => (candidate, true),
                        None => (candidate, false),
                    }
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut survivors = Vec::new();
        for (candidate, kept) in outcomes {
            if kept {
                self.store.save_candidate(&candidate).await?;
                survivors.push(candidate);
            } else {
                self.store.delete_candidate(&candidate.id).await?;
            }
        }

        Ok(survivors)
    }

    /// Compile one candidate; `None` means it was filtered out.
    async fn compile_one(
        &self,
        circuit: &Circuit,
        connector: &Arc<dyn CompilerConnector>,
        credentials: &ProviderCredentials,
        candidate: &Candidate,
    ) -> Option<Candidate> {
        let accepted = connector.languages_for(&candidate.compiler);

        let (source, language) = if accepted.contains(&circuit.language) {
            (circuit.source.clone(), circuit.language.clone())
        } else {
            self.translate_for(circuit, &accepted, candidate).await?
        };

        let mut prepared = circuit.clone();
        prepared.source = source;
        prepared.language = language.clone();

        let info = match connector
            .compile(
                &prepared,
                &language,
                &candidate.provider,
                &candidate.qpu_name,
                credentials,
            )
            .await
        {
            Ok(info) => info,
            Err(e) => {
                debug!(
                    "Compilation of {} on {} with {} failed: {e}",
                    circuit.name, candidate.qpu_name, candidate.compiler
                );
                return None;
            }
        };

        let mut candidate = candidate.clone();
        candidate.apply_compilation(info);

        if candidate.failed_compilation() {
            debug!(
                "Connector reported empty metrics for {} on {}; pruning",
                circuit.name, candidate.qpu_name
            );
            return None;
        }
        if !candidate.is_feasible() {
            debug!(
                "Candidate {} on {} infeasible (depth {} vs budget {:.1}, width {} vs {} qubits)",
                candidate.id,
                candidate.qpu_name,
                candidate.analyzed_depth,
                if candidate.max_gate_time > 0.0 {
                    candidate.t1 / candidate.max_gate_time
                } else {
                    0.0
                },
                candidate.analyzed_width,
                candidate.qubit_count
            );
            return None;
        }

        Some(candidate)
    }

    /// Translate the circuit into a language the connector accepts.
    ///
    /// Returns `None` when no common language exists between translator and
    /// compiler or the translation itself fails; the candidate is filtered
    /// out, not errored.
    async fn translate_for(
        &self,
        circuit: &Circuit,
        accepted: &[CircuitLanguage],
        candidate: &Candidate,
    ) -> Option<(String, CircuitLanguage)> {
        let translatable = self.translator.supported_languages();
        if !translatable.contains(&circuit.language) {
            debug!(
                "Translator cannot read {}; dropping candidate {}",
                circuit.language, candidate.id
            );
            return None;
        }

        let target = accepted.iter().find(|l| translatable.contains(l))?;

        match self
            .translator
            .translate(&circuit.source, &circuit.language, target)
            .await
        {
            Ok(Some(source)) => Some((source, target.clone())),
            Ok(None) => {
                debug!(
                    "No translation path {} -> {} for candidate {}",
                    circuit.language, target, candidate.id
                );
                None
            }
            Err(e) => {
                debug!("Translation failed for candidate {}: {e}", candidate.id);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use uuid::Uuid;

    use qsel_hal::{CircuitInformation, HalError, HalResult};
    use qsel_model::Qpu;

    use crate::job::SelectionJobId;
    use crate::persistence::MemoryStore;

    /// Connector that scales the circuit's metrics by a fixed overhead.
    struct FixedConnector {
        accepted: Vec<CircuitLanguage>,
        depth_overhead: u32,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl CompilerConnector for FixedConnector {
        fn name(&self) -> &str {
            "fixed"
        }

        fn supported_providers(&self) -> Vec<String> {
            vec!["ibmq".into()]
        }

        fn supported_sdks(&self) -> Vec<String> {
            vec!["qiskit".into()]
        }

        fn languages_for(&self, _sdk: &str) -> Vec<CircuitLanguage> {
            self.accepted.clone()
        }

        async fn compile(
            &self,
            circuit: &Circuit,
            _language: &CircuitLanguage,
            _provider: &str,
            qpu_name: &str,
            _credentials: &ProviderCredentials,
        ) -> HalResult<CircuitInformation> {
            if self.fail_on.as_deref() == Some(qpu_name) {
                return Err(HalError::CompilationFailed("unroutable".into()));
            }
            Ok(CircuitInformation {
                depth: circuit.depth + self.depth_overhead,
                width: circuit.width,
                gate_count: circuit.gate_count,
                multi_qubit_gate_count: circuit.multi_qubit_gate_count,
                measurement_count: circuit.measurement_count,
                transpiled_circuit: circuit.source.clone(),
                transpiled_language: CircuitLanguage::OpenQasm2,
            })
        }
    }

    /// Translator with a fixed language repertoire.
    struct FixedTranslator {
        languages: Vec<CircuitLanguage>,
    }

    #[async_trait]
    impl TranslatorService for FixedTranslator {
        fn supported_languages(&self) -> Vec<CircuitLanguage> {
            self.languages.clone()
        }

        async fn translate(
            &self,
            source: &str,
            _from: &CircuitLanguage,
            _to: &CircuitLanguage,
        ) -> HalResult<Option<String>> {
            Ok(Some(format!("// translated\n{source}")))
        }
    }

    fn pipeline(
        connector: FixedConnector,
        translator: FixedTranslator,
        store: Arc<MemoryStore>,
    ) -> CompilationPipeline {
        let mut registry = ConnectorRegistry::new();
        registry.register(Arc::new(connector));
        CompilationPipeline::new(Arc::new(registry), Arc::new(translator), store)
    }

    fn circuit() -> Circuit {
        Circuit::new("bell", CircuitLanguage::OpenQasm2, "qasm").with_metrics(4, 3, 6)
    }

    fn candidates_for(qpus: &[Qpu]) -> Vec<Candidate> {
        let job_id = SelectionJobId::new();
        let user_id = Uuid::new_v4();
        qpus.iter()
            .map(|q| Candidate::new(job_id, user_id, q, "qiskit"))
            .collect()
    }

    #[tokio::test]
    async fn test_both_device_and_simulator_survive() {
        // Width-4, depth-3 circuit; device with T1/maxGateTime = 4 and 5 qubits.
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline(
            FixedConnector {
                accepted: vec![CircuitLanguage::OpenQasm2],
                depth_overhead: 0,
                fail_on: None,
            },
            FixedTranslator { languages: vec![] },
            store.clone(),
        );

        let qpus = vec![
            Qpu::simulator("aer_simulator", "ibmq", 32),
            Qpu::new("ibmq_lima", "ibmq", 5)
                .with_decoherence(40.0, 30.0)
                .with_max_gate_time(10.0),
        ];
        let candidates = candidates_for(&qpus);
        assert_eq!(candidates.len(), 2);

        let survivors = pipeline
            .compile_all(&circuit(), candidates, &FxHashMap::default())
            .await
            .unwrap();
        // 4 >= 3 (depth) and 5 >= 4 (width): both remain.
        assert_eq!(survivors.len(), 2);
    }

    #[tokio::test]
    async fn test_infeasible_device_is_deleted_from_store() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline(
            FixedConnector {
                accepted: vec![CircuitLanguage::OpenQasm2],
                depth_overhead: 2, // analyzed depth 5 > budget 4
                fail_on: None,
            },
            FixedTranslator { languages: vec![] },
            store.clone(),
        );

        let qpus = vec![
            Qpu::new("ibmq_lima", "ibmq", 5)
                .with_decoherence(40.0, 30.0)
                .with_max_gate_time(10.0),
        ];
        let candidates = candidates_for(&qpus);
        let job_id = candidates[0].job_id;
        for c in &candidates {
            store.save_candidate(c).await.unwrap();
        }

        let survivors = pipeline
            .compile_all(&circuit(), candidates, &FxHashMap::default())
            .await
            .unwrap();
        assert!(survivors.is_empty());
        assert!(store.list_candidates(&job_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_compile_failure_drops_candidate_only() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline(
            FixedConnector {
                accepted: vec![CircuitLanguage::OpenQasm2],
                depth_overhead: 0,
                fail_on: Some("ibmq_lima".into()),
            },
            FixedTranslator { languages: vec![] },
            store.clone(),
        );

        let qpus = vec![
            Qpu::simulator("aer_simulator", "ibmq", 32),
            Qpu::new("ibmq_lima", "ibmq", 5)
                .with_decoherence(100.0, 80.0)
                .with_max_gate_time(10.0),
        ];
        let survivors = pipeline
            .compile_all(&circuit(), candidates_for(&qpus), &FxHashMap::default())
            .await
            .unwrap();
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].qpu_name, "aer_simulator");
    }

    #[tokio::test]
    async fn test_translation_bridges_language_gap() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline(
            FixedConnector {
                accepted: vec![CircuitLanguage::OpenQasm2],
                depth_overhead: 0,
                fail_on: None,
            },
            FixedTranslator {
                languages: vec![CircuitLanguage::Quil, CircuitLanguage::OpenQasm2],
            },
            store.clone(),
        );

        let mut quil_circuit = circuit();
        quil_circuit.language = CircuitLanguage::Quil;

        let qpus = vec![Qpu::simulator("aer_simulator", "ibmq", 32)];
        let survivors = pipeline
            .compile_all(&quil_circuit, candidates_for(&qpus), &FxHashMap::default())
            .await
            .unwrap();
        assert_eq!(survivors.len(), 1);
        assert!(
            survivors[0]
                .transpiled_circuit
                .as_ref()
                .unwrap()
                .starts_with("// translated")
        );
    }

    #[tokio::test]
    async fn test_no_common_language_drops_candidate() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline(
            FixedConnector {
                accepted: vec![CircuitLanguage::OpenQasm2],
                depth_overhead: 0,
                fail_on: None,
            },
            // Translator cannot write OpenQASM 2.
            FixedTranslator {
                languages: vec![CircuitLanguage::Quil],
            },
            store.clone(),
        );

        let mut quil_circuit = circuit();
        quil_circuit.language = CircuitLanguage::Quil;

        let qpus = vec![Qpu::simulator("aer_simulator", "ibmq", 32)];
        let survivors = pipeline
            .compile_all(&quil_circuit, candidates_for(&qpus), &FxHashMap::default())
            .await
            .unwrap();
        assert!(survivors.is_empty());
    }

    #[tokio::test]
    async fn test_missing_connector_is_fatal() {
        let store = Arc::new(MemoryStore::new());
        let registry = ConnectorRegistry::new(); // nothing registered
        let pipeline = CompilationPipeline::new(
            Arc::new(registry),
            Arc::new(FixedTranslator { languages: vec![] }),
            store,
        );

        let qpus = vec![Qpu::simulator("aer_simulator", "ibmq", 32)];
        let err = pipeline
            .compile_all(&circuit(), candidates_for(&qpus), &FxHashMap::default())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::SchedError::NoConnector(_)));
    }
}
