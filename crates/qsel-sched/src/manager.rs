//! Job lifecycle management: submit, run detached, poll.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use qsel_facts::KnowledgeBase;
use qsel_hal::{ConnectorRegistry, ProviderCredentials, RankingService, TranslatorService};
use qsel_model::{Circuit, Implementation, ParameterBindings, Qpu};

use crate::error::{SchedError, SchedResult};
use crate::generator::{CandidateGenerator, GeneratorConfig};
use crate::job::{Candidate, SelectionJob, SelectionJobId, SelectionJobStatus};
use crate::persistence::StateStore;
use crate::pipeline::CompilationPipeline;
use crate::policy::{PolicyConfig, SelectionPolicyEngine, SelectionPreference};

/// One selection request: a circuit, the devices in scope, and the user's
/// preferences.
#[derive(Debug, Clone)]
pub struct SelectionRequest {
    /// The analyzed circuit to place.
    pub circuit: Circuit,

    /// Submitting user.
    pub user_id: Uuid,

    /// Devices in scope for this request.
    pub qpus: Vec<Qpu>,

    /// Compilers to consider; `None` means every registered compiler.
    pub compilers: Option<Vec<String>>,

    /// Implementation the circuit realizes; carries the user-supplied
    /// selection and estimator rules.
    pub implementation: Option<Implementation>,

    /// Parameter bindings for rule evaluation.
    pub parameters: ParameterBindings,

    /// Provider credentials keyed by provider name.
    pub credentials: FxHashMap<String, ProviderCredentials>,

    /// Prefer devices with short queues.
    pub short_waiting_time: bool,

    /// Prefer devices predicted to give precise results.
    pub precise_results: bool,
}

impl SelectionRequest {
    /// Create a request over the given devices with no preference.
    pub fn new(circuit: Circuit, user_id: Uuid, qpus: Vec<Qpu>) -> Self {
        Self {
            circuit,
            user_id,
            qpus,
            compilers: None,
            implementation: None,
            parameters: ParameterBindings::default(),
            credentials: FxHashMap::default(),
            short_waiting_time: false,
            precise_results: false,
        }
    }

    /// Restrict the request to the named compilers.
    pub fn with_compilers(mut self, compilers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.compilers = Some(compilers.into_iter().map(Into::into).collect());
        self
    }

    /// Attach the implementation this circuit realizes.
    pub fn for_implementation(mut self, implementation: Implementation) -> Self {
        self.implementation = Some(implementation);
        self
    }

    /// Bind one rule parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Attach credentials for one provider.
    pub fn with_credentials(mut self, credentials: ProviderCredentials) -> Self {
        self.credentials
            .insert(credentials.provider.clone(), credentials);
        self
    }

    /// Ask for the shortest-queue devices.
    pub fn prefer_short_waiting_time(mut self) -> Self {
        self.short_waiting_time = true;
        self
    }

    /// Ask for the devices predicted to give the most precise results.
    pub fn prefer_precise_results(mut self) -> Self {
        self.precise_results = true;
        self
    }

    /// Resolve the request flags to the effective preference.
    ///
    /// Short waiting time dominates: it applies when both preferences are
    /// requested and it is the default when neither is.
    pub fn preference(&self) -> SelectionPreference {
        if self.precise_results && !self.short_waiting_time {
            SelectionPreference::PreciseResults
        } else {
            SelectionPreference::ShortWaitingTime
        }
    }
}

/// Job manager configuration.
#[derive(Debug, Clone, Default)]
pub struct JobManagerConfig {
    /// Candidate generation settings.
    pub generator: GeneratorConfig,

    /// Policy engine settings.
    pub policy: PolicyConfig,
}

/// Owns the asynchronous job lifecycle.
///
/// `submit` persists the job and detaches a task that runs the whole
/// pipeline; callers poll [`JobManager::job`] until the status is
/// terminal. Jobs are never paused, resumed or cancelled.
pub struct JobManager {
    store: Arc<dyn StateStore>,
    config: JobManagerConfig,
    generator: CandidateGenerator,
    pipeline: CompilationPipeline,
    policy: SelectionPolicyEngine,
    knowledge: Option<Arc<KnowledgeBase>>,
}

impl JobManager {
    /// Create a manager over a connector registry and translator.
    pub fn new(
        store: Arc<dyn StateStore>,
        registry: Arc<ConnectorRegistry>,
        translator: Arc<dyn TranslatorService>,
        config: JobManagerConfig,
    ) -> Self {
        let generator = CandidateGenerator::new(config.generator.clone());
        let pipeline = CompilationPipeline::new(registry, translator, store.clone());
        let policy = SelectionPolicyEngine::new(store.clone(), config.policy.clone());
        Self {
            store,
            config,
            generator,
            pipeline,
            policy,
            knowledge: None,
        }
    }

    /// Attach a knowledge base for selection-rule and estimator evaluation.
    pub fn with_knowledge_base(mut self, knowledge: Arc<KnowledgeBase>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    /// Attach a prediction-based ranking service.
    pub fn with_ranking(mut self, ranking: Arc<dyn RankingService>) -> Self {
        self.policy = SelectionPolicyEngine::new(self.store.clone(), self.config.policy.clone())
            .with_ranking(ranking);
        self
    }

    /// Submit a selection request.
    ///
    /// Persists the job, detaches the pipeline task and returns the job id
    /// immediately. The task owns the job from here; its result is only
    /// observable through the stored status.
    pub async fn submit(self: &Arc<Self>, request: SelectionRequest) -> SchedResult<SelectionJobId> {
        let job = SelectionJob::new(request.user_id, request.circuit.id);
        let job_id = job.id;
        self.store.save_job(&job).await?;

        info!("Submitted selection job {} for circuit {}", job_id, request.circuit.name);

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = manager.run(job_id, &request).await {
                error!("Selection job {} failed: {e}", job_id);
                let status = SelectionJobStatus::Failed {
                    reason: e.to_string(),
                };
                if let Err(e) = manager.store.update_job_status(&job_id, status).await {
                    error!("Could not record failure of job {}: {e}", job_id);
                }
            }
        });

        Ok(job_id)
    }

    /// Load a job's current state (the polling accessor).
    pub async fn job(&self, job_id: &SelectionJobId) -> SchedResult<SelectionJob> {
        self.store
            .load_job(job_id)
            .await?
            .ok_or_else(|| SchedError::JobNotFound(job_id.to_string()))
    }

    /// The surviving candidates of a job.
    pub async fn candidates(&self, job_id: &SelectionJobId) -> SchedResult<Vec<Candidate>> {
        self.store.list_candidates(job_id).await
    }

    /// Delete a job and everything it owns.
    pub async fn delete_job(&self, job_id: &SelectionJobId) -> SchedResult<bool> {
        self.store.delete_job(job_id).await
    }

    /// The whole pipeline for one job: generate, compile, apply policy,
    /// finalize.
    async fn run(&self, job_id: SelectionJobId, request: &SelectionRequest) -> SchedResult<()> {
        self.store
            .update_job_status(&job_id, SelectionJobStatus::Running)
            .await?;

        let Some(circuit) = self.admit(request).await else {
            info!(
                "Job {}: implementation rejected by its selection rule; finishing empty",
                job_id
            );
            return self.finalize(job_id, Vec::new()).await;
        };

        let compilers = match &request.compilers {
            Some(compilers) => compilers.clone(),
            None => self.pipeline.registry().sdk_names(),
        };

        let set = self
            .generator
            .generate(job_id, request.user_id, &request.qpus, &compilers);
        for candidate in &set.candidates {
            self.store.save_candidate(candidate).await?;
        }

        if set.candidates.is_empty() {
            info!("Job {} generated no candidates; finishing empty", job_id);
            return self.finalize(job_id, Vec::new()).await;
        }

        let compiled = self
            .pipeline
            .compile_all(&circuit, set.candidates, &request.credentials)
            .await?;
        debug!("Job {}: {} candidates survived compilation", job_id, compiled.len());

        // Calibration may itself have been pruned; only keep the handle if
        // its candidate still exists.
        let calibration = set
            .calibration
            .filter(|id| compiled.iter().any(|c| c.id == *id));

        let history = match self.store.list_results_for_user(&request.user_id).await {
            Ok(history) => history,
            Err(e) => {
                warn!("Could not load execution history for {}: {e}", request.user_id);
                Vec::new()
            }
        };

        let survivors = self
            .policy
            .apply(
                &circuit,
                compiled,
                calibration,
                Some(request.preference()),
                &history,
            )
            .await?;

        self.finalize(job_id, survivors).await
    }

    /// Evaluate the implementation's rules when a knowledge base is
    /// attached.
    ///
    /// Returns the circuit to compile, with metrics still at zero filled
    /// in from the estimator rules, or `None` when the selection rule
    /// rejects the implementation outright.
    async fn admit(&self, request: &SelectionRequest) -> Option<Circuit> {
        let mut circuit = request.circuit.clone();
        let (Some(knowledge), Some(implementation)) = (&self.knowledge, &request.implementation)
        else {
            return Some(circuit);
        };

        if let Some(rule) = &implementation.selection_rule {
            if !knowledge
                .check_selection_rule(rule, &request.parameters)
                .await
            {
                return None;
            }
        }

        if circuit.width == 0 {
            if let Some(rule) = &implementation.width_rule {
                if let Some(width) = knowledge.estimate(rule, &request.parameters).await {
                    circuit.width = u32::try_from(width).unwrap_or(0);
                }
            }
        }
        if circuit.depth == 0 {
            if let Some(rule) = &implementation.depth_rule {
                if let Some(depth) = knowledge.estimate(rule, &request.parameters).await {
                    circuit.depth = u32::try_from(depth).unwrap_or(0);
                }
            }
        }

        Some(circuit)
    }

    /// Record the final candidate set and mark the job `Ready`.
    async fn finalize(&self, job_id: SelectionJobId, survivors: Vec<Candidate>) -> SchedResult<()> {
        let mut job = self
            .store
            .load_job(&job_id)
            .await?
            .ok_or_else(|| SchedError::JobNotFound(job_id.to_string()))?;

        job.candidates = survivors.iter().map(|c| c.id).collect();
        job.status = SelectionJobStatus::Ready;
        self.store.save_job(&job).await?;

        info!("Job {} ready with {} candidates", job_id, job.candidates.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    use qsel_facts::{Fact, FactResult, MemoryFactStore, RuleEvaluator};
    use qsel_hal::{
        CircuitInformation, CompilerConnector, HalError, HalResult,
    };
    use qsel_model::{CircuitLanguage, Implementation, Rule};

    use crate::persistence::MemoryStore;

    struct EchoConnector;

    #[async_trait]
    impl CompilerConnector for EchoConnector {
        fn name(&self) -> &str {
            "echo"
        }

        fn supported_providers(&self) -> Vec<String> {
            vec!["ibmq".into()]
        }

        fn supported_sdks(&self) -> Vec<String> {
            vec!["qiskit".into()]
        }

        fn languages_for(&self, _sdk: &str) -> Vec<CircuitLanguage> {
            vec![CircuitLanguage::OpenQasm2]
        }

        async fn compile(
            &self,
            circuit: &Circuit,
            _language: &CircuitLanguage,
            _provider: &str,
            _qpu_name: &str,
            _credentials: &ProviderCredentials,
        ) -> HalResult<CircuitInformation> {
            Ok(CircuitInformation {
                depth: circuit.depth,
                width: circuit.width,
                gate_count: circuit.gate_count,
                multi_qubit_gate_count: circuit.multi_qubit_gate_count,
                measurement_count: circuit.measurement_count,
                transpiled_circuit: circuit.source.clone(),
                transpiled_language: CircuitLanguage::OpenQasm2,
            })
        }
    }

    struct NoTranslator;

    #[async_trait]
    impl TranslatorService for NoTranslator {
        fn supported_languages(&self) -> Vec<CircuitLanguage> {
            Vec::new()
        }

        async fn translate(
            &self,
            _source: &str,
            from: &CircuitLanguage,
            to: &CircuitLanguage,
        ) -> HalResult<Option<String>> {
            Err(HalError::Translation(format!("no path {from} -> {to}")))
        }
    }

    fn manager(registry: ConnectorRegistry) -> Arc<JobManager> {
        Arc::new(JobManager::new(
            Arc::new(MemoryStore::new()),
            Arc::new(registry),
            Arc::new(NoTranslator),
            JobManagerConfig::default(),
        ))
    }

    async fn wait_terminal(manager: &Arc<JobManager>, job_id: &SelectionJobId) -> SelectionJob {
        loop {
            let job = manager.job(job_id).await.unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn request() -> SelectionRequest {
        let circuit =
            Circuit::new("bell", CircuitLanguage::OpenQasm2, "qasm").with_metrics(2, 2, 3);
        let qpus = vec![
            Qpu::simulator("aer_simulator", "ibmq", 32),
            Qpu::new("ibmq_lima", "ibmq", 5)
                .with_decoherence(100.0, 80.0)
                .with_max_gate_time(10.0),
        ];
        SelectionRequest::new(circuit, Uuid::new_v4(), qpus)
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_runs_to_ready() {
        let mut registry = ConnectorRegistry::new();
        registry.register(Arc::new(EchoConnector));
        let manager = manager(registry);

        let job_id = manager.submit(request()).await.unwrap();
        let job = wait_terminal(&manager, &job_id).await;

        assert!(job.ready());
        assert_eq!(job.candidates.len(), 2);
        assert_eq!(manager.candidates(&job_id).await.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_compiler_fails_job() {
        let mut registry = ConnectorRegistry::new();
        registry.register(Arc::new(EchoConnector));
        let manager = manager(registry);

        let job_id = manager
            .submit(request().with_compilers(["cirq"]))
            .await
            .unwrap();
        let job = wait_terminal(&manager, &job_id).await;

        match job.status {
            SelectionJobStatus::Failed { reason } => assert!(reason.contains("cirq")),
            other => panic!("expected Failed, got {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_registered_compilers_finishes_empty() {
        let manager = manager(ConnectorRegistry::new());

        let job_id = manager.submit(request()).await.unwrap();
        let job = wait_terminal(&manager, &job_id).await;

        assert!(job.ready());
        assert!(job.candidates.is_empty());
    }

    /// Evaluator that answers `true` only for queries in its table.
    struct TableEvaluator {
        truths: Vec<String>,
    }

    #[async_trait]
    impl RuleEvaluator for TableEvaluator {
        async fn consult_facts(&self, _group_key: &str, _facts: &[Fact]) -> FactResult<()> {
            Ok(())
        }

        async fn retract_facts(&self, _group_key: &str) -> FactResult<()> {
            Ok(())
        }

        async fn has_solution(&self, query: &str) -> FactResult<bool> {
            Ok(self.truths.iter().any(|q| q == query))
        }

        async fn all_solutions(&self, _query: &str, _variable: &str) -> FactResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn knowledge(truths: &[&str]) -> Arc<KnowledgeBase> {
        Arc::new(KnowledgeBase::new(
            Arc::new(MemoryFactStore::new()),
            Arc::new(TableEvaluator {
                truths: truths.iter().map(|s| s.to_string()).collect(),
            }),
        ))
    }

    fn shor_request(n: &str) -> SelectionRequest {
        let implementation = Implementation::new(
            "shor-general",
            Uuid::new_v4(),
            CircuitLanguage::OpenQasm2,
            "qiskit",
        )
        .with_selection_rule(Rule::new("executable", "executable(N) :- N > 4."));
        request()
            .for_implementation(implementation)
            .with_parameter("N", n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_rule_admits_implementation() {
        let mut registry = ConnectorRegistry::new();
        registry.register(Arc::new(EchoConnector));
        let manager_base = JobManager::new(
            Arc::new(MemoryStore::new()),
            Arc::new(registry),
            Arc::new(NoTranslator),
            JobManagerConfig::default(),
        );
        let manager = Arc::new(manager_base.with_knowledge_base(knowledge(&["executable(15)."])));

        let job_id = manager.submit(shor_request("15")).await.unwrap();
        let job = wait_terminal(&manager, &job_id).await;
        assert!(job.ready());
        assert_eq!(job.candidates.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_rule_rejection_finishes_empty() {
        let mut registry = ConnectorRegistry::new();
        registry.register(Arc::new(EchoConnector));
        let manager_base = JobManager::new(
            Arc::new(MemoryStore::new()),
            Arc::new(registry),
            Arc::new(NoTranslator),
            JobManagerConfig::default(),
        );
        let manager = Arc::new(manager_base.with_knowledge_base(knowledge(&["executable(15)."])));

        let job_id = manager.submit(shor_request("2")).await.unwrap();
        let job = wait_terminal(&manager, &job_id).await;
        assert!(job.ready());
        assert!(job.candidates.is_empty());
    }

    #[test]
    fn test_preference_resolution() {
        // Default and both-set resolve to short waiting time.
        assert_eq!(
            request().preference(),
            SelectionPreference::ShortWaitingTime
        );
        assert_eq!(
            request()
                .prefer_short_waiting_time()
                .prefer_precise_results()
                .preference(),
            SelectionPreference::ShortWaitingTime
        );
        assert_eq!(
            request().prefer_precise_results().preference(),
            SelectionPreference::PreciseResults
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_job_removes_candidates() {
        let mut registry = ConnectorRegistry::new();
        registry.register(Arc::new(EchoConnector));
        let manager = manager(registry);

        let job_id = manager.submit(request()).await.unwrap();
        wait_terminal(&manager, &job_id).await;

        assert!(manager.delete_job(&job_id).await.unwrap());
        assert!(manager.job(&job_id).await.is_err());
        assert!(manager.candidates(&job_id).await.unwrap().is_empty());
    }
}
