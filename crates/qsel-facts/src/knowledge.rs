//! The knowledge base: fact upserts plus rule evaluation.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use qsel_model::{Implementation, ImplementationId, ParameterBindings, Qpu, QpuId, Rule};

use crate::error::FactResult;
use crate::evaluator::RuleEvaluator;
use crate::signature::{assemble_query, extract_variables};
use crate::store::{Fact, FactGroup, FactKey, FactStore};

/// Knowledge base combining the fact store with the external evaluator.
///
/// Upserts for a given entity are serialized per key, so the evaluator
/// never observes a half-updated fact group; operations on different
/// entities proceed independently.
pub struct KnowledgeBase {
    store: Arc<dyn FactStore>,
    evaluator: Arc<dyn RuleEvaluator>,
    key_locks: Mutex<FxHashMap<FactKey, Arc<Mutex<()>>>>,
}

impl KnowledgeBase {
    /// Create a knowledge base over a store and evaluator.
    pub fn new(store: Arc<dyn FactStore>, evaluator: Arc<dyn RuleEvaluator>) -> Self {
        Self {
            store,
            evaluator,
            key_locks: Mutex::new(FxHashMap::default()),
        }
    }

    async fn lock_for(&self, key: FactKey) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        locks.entry(key).or_default().clone()
    }

    /// Replace the fact group for a key: retract, store, re-consult.
    ///
    /// A store or evaluator failure abandons the insertion with a warning;
    /// the entity stays queryable through the catalog, so this is not
    /// fatal to the caller.
    async fn replace_group(&self, key: FactKey, group: FactGroup) {
        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;

        if let Err(e) = self.evaluator.retract_facts(&key.to_string()).await {
            warn!("Failed to retract facts for {key}: {e}");
            return;
        }
        if let Err(e) = self.store.put_group(key, group.clone()).await {
            warn!("Failed to persist facts for {key}: {e}");
            return;
        }
        if let Err(e) = self.evaluator.consult_facts(&key.to_string(), &group).await {
            warn!("Failed to consult facts for {key}: {e}");
        }
    }

    async fn drop_group(&self, key: FactKey) {
        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;

        if let Err(e) = self.evaluator.retract_facts(&key.to_string()).await {
            warn!("Failed to retract facts for {key}: {e}");
        }
        if let Err(e) = self.store.remove_group(&key).await {
            warn!("Failed to remove stored facts for {key}: {e}");
        }
    }

    /// Insert or refresh the fact group describing a QPU.
    pub async fn upsert_qpu_facts(&self, qpu: &Qpu) {
        let mut group = vec![
            Fact::new("provides_qubits", [qpu.name.clone(), qpu.qubit_count.to_string()]),
            Fact::new("t1_time", [qpu.name.clone(), qpu.t1.to_string()]),
            Fact::new("max_gate_time", [qpu.name.clone(), qpu.max_gate_time.to_string()]),
            Fact::new("has_provider", [qpu.name.clone(), qpu.provider.clone()]),
        ];
        if qpu.is_simulator {
            group.push(Fact::new("is_simulator", [qpu.name.clone()]));
        }
        self.replace_group(FactKey::Qpu(qpu.id), group).await;
    }

    /// Retract the fact group of a QPU.
    pub async fn remove_qpu_facts(&self, id: &QpuId) {
        self.drop_group(FactKey::Qpu(*id)).await;
    }

    /// Insert or refresh the fact group describing an implementation.
    pub async fn upsert_implementation_facts(&self, implementation: &Implementation) {
        let group = vec![
            Fact::new(
                "implements",
                [implementation.name.clone(), implementation.algorithm_id.to_string()],
            ),
            Fact::new(
                "required_sdk",
                [implementation.name.clone(), implementation.required_sdk.clone()],
            ),
        ];
        self.replace_group(FactKey::Implementation(implementation.id), group)
            .await;
    }

    /// Retract the fact group of an implementation.
    pub async fn remove_implementation_facts(&self, id: &ImplementationId) {
        self.drop_group(FactKey::Implementation(*id)).await;
    }

    /// Whether a query has a solution. Evaluator errors mean "no"; the
    /// rule may legitimately not exist yet.
    pub async fn evaluate(&self, query: &str) -> bool {
        match self.evaluator.has_solution(query).await {
            Ok(result) => result,
            Err(e) => {
                debug!("Treating evaluator error as no solution for '{query}': {e}");
                false
            }
        }
    }

    /// All solutions of a query for one output variable. Evaluator errors
    /// mean "none".
    pub async fn evaluate_for_all(&self, query: &str, variable: &str) -> Vec<String> {
        match self.evaluator.all_solutions(query, variable).await {
            Ok(values) => values,
            Err(e) => {
                debug!("Treating evaluator error as no solutions for '{query}': {e}");
                Vec::new()
            }
        }
    }

    /// Evaluate a selection rule against parameter bindings.
    ///
    /// An unbindable rule (missing parameter, malformed head) is not
    /// satisfiable rather than an error.
    pub async fn check_selection_rule(&self, rule: &Rule, bindings: &ParameterBindings) -> bool {
        match assemble_query(&rule.text, bindings, false) {
            Ok(query) => self.evaluate(&query).await,
            Err(e) => {
                debug!("Selection rule '{}' not evaluable: {e}", rule.name);
                false
            }
        }
    }

    /// Evaluate an estimator rule (width/depth), solving for its first
    /// variable. Returns the first solution parseable as an integer.
    pub async fn estimate(&self, rule: &Rule, bindings: &ParameterBindings) -> Option<i64> {
        let variables = match extract_variables(&rule.text) {
            Ok(v) => v,
            Err(e) => {
                debug!("Estimator rule '{}' not parseable: {e}", rule.name);
                return None;
            }
        };
        let output = variables.first()?;

        let query = match assemble_query(&rule.text, bindings, true) {
            Ok(q) => q,
            Err(e) => {
                debug!("Estimator rule '{}' not evaluable: {e}", rule.name);
                return None;
            }
        };

        self.evaluate_for_all(&query, output)
            .await
            .iter()
            .find_map(|v| v.parse::<i64>().ok())
    }
}
