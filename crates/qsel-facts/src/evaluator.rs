//! Boundary trait for the external logic evaluator.

use async_trait::async_trait;

use crate::error::FactResult;
use crate::store::Fact;

/// Trait for the external rule evaluator.
///
/// qsel pushes fact groups to the evaluator and asks it yes/no and
/// enumeration queries. The evaluator owns rule semantics entirely; qsel
/// treats its errors as "no solution" at the [`KnowledgeBase`] level.
///
/// Implementations must be safe for concurrent use; selection jobs query
/// while catalog updates assert and retract.
///
/// [`KnowledgeBase`]: crate::KnowledgeBase
#[async_trait]
pub trait RuleEvaluator: Send + Sync {
    /// Make a fact group visible under `group_key`, replacing any previous
    /// group with the same key.
    async fn consult_facts(&self, group_key: &str, facts: &[Fact]) -> FactResult<()>;

    /// Retract the fact group registered under `group_key`.
    async fn retract_facts(&self, group_key: &str) -> FactResult<()>;

    /// Whether the query has at least one solution.
    async fn has_solution(&self, query: &str) -> FactResult<bool>;

    /// All bindings of `variable` that satisfy the query.
    async fn all_solutions(&self, query: &str, variable: &str) -> FactResult<Vec<String>>;
}
