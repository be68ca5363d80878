//! Keyed, atomically-updatable fact storage.

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use qsel_model::{ImplementationId, QpuId};

use crate::error::FactResult;

/// A single ground fact, e.g. `provides_qubits(ibmq_lima,5)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    /// Predicate name.
    pub predicate: String,
    /// Argument terms, already rendered as text.
    pub args: Vec<String>,
}

impl Fact {
    /// Create a fact from a predicate and arguments.
    pub fn new(
        predicate: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            predicate: predicate.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for Fact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({}).", self.predicate, self.args.join(","))
    }
}

/// The self-contained fact group of one catalog entity.
pub type FactGroup = Vec<Fact>;

/// Key identifying a fact group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactKey {
    /// Facts describing a QPU.
    Qpu(QpuId),
    /// Facts describing an implementation.
    Implementation(ImplementationId),
}

impl std::fmt::Display for FactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactKey::Qpu(id) => write!(f, "qpu-{id}"),
            FactKey::Implementation(id) => write!(f, "impl-{id}"),
        }
    }
}

/// Trait for keyed fact storage.
///
/// An implementation must replace a group atomically: readers observe the
/// old group or the new one, never a mix. The original disk-file mechanism
/// is an implementation detail; an in-memory map satisfies the contract.
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Replace (or insert) the fact group for a key.
    async fn put_group(&self, key: FactKey, group: FactGroup) -> FactResult<()>;

    /// Remove the fact group for a key. Removing an absent key is a no-op.
    async fn remove_group(&self, key: &FactKey) -> FactResult<()>;

    /// Fetch the fact group for a key.
    async fn group(&self, key: &FactKey) -> FactResult<Option<FactGroup>>;

    /// All keys currently present.
    async fn keys(&self) -> FactResult<Vec<FactKey>>;
}

/// In-memory fact store.
#[derive(Default)]
pub struct MemoryFactStore {
    groups: RwLock<FxHashMap<FactKey, FactGroup>>,
}

impl MemoryFactStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FactStore for MemoryFactStore {
    async fn put_group(&self, key: FactKey, group: FactGroup) -> FactResult<()> {
        let mut groups = self.groups.write().await;
        groups.insert(key, group);
        Ok(())
    }

    async fn remove_group(&self, key: &FactKey) -> FactResult<()> {
        let mut groups = self.groups.write().await;
        groups.remove(key);
        Ok(())
    }

    async fn group(&self, key: &FactKey) -> FactResult<Option<FactGroup>> {
        let groups = self.groups.read().await;
        Ok(groups.get(key).cloned())
    }

    async fn keys(&self) -> FactResult<Vec<FactKey>> {
        let groups = self.groups.read().await;
        Ok(groups.keys().copied().collect())
    }
}
