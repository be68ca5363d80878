//! Connector registry for discovering compiler connectors.
//!
//! The [`ConnectorRegistry`] is the central point for looking up which
//! connector serves a given SDK or provider. Selection jobs share one
//! registry; lookups are read-only after construction.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::connector::CompilerConnector;
use crate::error::{HalError, HalResult};

/// Central registry for compiler connectors.
#[derive(Default)]
pub struct ConnectorRegistry {
    /// Connectors keyed by lowercase SDK name.
    by_sdk: FxHashMap<String, Arc<dyn CompilerConnector>>,
}

impl ConnectorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            by_sdk: FxHashMap::default(),
        }
    }

    /// Register a connector under every SDK it reports supporting.
    pub fn register(&mut self, connector: Arc<dyn CompilerConnector>) {
        for sdk in connector.supported_sdks() {
            debug!("Registering connector {} for sdk {}", connector.name(), sdk);
            self.by_sdk.insert(sdk.to_lowercase(), connector.clone());
        }
    }

    /// Look up the connector for an SDK (case-insensitive).
    pub fn for_sdk(&self, sdk: &str) -> HalResult<Arc<dyn CompilerConnector>> {
        self.by_sdk
            .get(&sdk.to_lowercase())
            .cloned()
            .ok_or_else(|| HalError::NoConnector(format!("no connector for sdk '{sdk}'")))
    }

    /// Look up a connector able to target the given provider.
    pub fn for_provider(&self, provider: &str) -> HalResult<Arc<dyn CompilerConnector>> {
        self.by_sdk
            .values()
            .find(|c| {
                c.supported_providers()
                    .iter()
                    .any(|p| p.eq_ignore_ascii_case(provider))
            })
            .cloned()
            .ok_or_else(|| HalError::NoConnector(format!("no connector for provider '{provider}'")))
    }

    /// All registered SDK names, sorted.
    ///
    /// This is the compiler set used when a request does not name compilers
    /// explicitly.
    pub fn sdk_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_sdk.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether any connector is registered.
    pub fn is_empty(&self) -> bool {
        self.by_sdk.is_empty()
    }
}
