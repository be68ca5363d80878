//! Circuit-language translation contract.

use async_trait::async_trait;

use qsel_model::CircuitLanguage;

use crate::error::HalResult;

/// Trait for circuit-language translation services.
///
/// Translation is best effort: `Ok(None)` means the service has no path
/// from `from` to `to`, which the pipeline treats as a filtered-out
/// candidate rather than a failure. Only infrastructure problems (service
/// unreachable, malformed reply) are errors.
#[async_trait]
pub trait TranslatorService: Send + Sync {
    /// Languages the translator can read and write.
    fn supported_languages(&self) -> Vec<CircuitLanguage>;

    /// Translate circuit source from one language to another.
    async fn translate(
        &self,
        source: &str,
        from: &CircuitLanguage,
        to: &CircuitLanguage,
    ) -> HalResult<Option<String>>;
}
