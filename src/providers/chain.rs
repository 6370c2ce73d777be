use super::{Segment, TextTranslator};
use crate::error::ProviderError;
use crate::metrics::ServiceMetrics;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Tries each backend in order until one succeeds.
pub struct ProviderChain {
    backends: Vec<Arc<dyn TextTranslator>>,
    metrics: Option<Arc<ServiceMetrics>>,
}

impl ProviderChain {
    pub fn new(backends: Vec<Arc<dyn TextTranslator>>, metrics: Option<Arc<ServiceMetrics>>) -> Self {
        Self { backends, metrics }
    }

    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }
}

#[async_trait]
impl TextTranslator for ProviderChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    async fn translate_segments(
        &self,
        segments: &[Segment],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<String>, ProviderError> {
        let mut errors = Vec::new();

        for backend in &self.backends {
            match backend
                .translate_segments(segments, source_language, target_language)
                .await
            {
                Ok(translations) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_provider_used(backend.name());
                    }
                    return Ok(translations);
                }
                Err(e) => {
                    warn!(
                        "Provider {} failed for {}: {}",
                        backend.name(),
                        target_language,
                        e
                    );
                    errors.push(format!("{}: {}", backend.name(), e));
                }
            }
        }

        Err(ProviderError::Exhausted(errors))
    }
}
