use super::{Segment, TextTranslator};
use crate::error::ProviderError;
use crate::metrics::ServiceMetrics;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    text: String,
    description: Option<String>,
    source_language: String,
    target_language: String,
}

impl CacheKey {
    fn new(segment: &Segment, source_language: &str, target_language: &str) -> Self {
        Self {
            text: segment.text.clone(),
            description: segment.description.clone(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
        }
    }
}

/// In-memory translation memo in front of another backend.
///
/// Only segments that miss the cache reach the inner backend.
pub struct CachedTranslator {
    inner: Arc<dyn TextTranslator>,
    entries: RwLock<HashMap<CacheKey, String>>,
    max_entries: usize,
    metrics: Option<Arc<ServiceMetrics>>,
}

impl CachedTranslator {
    const DEFAULT_MAX_ENTRIES: usize = 10_000;

    pub fn new(inner: Arc<dyn TextTranslator>, metrics: Option<Arc<ServiceMetrics>>) -> Self {
        Self::with_capacity(inner, metrics, Self::DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(
        inner: Arc<dyn TextTranslator>,
        metrics: Option<Arc<ServiceMetrics>>,
        max_entries: usize,
    ) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
            max_entries,
            metrics,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl TextTranslator for CachedTranslator {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn translate_segments(
        &self,
        segments: &[Segment],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<String>, ProviderError> {
        let keys: Vec<CacheKey> = segments
            .iter()
            .map(|s| CacheKey::new(s, source_language, target_language))
            .collect();

        let mut results: Vec<Option<String>> = {
            let entries = self.entries.read().await;
            keys.iter().map(|k| entries.get(k).cloned()).collect()
        };

        let misses: Vec<usize> = (0..segments.len())
            .filter(|&i| results[i].is_none())
            .collect();

        if let Some(metrics) = &self.metrics {
            for _ in 0..segments.len() - misses.len() {
                metrics.record_cache_hit();
            }
            for _ in 0..misses.len() {
                metrics.record_cache_miss();
            }
        }
        debug!(
            "Translation cache for {}: {} hits, {} misses",
            target_language,
            segments.len() - misses.len(),
            misses.len()
        );

        if !misses.is_empty() {
            let pending: Vec<Segment> = misses.iter().map(|&i| segments[i].clone()).collect();
            let translated = self
                .inner
                .translate_segments(&pending, source_language, target_language)
                .await?;
            if translated.len() != pending.len() {
                return Err(ProviderError::Malformed {
                    provider: self.inner.name(),
                    message: format!(
                        "expected {} translations, got {}",
                        pending.len(),
                        translated.len()
                    ),
                });
            }

            let mut entries = self.entries.write().await;
            let cacheable = misses.len() <= self.max_entries;
            if cacheable && entries.len() + misses.len() > self.max_entries {
                entries.clear();
            }
            for (&i, text) in misses.iter().zip(translated) {
                if cacheable {
                    entries.insert(keys[i].clone(), text.clone());
                }
                results[i] = Some(text);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }
}
