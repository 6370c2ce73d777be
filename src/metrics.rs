//! Service metrics behind the `/analytics` endpoint.
//!
//! Counters are plain atomics; the instance is created once at startup and
//! shared through `Arc`.

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct ServiceMetrics {
    /// Per-language translation attempts
    attempts: AtomicUsize,

    /// Attempts that produced a translated bundle
    successes: AtomicUsize,

    /// Attempts recorded as failed (including timeouts)
    failures: AtomicUsize,

    /// Completed translation requests
    requests: AtomicUsize,

    /// Sum of request durations in milliseconds
    total_request_ms: AtomicU64,

    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,

    /// Backends that served at least one translation
    providers_used: Mutex<BTreeSet<String>>,
}

/// Snapshot of the metrics, shaped for the `/analytics` response.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub total_translations: usize,
    /// Fraction of attempts that succeeded (0.0 to 1.0)
    pub success_rate: f64,
    /// Mean request duration in milliseconds
    pub average_response_time: u64,
    pub providers_used: Vec<String>,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub timestamp: String,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&self, succeeded: bool) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if succeeded {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_request(&self, elapsed: Duration) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.total_request_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provider_used(&self, provider: &str) {
        // A poisoned set only loses provider names; counters stay correct
        if let Ok(mut used) = self.providers_used.lock() {
            if !used.contains(provider) {
                used.insert(provider.to_string());
            }
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn successes(&self) -> usize {
        self.successes.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> usize {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Generate an analytics report.
    pub fn report(&self) -> AnalyticsReport {
        let attempts = self.attempts();
        let success_rate = if attempts > 0 {
            self.successes() as f64 / attempts as f64
        } else {
            0.0
        };

        let requests = self.requests.load(Ordering::Relaxed) as u64;
        let average_response_time = if requests > 0 {
            self.total_request_ms.load(Ordering::Relaxed) / requests
        } else {
            0
        };

        let providers_used = self
            .providers_used
            .lock()
            .map(|used| used.iter().cloned().collect())
            .unwrap_or_default();

        AnalyticsReport {
            total_translations: attempts,
            success_rate,
            average_response_time,
            providers_used,
            cache_hits: self.cache_hits(),
            cache_misses: self.cache_misses(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
