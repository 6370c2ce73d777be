//! Fan-out of one bundle to many target languages.
//!
//! Each target language is an independent attempt: a provider failure or a
//! timeout is recorded as that attempt's outcome and never aborts the batch.
//! The staged source bundle outlives every attempt and is released exactly
//! once when orchestration ends, however it ends.

use crate::bundle::LocalizationBundle;
use crate::config::Config;
use crate::error::TranslateError;
use crate::metrics::ServiceMetrics;
use crate::providers::TranslationProvider;
use crate::staging::{ResourceStage, StageGuard, StageHandle};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use regex::Regex;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const DEFAULT_SOURCE_LANGUAGE: &str = "en";

fn language_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z]{2,3}([-_][A-Za-z0-9]{2,8})*$").expect("valid language regex")
    })
}

/// Whether `code` looks like a language tag (`es`, `pt-BR`, `zh_Hant`).
pub fn is_valid_language_code(code: &str) -> bool {
    language_code_regex().is_match(code)
}

#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub bundle: LocalizationBundle,
    pub target_languages: Vec<String>,
    pub source_language: String,
}

impl TranslationRequest {
    pub fn new(bundle: LocalizationBundle, target_languages: Vec<String>) -> Self {
        Self {
            bundle,
            target_languages,
            source_language: DEFAULT_SOURCE_LANGUAGE.to_string(),
        }
    }

    pub fn with_source_language(mut self, source_language: impl Into<String>) -> Self {
        self.source_language = source_language.into();
        self
    }

    /// Reject malformed requests before any work is done.
    ///
    /// Malformed target codes are not rejected here; each one fails only
    /// its own attempt.
    pub fn check(&self) -> Result<(), TranslateError> {
        if self.bundle.is_empty() {
            return Err(TranslateError::EmptyContent);
        }
        if self.target_languages.is_empty() {
            return Err(TranslateError::NoTargetLanguages);
        }
        if !is_valid_language_code(&self.source_language) {
            return Err(TranslateError::InvalidLanguage(self.source_language.clone()));
        }
        Ok(())
    }
}

/// Result of translating into one target language.
#[derive(Debug, Clone, PartialEq)]
pub enum LanguageOutcome {
    Translated {
        content: LocalizationBundle,
        staged_location: String,
    },
    Failed {
        error_message: String,
    },
}

impl LanguageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LanguageOutcome::Translated { .. })
    }
}

impl Serialize for LanguageOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LanguageOutcome::Translated {
                content,
                staged_location,
            } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("content", content)?;
                map.serialize_entry("filePath", staged_location)?;
                map.end()
            }
            LanguageOutcome::Failed { error_message } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error_message)?;
                map.end()
            }
        }
    }
}

/// One attempt, identified by its position in the request.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageAttempt {
    pub index: usize,
    pub language: String,
    pub outcome: LanguageOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationSummary {
    pub total_languages: usize,
    pub successful: usize,
    pub failed: usize,
}

impl TranslationSummary {
    /// Counts every attempt, duplicates included.
    pub fn from_attempts(attempts: &[LanguageAttempt]) -> Self {
        let successful = attempts.iter().filter(|a| a.outcome.is_success()).count();
        Self {
            total_languages: attempts.len(),
            successful,
            failed: attempts.len() - successful,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResult {
    /// In request order.
    pub attempts: Vec<LanguageAttempt>,
    pub summary: TranslationSummary,
}

impl TranslationResult {
    pub fn from_attempts(mut attempts: Vec<LanguageAttempt>) -> Self {
        attempts.sort_by_key(|a| a.index);
        let summary = TranslationSummary::from_attempts(&attempts);
        Self { attempts, summary }
    }

    /// Outcomes keyed by language code.
    ///
    /// A language requested more than once keeps the outcome of its last
    /// attempt, positioned where it was first requested.
    pub fn outcomes(&self) -> Vec<(&str, &LanguageOutcome)> {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut outcomes: Vec<(&str, &LanguageOutcome)> = Vec::new();
        for attempt in &self.attempts {
            let language = attempt.language.as_str();
            match positions.get(language) {
                Some(&position) => outcomes[position].1 = &attempt.outcome,
                None => {
                    positions.insert(language, outcomes.len());
                    outcomes.push((language, &attempt.outcome));
                }
            }
        }
        outcomes
    }

    pub fn outcome(&self, language: &str) -> Option<&LanguageOutcome> {
        self.attempts
            .iter()
            .rev()
            .find(|a| a.language == language)
            .map(|a| &a.outcome)
    }
}

struct OutcomeMap<'a>(Vec<(&'a str, &'a LanguageOutcome)>);

impl Serialize for OutcomeMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (language, outcome) in &self.0 {
            map.serialize_entry(language, outcome)?;
        }
        map.end()
    }
}

impl Serialize for TranslationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TranslationResult", 2)?;
        state.serialize_field("results", &OutcomeMap(self.outcomes()))?;
        state.serialize_field("summary", &self.summary)?;
        state.end()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    pub max_concurrency: usize,
    pub attempt_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            attempt_timeout: Duration::from_secs(60),
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrency: config.max_concurrent_translations,
            attempt_timeout: config.translation_timeout,
        }
    }
}

pub struct TranslationOrchestrator {
    provider: Arc<dyn TranslationProvider>,
    stage: Arc<dyn ResourceStage>,
    settings: OrchestratorSettings,
    metrics: Option<Arc<ServiceMetrics>>,
}

impl TranslationOrchestrator {
    pub fn new(
        provider: Arc<dyn TranslationProvider>,
        stage: Arc<dyn ResourceStage>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            provider,
            stage,
            settings,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ServiceMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn attempt(
        &self,
        handle: &StageHandle,
        index: usize,
        source_language: &str,
        target_language: String,
    ) -> LanguageAttempt {
        let outcome = if is_valid_language_code(&target_language) {
            self.translate_one(handle, source_language, &target_language)
                .await
        } else {
            let message = TranslateError::InvalidLanguage(target_language.clone()).to_string();
            warn!("Skipping translation: {}", message);
            LanguageOutcome::Failed {
                error_message: message,
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_attempt(outcome.is_success());
        }

        LanguageAttempt {
            index,
            language: target_language,
            outcome,
        }
    }

    async fn translate_one(
        &self,
        handle: &StageHandle,
        source_language: &str,
        target_language: &str,
    ) -> LanguageOutcome {
        let call = AssertUnwindSafe(self.provider.translate_bundle(
            handle,
            source_language,
            target_language,
        ))
        .catch_unwind();

        let failure = |message: String| {
            warn!("{}", message);
            LanguageOutcome::Failed {
                error_message: message,
            }
        };

        match tokio::time::timeout(self.settings.attempt_timeout, call).await {
            Ok(Ok(Ok(translated))) => LanguageOutcome::Translated {
                content: translated.content,
                staged_location: translated.location,
            },
            Ok(Ok(Err(e))) => {
                warn!("Translation to {} failed: {}", target_language, e);
                LanguageOutcome::Failed {
                    error_message: e.to_string(),
                }
            }
            Ok(Err(_)) => failure(format!(
                "Translation to {} failed: provider panicked",
                target_language
            )),
            Err(_) => failure(format!(
                "Translation to {} timed out after {:?}",
                target_language, self.settings.attempt_timeout
            )),
        }
    }

    pub async fn orchestrate(
        &self,
        request: TranslationRequest,
    ) -> Result<TranslationResult, TranslateError> {
        request.check()?;
        let started = Instant::now();
        let TranslationRequest {
            bundle,
            target_languages,
            source_language,
        } = request;

        let guard = StageGuard::acquire(self.stage.as_ref(), &bundle)?;
        let handle = guard.handle();
        let source = source_language.as_str();

        let attempts: Vec<LanguageAttempt> = stream::iter(target_languages.into_iter().enumerate())
            .map(|(index, target)| self.attempt(handle, index, source, target))
            .buffer_unordered(self.settings.max_concurrency.max(1))
            .collect()
            .await;

        drop(guard);

        let result = TranslationResult::from_attempts(attempts);
        if let Some(metrics) = &self.metrics {
            metrics.record_request(started.elapsed());
        }
        info!(
            "Translated {} keys from {}: {}/{} languages succeeded in {:?}",
            bundle.message_count(),
            source_language,
            result.summary.successful,
            result.summary.total_languages,
            started.elapsed()
        );

        Ok(result)
    }
}
