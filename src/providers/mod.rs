//! Translation providers.
//!
//! The orchestrator only sees [`TranslationProvider`]: "translate this staged
//! bundle into language L". Underneath, [`BundleTranslator`] turns a staged
//! bundle into text segments and hands them to a [`TextTranslator`] backend
//! (OpenAI, DeepL, Azure, Google), optionally through a cache and always
//! through a fallback chain.

mod azure;
mod bundle_translator;
mod cache;
mod chain;
mod deepl;
mod google;
mod openai;
mod shared;

pub use azure::AzureTranslator;
pub use bundle_translator::BundleTranslator;
pub use cache::CachedTranslator;
pub use chain::ProviderChain;
pub use deepl::DeepLTranslator;
pub use google::GoogleTranslator;
pub use openai::OpenAiTranslator;
pub use shared::SharedProvider;

use crate::bundle::LocalizationBundle;
use crate::config::Config;
use crate::error::ProviderError;
use crate::metrics::ServiceMetrics;
use crate::retry::{with_retry_if, RetryConfig};
use crate::staging::StageHandle;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A translated bundle and where the provider wrote it.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedBundle {
    pub content: LocalizationBundle,
    pub location: String,
}

/// Bundle-level translation capability consumed by the orchestrator.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Translate the staged bundle from `source_language` into `target_language`.
    async fn translate_bundle(
        &self,
        source: &StageHandle,
        source_language: &str,
        target_language: &str,
    ) -> Result<TranslatedBundle, ProviderError>;
}

/// One translatable entry of a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub key: String,
    pub text: String,
    /// `description` from the entry's `@key` metadata, used as context
    pub description: Option<String>,
}

impl Segment {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Text-level translation backend.
///
/// Implementations return exactly one translation per input segment, in
/// input order.
#[async_trait]
pub trait TextTranslator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn translate_segments(
        &self,
        segments: &[Segment],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<String>, ProviderError>;
}

/// Supported translation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    DeepL,
    Azure,
    Google,
}

impl ProviderKind {
    /// Fallback order after the preferred provider
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::DeepL,
        ProviderKind::Azure,
        ProviderKind::Google,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::DeepL => "deepl",
            ProviderKind::Azure => "azure",
            ProviderKind::Google => "google",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "deepl" => Ok(ProviderKind::DeepL),
            "azure" => Ok(ProviderKind::Azure),
            "google" => Ok(ProviderKind::Google),
            other => bail!(
                "Unknown provider '{}': expected openai, deepl, azure or google",
                other
            ),
        }
    }
}

/// Build the provider stack described by the configuration.
///
/// Backends with credentials are chained with the preferred one first. The
/// chain is wrapped in the cache when caching is enabled.
pub fn build_provider(
    config: &Config,
    metrics: Option<Arc<ServiceMetrics>>,
) -> Result<Arc<dyn TranslationProvider>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .context("Failed to create HTTP client")?;
    let retry = RetryConfig::provider_call(config.provider_max_attempts);

    let mut backends: Vec<Arc<dyn TextTranslator>> = Vec::new();
    for kind in config.configured_providers() {
        let backend: Arc<dyn TextTranslator> = match kind {
            ProviderKind::OpenAi => Arc::new(OpenAiTranslator::new(
                client.clone(),
                credential(&config.openai_api_key)?,
                &config.openai_model,
                &config.openai_api_url,
                retry.clone(),
            )),
            ProviderKind::DeepL => {
                let key = credential(&config.deepl_api_key)?;
                let url = config
                    .deepl_api_url
                    .clone()
                    .unwrap_or_else(|| DeepLTranslator::default_url(key).to_string());
                Arc::new(DeepLTranslator::new(client.clone(), key, &url, retry.clone()))
            }
            ProviderKind::Azure => Arc::new(AzureTranslator::new(
                client.clone(),
                credential(&config.azure_translator_key)?,
                config.azure_translator_region.as_deref(),
                &config.azure_translator_url,
                retry.clone(),
            )),
            ProviderKind::Google => Arc::new(GoogleTranslator::new(
                client.clone(),
                credential(&config.google_translate_api_key)?,
                &config.google_translate_url,
                retry.clone(),
            )),
        };
        backends.push(backend);
    }

    if backends.is_empty() {
        bail!(
            "No translation provider configured: set at least one of OPENAI_API_KEY, \
             DEEPL_API_KEY, AZURE_TRANSLATOR_KEY or GOOGLE_TRANSLATE_API_KEY"
        );
    }

    let chain = ProviderChain::new(backends, metrics.clone());
    info!("Translation providers: {}", chain.backend_names().join(" -> "));

    let mut backend: Arc<dyn TextTranslator> = Arc::new(chain);
    if config.enable_caching {
        backend = Arc::new(CachedTranslator::new(backend, metrics));
    }

    Ok(Arc::new(BundleTranslator::new(
        backend,
        config.output_dir.clone(),
    )))
}

fn credential(value: &Option<String>) -> Result<&str> {
    value
        .as_deref()
        .context("Provider selected without credentials")
}

/// Send a request built by `build` and decode a JSON response, retrying
/// transient failures.
pub(crate) async fn send_json<R, B>(
    provider: &'static str,
    retry: &RetryConfig,
    operation_name: &str,
    build: B,
) -> Result<R, ProviderError>
where
    R: DeserializeOwned,
    B: Fn() -> reqwest::RequestBuilder,
{
    let build = &build;
    with_retry_if(
        retry,
        operation_name,
        move || async move {
            let response = build()
                .send()
                .await
                .map_err(|source| ProviderError::Transport { provider, source })?;

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
                return Err(ProviderError::Api {
                    provider,
                    status,
                    body,
                });
            }

            response
                .json::<R>()
                .await
                .map_err(|e| ProviderError::Malformed {
                    provider,
                    message: e.to_string(),
                })
        },
        ProviderError::is_retryable,
    )
    .await
}

/// Primary language subtag, e.g. "pt" for "pt-BR".
pub(crate) fn primary_subtag(code: &str) -> &str {
    code.split(['-', '_']).next().unwrap_or(code)
}

/// BCP 47 form with `-` separators, e.g. "zh-Hant" for "zh_Hant".
pub(crate) fn hyphenated(code: &str) -> String {
    code.replace('_', "-")
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted backends shared by provider tests.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that uppercases input, or always fails.
    pub struct ScriptedBackend {
        pub name: &'static str,
        pub fail_with_status: Option<u16>,
        pub calls: AtomicUsize,
        pub segments_seen: AtomicUsize,
    }

    impl ScriptedBackend {
        pub fn ok(name: &'static str) -> Self {
            Self {
                name,
                fail_with_status: None,
                calls: AtomicUsize::new(0),
                segments_seen: AtomicUsize::new(0),
            }
        }

        pub fn failing(name: &'static str, status: u16) -> Self {
            Self {
                fail_with_status: Some(status),
                ..Self::ok(name)
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextTranslator for ScriptedBackend {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn translate_segments(
            &self,
            segments: &[Segment],
            _source_language: &str,
            target_language: &str,
        ) -> Result<Vec<String>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.segments_seen
                .fetch_add(segments.len(), Ordering::SeqCst);
            if let Some(status) = self.fail_with_status {
                return Err(ProviderError::Api {
                    provider: self.name,
                    status,
                    body: "scripted failure".to_string(),
                });
            }
            Ok(segments
                .iter()
                .map(|s| format!("[{}] {}", target_language, s.text.to_uppercase()))
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(" DeepL ".parse::<ProviderKind>().unwrap(), ProviderKind::DeepL);
        assert_eq!("AZURE".parse::<ProviderKind>().unwrap(), ProviderKind::Azure);
        assert_eq!("google".parse::<ProviderKind>().unwrap(), ProviderKind::Google);
        assert!("bing".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_provider_kind_names_round_trip() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.name().parse::<ProviderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_language_code_helpers() {
        assert_eq!(primary_subtag("pt-BR"), "pt");
        assert_eq!(primary_subtag("zh_Hant"), "zh");
        assert_eq!(primary_subtag("es"), "es");
        assert_eq!(hyphenated("zh_Hant_TW"), "zh-Hant-TW");
    }

    #[test]
    fn test_build_provider_requires_credentials() {
        let config = Config::for_tests();
        let error = match build_provider(&config, None) {
            Ok(_) => panic!("expected an error without credentials"),
            Err(e) => e,
        };
        assert!(error.to_string().contains("No translation provider configured"));
    }

    #[test]
    fn test_build_provider_with_credentials() {
        let mut config = Config::for_tests();
        config.deepl_api_key = Some("key:fx".to_string());
        config.google_translate_api_key = Some("gkey".to_string());

        assert!(build_provider(&config, Some(Arc::new(ServiceMetrics::new()))).is_ok());
    }
}
