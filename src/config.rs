use crate::providers::ProviderKind;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_AZURE_TRANSLATOR_URL: &str =
    "https://api.cognitive.microsofttranslator.com/translate";
pub const DEFAULT_GOOGLE_TRANSLATE_URL: &str =
    "https://translation.googleapis.com/language/translate/v2";

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,
    pub log_level: String,

    // Provider selection
    pub preferred_provider: ProviderKind,

    // OpenAI
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_url: String,

    // DeepL
    pub deepl_api_key: Option<String>,
    pub deepl_api_url: Option<String>,

    // Azure Translator
    pub azure_translator_key: Option<String>,
    pub azure_translator_region: Option<String>,
    pub azure_translator_url: String,

    // Google Translate
    pub google_translate_api_key: Option<String>,
    pub google_translate_url: String,

    // Feature toggles
    pub enable_caching: bool,
    pub enable_analytics: bool,

    // Orchestration
    pub max_concurrent_translations: usize,
    pub translation_timeout: Duration,
    pub provider_max_attempts: u32,

    // Files
    pub staging_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let work_dir = std::env::temp_dir().join("arb-translator");

        Ok(Self {
            // Server
            port: parse_var("PORT", 8080)?,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            // Provider selection
            preferred_provider: parse_var("PREFERRED_PROVIDER", ProviderKind::OpenAi)?,

            // OpenAI
            openai_api_key: var("OPENAI_API_KEY"),
            openai_model: var("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            openai_api_url: var("OPENAI_API_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_API_URL.to_string()),

            // DeepL (endpoint derived from the key when unset)
            deepl_api_key: var("DEEPL_API_KEY"),
            deepl_api_url: var("DEEPL_API_URL"),

            // Azure Translator
            azure_translator_key: var("AZURE_TRANSLATOR_KEY"),
            azure_translator_region: var("AZURE_TRANSLATOR_REGION"),
            azure_translator_url: var("AZURE_TRANSLATOR_URL")
                .unwrap_or_else(|| DEFAULT_AZURE_TRANSLATOR_URL.to_string()),

            // Google Translate
            google_translate_api_key: var("GOOGLE_TRANSLATE_API_KEY"),
            google_translate_url: var("GOOGLE_TRANSLATE_URL")
                .unwrap_or_else(|| DEFAULT_GOOGLE_TRANSLATE_URL.to_string()),

            // Feature toggles
            enable_caching: parse_bool("ENABLE_CACHING", true)?,
            enable_analytics: parse_bool("ENABLE_ANALYTICS", true)?,

            // Orchestration
            max_concurrent_translations: parse_var::<usize>("MAX_CONCURRENT_TRANSLATIONS", 4)?
                .max(1),
            translation_timeout: Duration::from_secs(parse_var("TRANSLATION_TIMEOUT_SECS", 60)?),
            provider_max_attempts: parse_var("PROVIDER_MAX_ATTEMPTS", 3)?,

            // Files
            staging_dir: var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| work_dir.join("staging")),
            output_dir: var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| work_dir.join("output")),
        })
    }

    /// Whether credentials are present for `kind`.
    pub fn has_credentials(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::OpenAi => self.openai_api_key.is_some(),
            ProviderKind::DeepL => self.deepl_api_key.is_some(),
            ProviderKind::Azure => self.azure_translator_key.is_some(),
            ProviderKind::Google => self.google_translate_api_key.is_some(),
        }
    }

    /// Providers with credentials, preferred first.
    pub fn configured_providers(&self) -> Vec<ProviderKind> {
        std::iter::once(self.preferred_provider)
            .chain(
                ProviderKind::ALL
                    .into_iter()
                    .filter(|kind| *kind != self.preferred_provider),
            )
            .filter(|kind| self.has_credentials(*kind))
            .collect()
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            log_level: "debug".to_string(),
            preferred_provider: ProviderKind::OpenAi,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_api_url: DEFAULT_OPENAI_API_URL.to_string(),
            deepl_api_key: None,
            deepl_api_url: None,
            azure_translator_key: None,
            azure_translator_region: None,
            azure_translator_url: DEFAULT_AZURE_TRANSLATOR_URL.to_string(),
            google_translate_api_key: None,
            google_translate_url: DEFAULT_GOOGLE_TRANSLATE_URL.to_string(),
            enable_caching: true,
            enable_analytics: true,
            max_concurrent_translations: 4,
            translation_timeout: Duration::from_secs(5),
            provider_max_attempts: 1,
            staging_dir: std::env::temp_dir().join("arb-translator-test").join("staging"),
            output_dir: std::env::temp_dir().join("arb-translator-test").join("output"),
        }
    }
}

/// Environment variable with empty values treated as unset
fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid value for {}: '{}'", name, raw)),
        None => Ok(default),
    }
}

fn parse_bool(name: &str, default: bool) -> Result<bool> {
    match var(name).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => bail!("Invalid value for {}: '{}' (expected true or false)", name, v),
        },
    }
}
