//! Typed errors shared between the orchestrator, staging and providers.

use std::path::PathBuf;

/// The staging artifact could not be created.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("Failed to create staging directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write staging file in {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize bundle for staging: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Whole-request failures of a translation call.
///
/// Per-language provider failures are never reported through this type; they
/// are recorded as outcomes.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("No content provided")]
    EmptyContent,

    #[error("No target languages specified")]
    NoTargetLanguages,

    #[error("Invalid language code: '{0}'")]
    InvalidLanguage(String),

    #[error(transparent)]
    Staging(#[from] StagingError),
}

impl TranslateError {
    /// Caller-input errors, as opposed to infrastructure failures.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, TranslateError::Staging(_))
    }
}

/// A single translation attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to send request to {provider} API: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Malformed {provider} response: {message}")]
    Malformed {
        provider: &'static str,
        message: String,
    },

    #[error("Failed to access bundle file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Staged bundle is not valid ARB JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Failed to serialize translated bundle: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("All providers failed: {}", .0.join("; "))]
    Exhausted(Vec<String>),
}

impl ProviderError {
    /// 429, 5xx, network failures and unparsable bodies may be transient.
    /// Other 4xx responses are not retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Transport { .. } | ProviderError::Malformed { .. } => true,
            ProviderError::Io { .. }
            | ProviderError::Decode(_)
            | ProviderError::Encode(_)
            | ProviderError::Exhausted(_) => false,
        }
    }
}
