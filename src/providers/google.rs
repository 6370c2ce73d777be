use super::{hyphenated, send_json, Segment, TextTranslator};
use crate::error::ProviderError;
use crate::retry::RetryConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "Google";

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: Vec<&'a str>,
    source: String,
    target: String,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

/// Google Translate v2 backend.
pub struct GoogleTranslator {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    retry: RetryConfig,
}

impl GoogleTranslator {
    /// Google Translate v2 accepts up to 128 texts per request
    const MAX_BATCH_SIZE: usize = 128;

    pub fn new(client: reqwest::Client, api_key: &str, api_url: &str, retry: RetryConfig) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            api_url: api_url.to_string(),
            retry,
        }
    }

    async fn translate_chunk(
        &self,
        chunk: &[Segment],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<String>, ProviderError> {
        let request = TranslateRequest {
            q: chunk.iter().map(|s| s.text.as_str()).collect(),
            source: hyphenated(source_language),
            target: hyphenated(target_language),
            format: "text",
        };

        let response: TranslateResponse = send_json(
            PROVIDER,
            &self.retry,
            &format!("Google translation to {}", target_language),
            || {
                self.client
                    .post(&self.api_url)
                    .query(&[("key", self.api_key.as_str())])
                    .json(&request)
            },
        )
        .await?;

        let translations = response.data.translations;
        if translations.len() != chunk.len() {
            return Err(ProviderError::Malformed {
                provider: PROVIDER,
                message: format!(
                    "expected {} translations, got {}",
                    chunk.len(),
                    translations.len()
                ),
            });
        }

        Ok(translations.into_iter().map(|t| t.translated_text).collect())
    }
}

#[async_trait]
impl TextTranslator for GoogleTranslator {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn translate_segments(
        &self,
        segments: &[Segment],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<String>, ProviderError> {
        let mut translated = Vec::with_capacity(segments.len());
        for chunk in segments.chunks(Self::MAX_BATCH_SIZE) {
            translated.extend(
                self.translate_chunk(chunk, source_language, target_language)
                    .await?,
            );
        }
        Ok(translated)
    }
}
