use super::{hyphenated, send_json, Segment, TextTranslator};
use crate::error::ProviderError;
use crate::retry::RetryConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "Azure";

#[derive(Debug, Serialize)]
struct TextItem<'a> {
    #[serde(rename = "Text")]
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResult {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    text: String,
}

/// Azure AI Translator v3 backend.
pub struct AzureTranslator {
    client: reqwest::Client,
    api_key: String,
    region: Option<String>,
    api_url: String,
    retry: RetryConfig,
}

impl AzureTranslator {
    const MAX_BATCH_SIZE: usize = 100;

    pub fn new(
        client: reqwest::Client,
        api_key: &str,
        region: Option<&str>,
        api_url: &str,
        retry: RetryConfig,
    ) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            region: region.map(str::to_string),
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
        let body: Vec<TextItem> = chunk.iter().map(|s| TextItem { text: &s.text }).collect();
        let from = hyphenated(source_language);
        let to = hyphenated(target_language);

        let response: Vec<TranslateResult> = send_json(
            PROVIDER,
            &self.retry,
            &format!("Azure translation to {}", target_language),
            || {
                let mut request = self
                    .client
                    .post(&self.api_url)
                    .query(&[
                        ("api-version", "3.0"),
                        ("from", from.as_str()),
                        ("to", to.as_str()),
                    ])
                    .header("Ocp-Apim-Subscription-Key", &self.api_key);
                if let Some(region) = &self.region {
                    request = request.header("Ocp-Apim-Subscription-Region", region);
                }
                request.json(&body)
            },
        )
        .await?;

        if response.len() != chunk.len() {
            return Err(ProviderError::Malformed {
                provider: PROVIDER,
                message: format!("expected {} results, got {}", chunk.len(), response.len()),
            });
        }

        response
            .into_iter()
            .map(|result| {
                result
                    .translations
                    .into_iter()
                    .next()
                    .map(|t| t.text)
                    .ok_or_else(|| ProviderError::Malformed {
                        provider: PROVIDER,
                        message: "result without translations".to_string(),
                    })
            })
            .collect()
    }
}

#[async_trait]
impl TextTranslator for AzureTranslator {
    fn name(&self) -> &'static str {
        "azure"
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
