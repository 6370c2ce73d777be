use super::{hyphenated, primary_subtag, send_json, Segment, TextTranslator};
use crate::error::ProviderError;
use crate::retry::RetryConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "DeepL";

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: Vec<&'a str>,
    source_lang: String,
    target_lang: String,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    text: String,
}

/// DeepL `/v2/translate` backend.
pub struct DeepLTranslator {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    retry: RetryConfig,
}

impl DeepLTranslator {
    /// DeepL accepts at most 50 texts per request
    const MAX_BATCH_SIZE: usize = 50;

    pub fn new(client: reqwest::Client, api_key: &str, api_url: &str, retry: RetryConfig) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            api_url: api_url.to_string(),
            retry,
        }
    }

    /// Free-plan keys end in `:fx` and are served from a separate host.
    pub fn default_url(api_key: &str) -> &'static str {
        if api_key.ends_with(":fx") {
            "https://api-free.deepl.com/v2/translate"
        } else {
            "https://api.deepl.com/v2/translate"
        }
    }

    async fn translate_chunk(
        &self,
        chunk: &[Segment],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<String>, ProviderError> {
        let request = TranslateRequest {
            text: chunk.iter().map(|s| s.text.as_str()).collect(),
            // Source languages take no region; targets may (EN-GB, PT-BR)
            source_lang: primary_subtag(source_language).to_uppercase(),
            target_lang: hyphenated(target_language).to_uppercase(),
        };

        let response: TranslateResponse = send_json(
            PROVIDER,
            &self.retry,
            &format!("DeepL translation to {}", target_language),
            || {
                self.client
                    .post(&self.api_url)
                    .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
                    .json(&request)
            },
        )
        .await?;

        if response.translations.len() != chunk.len() {
            return Err(ProviderError::Malformed {
                provider: PROVIDER,
                message: format!(
                    "expected {} translations, got {}",
                    chunk.len(),
                    response.translations.len()
                ),
            });
        }

        Ok(response.translations.into_iter().map(|t| t.text).collect())
    }
}

#[async_trait]
impl TextTranslator for DeepLTranslator {
    fn name(&self) -> &'static str {
        "deepl"
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn translator(server: &MockServer) -> DeepLTranslator {
        DeepLTranslator::new(
            reqwest::Client::new(),
            "deepl-key",
            &format!("{}/v2/translate", server.uri()),
            RetryConfig::new(2, Duration::from_millis(10)),
        )
    }

    #[test]
    fn test_default_url_free_and_pro_keys() {
        assert_eq!(
            DeepLTranslator::default_url("abc:fx"),
            "https://api-free.deepl.com/v2/translate"
        );
        assert_eq!(
            DeepLTranslator::default_url("abc"),
            "https://api.deepl.com/v2/translate"
        );
    }

    #[tokio::test]
    async fn test_translate_segments_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .and(header("Authorization", "DeepL-Auth-Key deepl-key"))
            .and(body_partial_json(serde_json::json!({
                "source_lang": "EN",
                "target_lang": "PT-BR",
                "text": ["Hello", "Bye"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": [
                    {"detected_source_language": "EN", "text": "Olá"},
                    {"detected_source_language": "EN", "text": "Tchau"}
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let segments = vec![Segment::new("a", "Hello"), Segment::new("b", "Bye")];
        let result = translator(&mock_server)
            .translate_segments(&segments, "en_US", "pt_BR")
            .await
            .expect("Should succeed");

        assert_eq!(result, vec!["Olá", "Tchau"]);
    }

    #[tokio::test]
    async fn test_translate_segments_chunks_large_batches() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": vec![serde_json::json!({"text": "x"}); 50]
            })))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": vec![serde_json::json!({"text": "y"}); 10]
            })))
            .mount(&mock_server)
            .await;

        let segments: Vec<Segment> = (0..60)
            .map(|i| Segment::new(format!("k{}", i), format!("text {}", i)))
            .collect();
        let result = translator(&mock_server)
            .translate_segments(&segments, "en", "de")
            .await
            .expect("Should succeed");

        assert_eq!(result.len(), 60);
        assert_eq!(result[0], "x");
        assert_eq!(result[59], "y");
    }

    #[tokio::test]
    async fn test_translate_segments_quota_exceeded() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(ResponseTemplate::new(456).set_body_string("Quota exceeded"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let error = translator(&mock_server)
            .translate_segments(&[Segment::new("a", "Hello")], "en", "de")
            .await
            .unwrap_err();

        assert!(error.to_string().contains("456"));
    }

    #[tokio::test]
    async fn test_translate_segments_count_mismatch() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"translations": []})),
            )
            .mount(&mock_server)
            .await;

        let error = translator(&mock_server)
            .translate_segments(&[Segment::new("a", "Hello")], "en", "de")
            .await
            .unwrap_err();

        assert!(error.to_string().contains("expected 1 translations, got 0"));
    }
}
