use super::{send_json, Segment, TextTranslator};
use crate::error::ProviderError;
use crate::retry::RetryConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const PROVIDER: &str = "OpenAI";

/// OpenAI Chat Completion request for translation
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Check if a model is a reasoning model that doesn't support temperature
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

/// Build the system prompt for translating ARB entries
fn build_system_prompt(source_language: &str, target_language: &str) -> String {
    format!(
        r#"You are a professional software localization translator. Translate the values of the JSON object you receive from "{}" to "{}".

## Rules

### DO NOT change:
- The JSON keys
- Placeholders in curly braces (e.g., {{name}}, {{count}})
- ICU message syntax keywords (plural, select, other, =0, =1)
- URLs, e-mail addresses and product names

### DO translate:
- All user-facing text, including the branches of plural/select messages

### Context:
- Descriptions of what each message is used for may follow the JSON object. Use them to pick the right wording; never include them in the output.

### Output:
- Reply with a single JSON object containing exactly the same keys, each mapped to its translation
- No commentary, no markdown fences"#,
        source_language, target_language
    )
}

/// Build the user prompt: the entries to translate plus their descriptions
fn build_user_prompt(segments: &[Segment]) -> String {
    let entries: Map<String, Value> = segments
        .iter()
        .map(|s| (s.key.clone(), Value::String(s.text.clone())))
        .collect();
    let entries = Value::Object(entries).to_string();

    let context: Vec<String> = segments
        .iter()
        .filter_map(|s| {
            s.description
                .as_ref()
                .map(|d| format!("- {}: {}", s.key, d))
        })
        .collect();

    if context.is_empty() {
        entries
    } else {
        format!("{}\n\nDescriptions:\n{}", entries, context.join("\n"))
    }
}

/// Map the model's JSON reply back onto the segments, in order
fn parse_translations(content: &str, segments: &[Segment]) -> Result<Vec<String>, ProviderError> {
    let malformed = |message: String| ProviderError::Malformed {
        provider: PROVIDER,
        message,
    };

    let object: Map<String, Value> = serde_json::from_str(content.trim())
        .map_err(|e| malformed(format!("reply is not a JSON object: {}", e)))?;

    segments
        .iter()
        .map(|segment| {
            object
                .get(&segment.key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| malformed(format!("missing translation for key '{}'", segment.key)))
        })
        .collect()
}

/// OpenAI chat-completions backend.
pub struct OpenAiTranslator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
    retry: RetryConfig,
}

impl OpenAiTranslator {
    pub fn new(
        client: reqwest::Client,
        api_key: &str,
        model: &str,
        api_url: &str,
        retry: RetryConfig,
    ) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            api_url: api_url.to_string(),
            retry,
        }
    }

    fn build_request(
        &self,
        segments: &[Segment],
        source_language: &str,
        target_language: &str,
    ) -> ChatRequest {
        // Reasoning models need higher token limits and don't support temperature
        let is_reasoning = is_reasoning_model(&self.model);

        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: build_system_prompt(source_language, target_language),
                },
                Message {
                    role: "user".to_string(),
                    content: build_user_prompt(segments),
                },
            ],
            max_completion_tokens: if is_reasoning { 16000 } else { 4000 },
            temperature: if is_reasoning { None } else { Some(0.3) },
            reasoning_effort: if is_reasoning {
                Some("low".to_string())
            } else {
                None
            },
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

#[async_trait]
impl TextTranslator for OpenAiTranslator {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn translate_segments(
        &self,
        segments: &[Segment],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<String>, ProviderError> {
        let request = self.build_request(segments, source_language, target_language);

        let response: ChatResponse = send_json(
            PROVIDER,
            &self.retry,
            &format!("OpenAI translation to {}", target_language),
            || {
                self.client
                    .post(&self.api_url)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .json(&request)
            },
        )
        .await?;

        let content = response
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ProviderError::Malformed {
                provider: PROVIDER,
                message: "response contained no choices".to_string(),
            })?;

        parse_translations(content, segments)
    }
}
