use action_strategies::{ReasoningService, RecommendationRequest, Screenshot};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use gamecheck_core_types::{Candidate, QaError, Recommendation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::VisionLlmConfig;
use crate::parse::{parse_candidates, parse_recommendation};
use crate::prompt::{
    detection_user_prompt, recommendation_user_prompt, DETECTION_SYSTEM_PROMPT,
    RECOMMENDATION_SYSTEM_PROMPT,
};

/// [`ReasoningService`] over an OpenAI-compatible chat-completions API.
pub struct VisionLlmClient {
    client: Client,
    config: VisionLlmConfig,
}

impl VisionLlmClient {
    pub fn new(config: VisionLlmConfig) -> Result<Self, QaError> {
        if !config.has_keys() {
            return Err(QaError::invalid_input(
                "missing API key for the reasoning service",
            ));
        }
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| QaError::invalid_input(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &VisionLlmConfig {
        &self.config
    }

    /// Send one vision request, rotating API keys on rate limits, and
    /// return the model's text.
    async fn complete(
        &self,
        system: &str,
        user: String,
        screenshot: &Screenshot,
    ) -> Result<String, QaError> {
        let url = self.config.completions_url();
        let image_url = format!("data:image/png;base64,{}", STANDARD.encode(&screenshot.bytes));
        let keys: Vec<&String> = self
            .config
            .api_keys
            .iter()
            .filter(|k| !k.trim().is_empty())
            .collect();

        let mut last_error: Option<QaError> = None;
        for (index, key) in keys.iter().enumerate() {
            let body = ChatCompletionRequest {
                model: &self.config.model,
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
                response_format: ResponseFormat {
                    r#type: "json_object",
                },
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: MessageContent::Text(system.to_string()),
                    },
                    ChatMessage {
                        role: "user",
                        content: MessageContent::Parts(vec![
                            ContentPart::Text { text: user.clone() },
                            ContentPart::ImageUrl {
                                image_url: ImageUrl {
                                    url: image_url.clone(),
                                    detail: &self.config.image_detail,
                                },
                            },
                        ]),
                    },
                ],
            };

            let response = match self
                .client
                .post(&url)
                .bearer_auth(key)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(err) if err.is_timeout() => {
                    return Err(QaError::timeout("reasoning request", self.config.timeout()));
                }
                Err(err) => {
                    last_error = Some(QaError::reasoning(format!("request failed: {err}")));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<response unavailable>".to_string());
                if status.as_u16() == 429 && index + 1 < keys.len() {
                    let friendly = rate_limit_message(&text);
                    warn!(
                        target: "vision_llm",
                        message = %friendly,
                        attempt = index + 1,
                        remaining = keys.len() - index - 1,
                        "Reasoning service rate limited; switching API key"
                    );
                    last_error = Some(QaError::reasoning(friendly));
                    continue;
                }
                return Err(QaError::reasoning(format!("service returned {status}: {text}")));
            }

            let response: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|err| QaError::reasoning(format!("response invalid: {err}")))?;
            if let Some(usage) = &response.usage {
                debug!(
                    target: "vision_llm",
                    input_tokens = usage.prompt_tokens,
                    output_tokens = usage.completion_tokens,
                    "Reasoning call finished"
                );
            }
            return response
                .choices
                .first()
                .and_then(|choice| choice.message.content.as_text())
                .ok_or_else(|| QaError::reasoning("response missing content"));
        }

        Err(last_error.unwrap_or_else(|| QaError::reasoning("request exhausted all API keys")))
    }
}

#[async_trait]
impl ReasoningService for VisionLlmClient {
    async fn detect_candidates(&self, screenshot: &Screenshot) -> Result<Vec<Candidate>, QaError> {
        let content = self
            .complete(DETECTION_SYSTEM_PROMPT, detection_user_prompt(), screenshot)
            .await?;
        let candidates = parse_candidates(&content)?;
        debug!(target: "vision_llm", count = candidates.len(), "Parsed candidates");
        Ok(candidates)
    }

    async fn recommend_action(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Recommendation, QaError> {
        let content = self
            .complete(
                RECOMMENDATION_SYSTEM_PROMPT,
                recommendation_user_prompt(request),
                &request.screenshot,
            )
            .await?;
        let recommendation = parse_recommendation(&content)?;
        debug!(
            target: "vision_llm",
            action = %recommendation.primary.describe(),
            alternatives = recommendation.alternatives.len(),
            "Parsed recommendation"
        );
        Ok(recommendation)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(String),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: String },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: String,
    detail: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: ChatCompletionContent,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatCompletionContent {
    Text(String),
    Parts(Vec<ChatCompletionPart>),
}

impl ChatCompletionContent {
    fn as_text(&self) -> Option<String> {
        match self {
            ChatCompletionContent::Text(value) => Some(value.clone()),
            ChatCompletionContent::Parts(parts) => {
                let text = parts
                    .iter()
                    .filter_map(|part| part.text.as_ref())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n");
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: Option<String>,
}

fn rate_limit_message(raw: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(raw) {
        if let Some(message) = envelope.error.message {
            return format!("rate limit exceeded: {}", message.trim());
        }
    }
    "rate limit exceeded".to_string()
}
