//! HTTP model client for OpenAI chat completions, Anthropic messages and
//! OpenAI-compatible local servers.

use std::time::Duration;

use async_trait::async_trait;
use cake_core::{GeneratedText, GenerationRequest, ModelClient, ModelEndpointConfig, Provider};
use config::ProviderCredentials;
use errors::ModelError;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utils::TextSanitizer;

use super::mood::infer_mood;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "is_blank")]
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

fn is_blank(value: &&str) -> bool {
    value.trim().is_empty()
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContent>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

struct Completion {
    text: Option<String>,
    tokens_used: Option<u32>,
}

/// Issues one call per `generate`, bounded by the endpoint's timeout.
pub struct HttpModelClient {
    http: Client,
    credentials: ProviderCredentials,
    sanitizer: TextSanitizer,
}

impl HttpModelClient {
    pub fn new(credentials: ProviderCredentials) -> Result<Self, ModelError> {
        let http = Client::builder()
            .build()
            .map_err(|e| ModelError::transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            credentials,
            sanitizer: TextSanitizer::new(),
        })
    }

    fn api_key(&self, endpoint: &ModelEndpointConfig) -> Option<String> {
        endpoint
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                self.credentials
                    .for_provider(endpoint.provider)
                    .and_then(|c| c.api_key.clone())
                    .filter(|k| !k.trim().is_empty())
            })
    }

    fn base_url(&self, endpoint: &ModelEndpointConfig) -> Result<String, ModelError> {
        endpoint
            .api_base
            .clone()
            .filter(|b| !b.trim().is_empty())
            .or_else(|| self.credentials.base_url(endpoint.provider))
            .map(|b| b.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                ModelError::transport(format!("no base URL for provider {}", endpoint.provider))
            })
    }

    fn context_message(request: &GenerationRequest) -> Option<String> {
        if request.context.is_empty() {
            None
        } else {
            Some(format!("Context: {}", request.context.canonical_string()))
        }
    }

    async fn call_chat_completions(
        &self,
        endpoint: &ModelEndpointConfig,
        request: &GenerationRequest,
    ) -> Result<Completion, ModelError> {
        let url = format!("{}/chat/completions", self.base_url(endpoint)?);
        let context = Self::context_message(request);

        let mut messages = Vec::with_capacity(3);
        if !request.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: &request.system_prompt,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.user_prompt,
        });
        if let Some(context) = context.as_deref() {
            messages.push(ChatMessage {
                role: "user",
                content: context,
            });
        }

        let body = ChatCompletionRequest {
            model: &endpoint.model_name,
            messages,
            max_tokens: endpoint.max_tokens,
            temperature: endpoint.temperature,
        };

        let mut builder = self.http.post(&url).json(&body);
        match self.api_key(endpoint) {
            Some(key) => builder = builder.bearer_auth(key),
            None if endpoint.provider == Provider::OpenAi => {
                return Err(ModelError::transport("missing API key for provider openai"));
            }
            None => {}
        }

        let response: ChatCompletionResponse = self.send(builder, endpoint).await?;
        Ok(Completion {
            text: response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content),
            tokens_used: response.usage.and_then(|u| u.total_tokens),
        })
    }

    async fn call_anthropic_messages(
        &self,
        endpoint: &ModelEndpointConfig,
        request: &GenerationRequest,
    ) -> Result<Completion, ModelError> {
        let url = format!("{}/v1/messages", self.base_url(endpoint)?);
        let key = self
            .api_key(endpoint)
            .ok_or_else(|| ModelError::transport("missing API key for provider anthropic"))?;

        let user_content = match Self::context_message(request) {
            Some(context) => format!("{}\n\n{}", request.user_prompt, context),
            None => request.user_prompt.clone(),
        };
        let body = AnthropicRequest {
            model: &endpoint.model_name,
            max_tokens: endpoint.max_tokens,
            temperature: endpoint.temperature,
            system: &request.system_prompt,
            messages: vec![ChatMessage {
                role: "user",
                content: &user_content,
            }],
        };

        let builder = self
            .http
            .post(&url)
            .header("x-api-key", key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        let response: AnthropicResponse = self.send(builder, endpoint).await?;
        Ok(Completion {
            text: response
                .content
                .into_iter()
                .find(|block| block.kind == "text" || block.kind.is_empty())
                .and_then(|block| block.text),
            tokens_used: response.usage.map(|u| u.input_tokens + u.output_tokens),
        })
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        endpoint: &ModelEndpointConfig,
    ) -> Result<T, ModelError> {
        let timeout_ms = duration_ms(endpoint.timeout());
        let resp = builder
            .timeout(endpoint.timeout())
            .send()
            .await
            .map_err(|e| map_reqwest_error(&e, timeout_ms))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            warn!(
                provider = %endpoint.provider,
                status = status.as_u16(),
                "Model provider returned an error status"
            );
            return Err(ModelError::transport(format!(
                "{} returned {}: {}",
                endpoint.provider,
                status.as_u16(),
                truncate_for_log(&message)
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(&e, timeout_ms))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ModelError::malformed(format!("unexpected response body: {e}")))
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn map_reqwest_error(err: &reqwest::Error, timeout_ms: u64) -> ModelError {
    if err.is_timeout() {
        ModelError::Timeout { timeout_ms }
    } else {
        ModelError::transport(err.to_string())
    }
}

fn truncate_for_log(message: &str) -> &str {
    utils::truncate_chars(message, 200)
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn generate(
        &self,
        endpoint: &ModelEndpointConfig,
        request: &GenerationRequest,
    ) -> Result<GeneratedText, ModelError> {
        let call = async {
            match endpoint.provider {
                Provider::OpenAi | Provider::Local => {
                    self.call_chat_completions(endpoint, request).await
                }
                Provider::Anthropic => self.call_anthropic_messages(endpoint, request).await,
                Provider::Static => Err(ModelError::transport(
                    "static provider has no model endpoint",
                )),
            }
        };

        let completion = tokio::time::timeout(endpoint.timeout(), call)
            .await
            .map_err(|_| ModelError::Timeout {
                timeout_ms: duration_ms(endpoint.timeout()),
            })??;

        let raw = completion
            .text
            .ok_or_else(|| ModelError::malformed("completion has no content"))?;
        let text = self.sanitizer.sanitize(&raw);
        if text.is_empty() {
            return Err(ModelError::malformed("completion is empty after sanitization"));
        }

        let (mood, animation) = infer_mood(&text);
        debug!(
            provider = %endpoint.provider,
            model = %endpoint.model_name,
            tokens = ?completion.tokens_used,
            "Model call succeeded"
        );

        Ok(GeneratedText {
            text,
            mood: mood.to_string(),
            animation: animation.to_string(),
            provider: endpoint.provider,
            model: endpoint.model_name.clone(),
            tokens_used: completion.tokens_used,
        })
    }
}
