use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use cake_core::{GeneratedText, GenerationRequest, ModelClient, ModelEndpointConfig};
use errors::ModelError;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::mood::infer_mood;

/// One observed call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub at: Instant,
}

#[derive(Default)]
struct Script {
    queued: VecDeque<Result<String, ModelError>>,
    default: Option<Result<String, ModelError>>,
    latency: Option<Duration>,
}

/// Model client with per-model scripted replies, keyed by model name.
///
/// Queued replies are consumed first, then the model's default. A model
/// with neither fails with a transport error. Latency is simulated with
/// `tokio::time::sleep` and bounded by the endpoint timeout.
#[derive(Default)]
pub struct ScriptedModelClient {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn always_reply(self, model: &str, text: &str) -> Self {
        self.scripts.lock().entry(model.to_string()).or_default().default =
            Some(Ok(text.to_string()));
        self
    }

    pub fn always_fail(self, model: &str, error: ModelError) -> Self {
        self.scripts.lock().entry(model.to_string()).or_default().default = Some(Err(error));
        self
    }

    pub fn with_latency(self, model: &str, latency: Duration) -> Self {
        self.scripts.lock().entry(model.to_string()).or_default().latency = Some(latency);
        self
    }

    pub fn push_reply(&self, model: &str, reply: Result<String, ModelError>) {
        self.scripts
            .lock()
            .entry(model.to_string())
            .or_default()
            .queued
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, model: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.model == model)
            .cloned()
            .collect()
    }

    fn next_reply(&self, model: &str) -> (Result<String, ModelError>, Option<Duration>) {
        let mut scripts = self.scripts.lock();
        match scripts.get_mut(model) {
            Some(script) => {
                let reply = script
                    .queued
                    .pop_front()
                    .or_else(|| script.default.clone())
                    .unwrap_or_else(|| Err(ModelError::transport("no scripted reply")));
                (reply, script.latency)
            }
            None => (
                Err(ModelError::transport(format!("unknown model {model}"))),
                None,
            ),
        }
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    async fn generate(
        &self,
        endpoint: &ModelEndpointConfig,
        request: &GenerationRequest,
    ) -> Result<GeneratedText, ModelError> {
        self.calls.lock().push(RecordedCall {
            model: endpoint.model_name.clone(),
            system_prompt: request.system_prompt.clone(),
            user_prompt: request.user_prompt.clone(),
            at: Instant::now(),
        });

        let (reply, latency) = self.next_reply(&endpoint.model_name);
        if let Some(latency) = latency {
            if tokio::time::timeout(endpoint.timeout(), tokio::time::sleep(latency))
                .await
                .is_err()
            {
                return Err(ModelError::Timeout {
                    timeout_ms: endpoint.timeout_secs * 1000,
                });
            }
        }

        let text = reply?;
        if text.trim().is_empty() {
            return Err(ModelError::malformed("empty completion"));
        }
        let (mood, animation) = infer_mood(&text);
        Ok(GeneratedText {
            text,
            mood: mood.to_string(),
            animation: animation.to_string(),
            provider: endpoint.provider,
            model: endpoint.model_name.clone(),
            tokens_used: None,
        })
    }
}
