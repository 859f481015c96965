use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

pub fn unique_id(prefix: &str) -> String {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}", prefix, id)
}

/// OpenAI-style chat completion body carrying `text` as the first choice.
pub fn chat_completion_body(text: &str) -> Value {
    json!({
        "id": unique_id("chatcmpl"),
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 20, "completion_tokens": 12, "total_tokens": 32 }
    })
}

/// A chat-completions endpoint at `{uri}/chat/completions`. Each test gets
/// its own server; nothing is shared across tests.
pub struct MockModelServer {
    server: MockServer,
}

impl MockModelServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        tracing::debug!(uri = %server.uri(), "Mock model server started");
        Self { server }
    }

    /// Base URL to configure as the provider's `api_base`.
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub async fn reply(&self, text: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body(text)))
            .mount(&self.server)
            .await;
    }

    pub async fn reply_after(&self, text: &str, delay: Duration) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_completion_body(text))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn fail_with(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_string("upstream unavailable"))
            .mount(&self.server)
            .await;
    }

    /// Number of chat-completion requests received so far.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    /// JSON bodies of every request received, in arrival order.
    pub async fn request_bodies(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ids_differ() {
        assert_ne!(unique_id("a"), unique_id("a"));
    }

    #[test]
    fn test_completion_body_shape() {
        let body = chat_completion_body("hello");
        assert_eq!(body["choices"][0]["message"]["content"], "hello");
        assert_eq!(body["usage"]["total_tokens"], 32);
    }
}
