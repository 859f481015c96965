//! Seams between the orchestrator and the outside world.

use async_trait::async_trait;
use errors::ModelError;

use crate::types::{GeneratedText, ModelEndpointConfig, Provider, ResponseContext};

/// Everything a model client needs for one call, already rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Privacy-filtered context, sent alongside the prompt.
    pub context: ResponseContext,
}

/// Issues one generation call against one endpoint. Retries, timeouts and
/// fallback are the caller's concern; implementations make a single attempt.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(
        &self,
        endpoint: &ModelEndpointConfig,
        request: &GenerationRequest,
    ) -> Result<GeneratedText, ModelError>;
}

pub type ProbeError = Box<dyn std::error::Error + Send + Sync>;

/// Cheap reachability check for a provider. An `Err` is treated as
/// unreachable by callers.
pub trait ReachabilityProbe: Send + Sync {
    fn probe(&self, provider: Provider) -> Result<bool, ProbeError>;
}
