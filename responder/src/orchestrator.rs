//! Tiered response generation: cache, primary model with retries, secondary
//! model, then canned responses.
//!
//! [`ResponseOrchestrator::generate`] never fails. Every model error is
//! absorbed and the call ends in a static-fallback response, so callers do
//! not need a fallback of their own. Which tier answered is recorded in
//! [`GeneratedResponse::provenance`] and the `fallback_reason` metadata.

use std::sync::Arc;

use cake_core::{
    GeneratedResponse, GenerationRequest, ModelClient, ModelEndpointConfig, Provenance,
    ResponseContext, Subject, SubjectConfig,
};
use errors::ModelError;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::cache::ResponseCache;
use crate::connectivity::ConnectivityTracker;
use crate::fallback::FallbackSelector;
use crate::prompt::PromptRenderer;
use crate::store::ConfigurationStore;
use crate::telemetry::ResponderTelemetry;

pub const REASON_UNCONFIGURED: &str = "unconfigured-subject";
pub const REASON_AI_UNAVAILABLE: &str = "ai-unavailable";

/// Outcome of the primary tier when it did not produce a response.
enum PrimaryMiss {
    Unreachable,
    Failed { attempts: u32, error: ModelError },
}

impl PrimaryMiss {
    fn tag(&self) -> &'static str {
        match self {
            Self::Unreachable => "unreachable",
            Self::Failed { error, .. } => error.reason_tag(),
        }
    }

    fn attempts(&self) -> u32 {
        match self {
            Self::Unreachable => 0,
            Self::Failed { attempts, .. } => *attempts,
        }
    }
}

pub struct ResponseOrchestrator {
    store: Arc<ConfigurationStore>,
    tracker: Arc<ConnectivityTracker>,
    client: Arc<dyn ModelClient>,
    selector: Arc<FallbackSelector>,
    renderer: PromptRenderer,
    telemetry: Arc<ResponderTelemetry>,
}

impl ResponseOrchestrator {
    pub fn new(
        store: Arc<ConfigurationStore>,
        tracker: Arc<ConnectivityTracker>,
        client: Arc<dyn ModelClient>,
        selector: Arc<FallbackSelector>,
        renderer: PromptRenderer,
        telemetry: Arc<ResponderTelemetry>,
    ) -> Self {
        Self {
            store,
            tracker,
            client,
            selector,
            renderer,
            telemetry,
        }
    }

    pub fn store(&self) -> &Arc<ConfigurationStore> {
        &self.store
    }

    pub fn tracker(&self) -> &Arc<ConnectivityTracker> {
        &self.tracker
    }

    /// Generates a response for a raw subject tag. Tags that name no known
    /// subject are answered with the generic canned response.
    pub async fn generate_for_tag(
        &self,
        tag: &str,
        context: &ResponseContext,
        force_refresh: bool,
    ) -> GeneratedResponse {
        match Subject::from_tag(tag) {
            Some(subject) => self.generate(subject, context, force_refresh).await,
            None => {
                warn!(tag, "Unknown subject tag, serving generic response");
                self.telemetry.record_fallback(tag, REASON_UNCONFIGURED);
                GeneratedResponse::generic(REASON_UNCONFIGURED, context.context_tag())
            }
        }
    }

    #[instrument(
        skip(self, context),
        fields(subject = %subject, request_id = %utils::generate_uuid())
    )]
    pub async fn generate(
        &self,
        subject: Subject,
        context: &ResponseContext,
        force_refresh: bool,
    ) -> GeneratedResponse {
        let started = Instant::now();
        let context = context.redacted();

        let response = match self.store.get_subject_config(subject) {
            Some(config) => self.generate_configured(&config, &context, force_refresh).await,
            None => {
                warn!("Subject has no configuration, serving static fallback");
                self.static_fallback(subject, &context, REASON_UNCONFIGURED)
            }
        };

        self.telemetry.record_response(
            subject.as_ref(),
            response.provenance.as_ref(),
            started.elapsed().as_secs_f64() * 1000.0,
        );
        response
    }

    async fn generate_configured(
        &self,
        config: &SubjectConfig,
        context: &ResponseContext,
        force_refresh: bool,
    ) -> GeneratedResponse {
        let subject = config.subject;
        let cache_key = ResponseCache::key_for(subject, context);

        if !force_refresh && config.cache_eligible {
            if let Some(mut cached) = self.store.cache_get(&cache_key) {
                debug!("Serving cached response");
                cached.provenance = Provenance::Cache;
                return cached;
            }
        }

        let rendered = self.renderer.render(config, context);
        if !rendered.missing.is_empty() {
            debug!(missing = ?rendered.missing, "Prompt placeholders without context values");
        }
        let request = GenerationRequest {
            system_prompt: config.system_prompt.clone(),
            user_prompt: rendered.text,
            context: context.clone(),
        };

        // A forced refresh always makes a live attempt.
        let reachable = force_refresh || self.tracker.is_reachable(config.primary.provider);
        let miss = if reachable {
            match self.call_primary(&config.primary, &request).await {
                Ok(response) => {
                    if config.cache_eligible {
                        self.store
                            .cache_put(&cache_key, response.clone(), config.cache_ttl());
                    }
                    return response;
                }
                Err(miss) => miss,
            }
        } else {
            info!(provider = %config.primary.provider, "Primary provider unreachable, skipping");
            PrimaryMiss::Unreachable
        };

        if let Some(secondary) = config.callable_secondary() {
            match self.call_once(secondary, &request).await {
                Ok(generated) => {
                    info!(
                        model = %secondary.model_name,
                        primary_error = miss.tag(),
                        "Served response from secondary model"
                    );
                    return GeneratedResponse::from_model(generated, Provenance::SecondaryModel)
                        .with_metadata("primary_error", miss.tag())
                        .with_metadata("primary_attempts", miss.attempts());
                }
                Err(e) => {
                    warn!(model = %secondary.model_name, error = %e, "Secondary model failed");
                }
            }
        }

        self.static_fallback(subject, context, REASON_AI_UNAVAILABLE)
            .with_metadata("primary_error", miss.tag())
            .with_metadata("primary_attempts", miss.attempts())
    }

    /// Up to `retry_attempts` calls. Before attempt `n + 1` the call sleeps
    /// `retry_delay * n`. Malformed completions end the loop at once.
    async fn call_primary(
        &self,
        endpoint: &ModelEndpointConfig,
        request: &GenerationRequest,
    ) -> Result<GeneratedResponse, PrimaryMiss> {
        let max_attempts = endpoint.retry_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.call_once(endpoint, request).await {
                Ok(generated) => {
                    debug!(attempts, model = %endpoint.model_name, "Primary model succeeded");
                    return Ok(
                        GeneratedResponse::from_model(generated, Provenance::LiveModel)
                            .with_metadata("attempts", attempts),
                    );
                }
                Err(error) => {
                    if !error.is_retryable() || attempts >= max_attempts {
                        warn!(
                            attempts,
                            model = %endpoint.model_name,
                            error = %error,
                            "Primary model gave up"
                        );
                        return Err(PrimaryMiss::Failed { attempts, error });
                    }
                    let delay = endpoint.retry_delay().saturating_mul(attempts);
                    debug!(
                        attempt = attempts,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Primary model failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn call_once(
        &self,
        endpoint: &ModelEndpointConfig,
        request: &GenerationRequest,
    ) -> Result<cake_core::GeneratedText, ModelError> {
        let provider = endpoint.provider.to_string();
        let result = self.client.generate(endpoint, request).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.reason_tag(),
        };
        self.telemetry.record_model_attempt(&provider, outcome);
        result
    }

    fn static_fallback(
        &self,
        subject: Subject,
        context: &ResponseContext,
        reason: &str,
    ) -> GeneratedResponse {
        let context_tag = context.context_tag();
        let chosen = self.selector.select(subject, context_tag, context.mood());
        self.telemetry.record_fallback(subject.as_ref(), reason);
        GeneratedResponse::from_static(&chosen, reason, context_tag)
    }
}
