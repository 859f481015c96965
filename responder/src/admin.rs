//! Operator-facing surface: configuration reads and updates, connectivity
//! checks, sync sweeps, cache and canned-response management.
//!
//! Unlike generation, these calls report failures to the caller.

use std::collections::BTreeMap;
use std::sync::Arc;

use cake_core::{
    GeneratedResponse, ModelEndpointConfig, Provenance, Provider, ResponseContext,
    StaticResponse, Subject, SubjectConfig,
};
use chrono::{DateTime, Utc};
use errors::{ConfigResult, ConfigurationError};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::connectivity::ConnectivitySnapshot;
use crate::orchestrator::ResponseOrchestrator;

/// Context tag and mood pairs generated for every subject during a sync.
pub const SYNC_SCENARIOS: [(&str, &str); 3] = [
    ("general", "cheerful"),
    ("celebration", "excited"),
    ("encouragement", "supportive"),
];

const MASKED: &str = "***";

/// Partial endpoint update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointUpdate {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub retry_attempts: Option<u32>,
    #[serde(default)]
    pub retry_delay_ms: Option<u64>,
}

impl EndpointUpdate {
    fn parsed_provider(&self) -> ConfigResult<Option<Provider>> {
        self.provider
            .as_deref()
            .map(|raw| {
                raw.trim()
                    .parse::<Provider>()
                    .map_err(|_| ConfigurationError::UnknownProvider {
                        provider: raw.to_string(),
                    })
            })
            .transpose()
    }

    fn apply(self, base: ModelEndpointConfig) -> ConfigResult<ModelEndpointConfig> {
        let provider = self.parsed_provider()?.unwrap_or(base.provider);
        Ok(ModelEndpointConfig {
            provider,
            model_name: self.model_name.unwrap_or(base.model_name),
            api_key: self.api_key.or(base.api_key),
            api_base: self.api_base.or(base.api_base),
            max_tokens: self.max_tokens.unwrap_or(base.max_tokens),
            temperature: self.temperature.unwrap_or(base.temperature),
            timeout_secs: self.timeout_secs.unwrap_or(base.timeout_secs),
            retry_attempts: self.retry_attempts.unwrap_or(base.retry_attempts),
            retry_delay_ms: self.retry_delay_ms.unwrap_or(base.retry_delay_ms),
        })
    }

    /// A new secondary endpoint must name its provider and model.
    fn create(self) -> ConfigResult<ModelEndpointConfig> {
        let provider = self
            .parsed_provider()?
            .ok_or_else(|| ConfigurationError::validation("secondary.provider", "required"))?;
        let model_name = self
            .model_name
            .clone()
            .ok_or_else(|| ConfigurationError::validation("secondary.model_name", "required"))?;
        self.apply(ModelEndpointConfig::new(provider, model_name))
    }
}

/// Partial subject configuration update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectConfigUpdate {
    #[serde(default)]
    pub primary: Option<EndpointUpdate>,
    #[serde(default)]
    pub secondary: Option<EndpointUpdate>,
    #[serde(default)]
    pub remove_secondary: bool,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub prompt_template: Option<String>,
    #[serde(default)]
    pub max_context_length: Option<usize>,
    #[serde(default)]
    pub cache_eligible: Option<bool>,
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
}

impl SubjectConfigUpdate {
    fn apply(self, mut config: SubjectConfig) -> ConfigResult<SubjectConfig> {
        if let Some(primary) = self.primary {
            config.primary = primary.apply(config.primary)?;
        }
        if self.remove_secondary {
            config.secondary = None;
        } else if let Some(secondary) = self.secondary {
            config.secondary = Some(match config.secondary.take() {
                Some(current) => secondary.apply(current)?,
                None => secondary.create()?,
            });
        }
        if let Some(prompt) = self.system_prompt {
            config.system_prompt = prompt;
        }
        if let Some(template) = self.prompt_template {
            config.prompt_template = template;
        }
        if let Some(length) = self.max_context_length {
            config.max_context_length = length;
        }
        if let Some(eligible) = self.cache_eligible {
            config.cache_eligible = eligible;
        }
        if let Some(ttl) = self.cache_ttl_secs {
            config.cache_ttl_secs = ttl;
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    /// Subject configurations with endpoint API keys masked.
    pub subjects: BTreeMap<Subject, SubjectConfig>,
    pub available_providers: Vec<Provider>,
    pub available_subjects: Vec<Subject>,
    pub connectivity: Vec<ConnectivitySnapshot>,
    pub fallback_counts: BTreeMap<Subject, usize>,
    pub cache_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    AlwaysAvailable,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderStatus {
    pub status: ConnectionStatus,
    pub latency_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum SyncOutcome {
    Synced { added: usize },
    InvalidSubject,
    Error { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FallbackListing {
    pub responses: BTreeMap<Subject, Vec<StaticResponse>>,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemHealth {
    Operational,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub operational: bool,
    pub providers_initialized: Vec<Provider>,
    pub cache_size: usize,
    pub configured_subjects: Vec<Subject>,
    pub fallback_counts: BTreeMap<Subject, usize>,
    pub connectivity: BTreeMap<Provider, ProviderStatus>,
    pub health: SystemHealth,
    pub timestamp: DateTime<Utc>,
}

pub struct AdminService {
    orchestrator: Arc<ResponseOrchestrator>,
}

impl AdminService {
    pub fn new(orchestrator: Arc<ResponseOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn config_snapshot(&self) -> ConfigSnapshot {
        let store = self.orchestrator.store();
        let subjects = store
            .document()
            .subjects
            .into_iter()
            .map(|(subject, config)| (subject, mask_credentials(config)))
            .collect();
        ConfigSnapshot {
            subjects,
            available_providers: Provider::iter().collect(),
            available_subjects: Subject::all(),
            connectivity: self.orchestrator.tracker().snapshot(),
            fallback_counts: store.fallback_counts(),
            cache_size: store.cache_len(),
        }
    }

    /// Applies a partial update on top of the subject's current
    /// configuration. Rejected updates leave the store unchanged.
    pub async fn update_subject_config(
        &self,
        subject_tag: &str,
        update: SubjectConfigUpdate,
    ) -> ConfigResult<SubjectConfig> {
        let subject = parse_subject(subject_tag)?;
        let store = self.orchestrator.store();
        let current = store
            .get_subject_config(subject)
            .map(|c| c.as_ref().clone())
            .unwrap_or_else(|| config::defaults::default_subject_config(subject));

        let updated = update.apply(current)?;
        store.update_subject_config(subject, updated.clone()).await?;
        Ok(mask_credentials(updated))
    }

    /// Probes every provider now, ignoring the cool-down.
    pub fn test_connectivity(&self) -> BTreeMap<Provider, ProviderStatus> {
        let tracker = self.orchestrator.tracker();
        Provider::iter()
            .map(|provider| {
                if provider.is_static() {
                    return (
                        provider,
                        ProviderStatus {
                            status: ConnectionStatus::AlwaysAvailable,
                            latency_ms: 0.0,
                            error: None,
                        },
                    );
                }
                let started = Instant::now();
                let outcome = tracker.probe_detailed(provider);
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                let status = match outcome {
                    Ok(true) => ProviderStatus {
                        status: ConnectionStatus::Connected,
                        latency_ms,
                        error: None
                    },
                    Ok(false) => ProviderStatus {
                        status: ConnectionStatus::Disconnected,
                        latency_ms,
                        error: None
                    },
                    Err(e) => ProviderStatus {
                        status: ConnectionStatus::Error,
                        latency_ms,
                        error: Some(e.to_string())
                    }
                };
                (provider, status)
            })
            .collect()
    }

    /// Force-generates the sync scenarios for each requested subject (all
    /// subjects when `subjects` is `None`) and appends every live-model
    /// answer to that subject's canned library. Subjects run concurrently
    /// and report independently.
    ///
    /// Results are keyed by the canonical subject tag, so spellings of the
    /// same subject (`task-completion`, `task_completion`) run once.
    /// Unrecognised tags are reported under the tag as given.
    pub async fn sync(&self, subjects: Option<Vec<String>>) -> BTreeMap<String, SyncOutcome> {
        let requested: Vec<String> = match subjects {
            Some(tags) => tags,
            None => Subject::all().into_iter().map(|s| s.to_string()).collect(),
        };

        let mut targets: BTreeMap<String, Option<Subject>> = BTreeMap::new();
        for tag in requested {
            let (key, subject) = match Subject::from_tag(&tag) {
                Some(subject) => (subject.to_string(), Some(subject)),
                None => (tag, None),
            };
            targets.insert(key, subject);
        }

        let runs = targets.into_iter().map(|(tag, subject)| async move {
            let outcome = match subject {
                Some(subject) => self.sync_subject(subject).await,
                None => SyncOutcome::InvalidSubject,
            };
            (tag, outcome)
        });
        let results: BTreeMap<String, SyncOutcome> = join_all(runs).await.into_iter().collect();

        let added: usize = results
            .values()
            .map(|o| match o {
                SyncOutcome::Synced { added } => *added,
                _ => 0,
            })
            .sum();
        info!(subjects = results.len(), added, "Sync sweep finished");
        results
    }

    async fn sync_subject(&self, subject: Subject) -> SyncOutcome {
        let store = self.orchestrator.store();
        let mut added = 0;
        for (context_tag, mood) in SYNC_SCENARIOS {
            let context = ResponseContext::new()
                .with("context_type", context_tag)
                .with("mood", mood);
            let response = self.orchestrator.generate(subject, &context, true).await;
            if response.provenance != Provenance::LiveModel {
                continue;
            }
            let fallback = StaticResponse::new(
                subject,
                context_tag,
                response.mood,
                response.text,
                response.animation,
                1,
            );
            if let Err(e) = store.add_fallback_response(fallback) {
                warn!(subject = %subject, error = %e, "Sync could not store response");
                return SyncOutcome::Error {
                    reason: e.to_string(),
                };
            }
            added += 1;
        }
        SyncOutcome::Synced { added }
    }

    pub fn clear_cache(&self) -> usize {
        self.orchestrator.store().cache_clear()
    }

    pub fn list_fallbacks(&self) -> FallbackListing {
        let store = self.orchestrator.store();
        let responses: BTreeMap<Subject, Vec<StaticResponse>> = Subject::all()
            .into_iter()
            .map(|s| (s, store.all_fallback_responses(s)))
            .filter(|(_, list)| !list.is_empty())
            .collect();
        let total = responses.values().map(Vec::len).sum();
        FallbackListing { responses, total }
    }

    pub fn add_fallback(&self, response: StaticResponse) -> ConfigResult<()> {
        self.orchestrator.store().add_fallback_response(response)
    }

    /// Generates once for a subject with an explicit context. Forces a live
    /// attempt unless `force_refresh` is `Some(false)`.
    pub async fn test_subject(
        &self,
        subject_tag: &str,
        context: &ResponseContext,
        force_refresh: Option<bool>,
    ) -> ConfigResult<GeneratedResponse> {
        let subject = parse_subject(subject_tag)?;
        Ok(self
            .orchestrator
            .generate(subject, context, force_refresh.unwrap_or(true))
            .await)
    }

    pub fn status(&self) -> StatusReport {
        let store = self.orchestrator.store();
        let connectivity = self.test_connectivity();

        let providers_initialized = connectivity
            .iter()
            .filter(|(_, s)| {
                matches!(
                    s.status,
                    ConnectionStatus::Connected | ConnectionStatus::AlwaysAvailable
                )
            })
            .map(|(p, _)| *p)
            .collect();
        let health = if connectivity.values().all(|s| {
            matches!(
                s.status,
                ConnectionStatus::Connected | ConnectionStatus::AlwaysAvailable
            )
        }) {
            SystemHealth::Operational
        } else {
            SystemHealth::Degraded
        };

        StatusReport {
            operational: true,
            providers_initialized,
            cache_size: store.cache_len(),
            configured_subjects: store.configured_subjects(),
            fallback_counts: store.fallback_counts(),
            connectivity,
            health,
            timestamp: Utc::now(),
        }
    }
}

fn parse_subject(tag: &str) -> ConfigResult<Subject> {
    Subject::from_tag(tag).ok_or_else(|| ConfigurationError::UnknownSubject {
        subject: tag.to_string(),
    })
}

fn mask_credentials(mut config: SubjectConfig) -> SubjectConfig {
    let mask = |endpoint: &mut ModelEndpointConfig| {
        if endpoint.api_key.is_some() {
            endpoint.api_key = Some(MASKED.to_string());
        }
    };
    mask(&mut config.primary);
    if let Some(secondary) = config.secondary.as_mut() {
        mask(secondary);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use crate::connectivity::{ConnectivityTracker, DEFAULT_COOLDOWN};
    use crate::fallback::FallbackSelector;
    use crate::llm::ScriptedModelClient;
    use crate::prompt::PromptRenderer;
    use crate::store::{ConfigurationStore, InMemoryPersistence};
    use crate::telemetry::ResponderTelemetry;
    use cake_core::{ProbeError, ReachabilityProbe};
    use config::defaults::default_subject_configs;
    use config::SubjectDocument;
    use errors::ModelError;

    struct FixedProbe;

    impl ReachabilityProbe for FixedProbe {
        fn probe(&self, provider: Provider) -> Result<bool, ProbeError> {
            match provider {
                Provider::OpenAi => Ok(true),
                Provider::Anthropic => Ok(false),
                _ => Err("socket closed".into()),
            }
        }
    }

    fn admin(client: ScriptedModelClient) -> AdminService {
        let telemetry = Arc::new(ResponderTelemetry::disabled());
        let store = Arc::new(ConfigurationStore::from_parts(
            SubjectDocument::from_configs(default_subject_configs()),
            Vec::new(),
            Arc::new(InMemoryPersistence::new()),
            Arc::new(ResponseCache::new(100)),
            telemetry.clone(),
        ));
        let tracker = Arc::new(ConnectivityTracker::new(
            Arc::new(FixedProbe),
            DEFAULT_COOLDOWN,
            telemetry.clone(),
        ));
        let selector = Arc::new(FallbackSelector::new(store.clone(), Some(5)));
        AdminService::new(Arc::new(ResponseOrchestrator::new(
            store,
            tracker,
            Arc::new(client),
            selector,
            PromptRenderer::new().unwrap(),
            telemetry,
        )))
    }

    #[tokio::test]
    async fn test_out_of_range_temperature_rejected() {
        let admin = admin(ScriptedModelClient::new());
        let before = admin.config_snapshot().subjects[&Subject::Motivation].clone();

        let update = SubjectConfigUpdate {
            primary: Some(EndpointUpdate {
                temperature: Some(5.0),
                ..EndpointUpdate::default()
            }),
            ..SubjectConfigUpdate::default()
        };
        let err = admin
            .update_subject_config("motivation", update)
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let after = admin.config_snapshot().subjects[&Subject::Motivation].clone();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_unknown_provider_and_subject() {
        let admin = admin(ScriptedModelClient::new());
        let update = SubjectConfigUpdate {
            primary: Some(EndpointUpdate {
                provider: Some("carrier-pigeon".to_string()),
                ..EndpointUpdate::default()
            }),
            ..SubjectConfigUpdate::default()
        };
        assert_eq!(
            admin.update_subject_config("motivation", update).await,
            Err(ConfigurationError::UnknownProvider {
                provider: "carrier-pigeon".to_string(),
            })
        );
        assert!(matches!(
            admin
                .update_subject_config("birthday", SubjectConfigUpdate::default())
                .await,
            Err(ConfigurationError::UnknownSubject { .. })
        ));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let admin = admin(ScriptedModelClient::new());
        let update = SubjectConfigUpdate {
            primary: Some(EndpointUpdate {
                provider: Some("anthropic".to_string()),
                model_name: Some("claude-3-haiku".to_string()),
                temperature: Some(0.5),
                api_key: Some("sk-secret".to_string()),
                ..EndpointUpdate::default()
            }),
            cache_eligible: Some(false),
            ..SubjectConfigUpdate::default()
        };
        let updated = admin
            .update_subject_config("task-completion", update)
            .await
            .unwrap();

        assert_eq!(updated.primary.provider, Provider::Anthropic);
        assert_eq!(updated.primary.max_tokens, 150);
        assert_eq!(updated.primary.api_key.as_deref(), Some(MASKED));
        assert!(!updated.cache_eligible);
        assert!(!updated.system_prompt.is_empty());
    }

    #[tokio::test]
    async fn test_new_secondary_requires_provider() {
        let admin = admin(ScriptedModelClient::new());
        let removed = admin
            .update_subject_config(
                "celebration",
                SubjectConfigUpdate {
                    remove_secondary: true,
                    ..SubjectConfigUpdate::default()
                },
            )
            .await
            .unwrap();
        assert!(removed.secondary.is_none());

        let update = SubjectConfigUpdate {
            secondary: Some(EndpointUpdate {
                model_name: Some("llama3".to_string()),
                ..EndpointUpdate::default()
            }),
            ..SubjectConfigUpdate::default()
        };
        let err = admin
            .update_subject_config("celebration", update)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::validation("secondary.provider", "required")
        );
    }

    #[test]
    fn test_connectivity_statuses() {
        let admin = admin(ScriptedModelClient::new());
        let results = admin.test_connectivity();

        assert_eq!(results[&Provider::OpenAi].status, ConnectionStatus::Connected);
        assert_eq!(
            results[&Provider::Anthropic].status,
            ConnectionStatus::Disconnected
        );
        assert_eq!(results[&Provider::Local].status, ConnectionStatus::Error);
        assert_eq!(
            results[&Provider::Static].status,
            ConnectionStatus::AlwaysAvailable
        );
        assert_eq!(admin.status().health, SystemHealth::Degraded);
    }

    #[tokio::test]
    async fn test_sync_appends_live_answers_only() {
        let client = ScriptedModelClient::new()
            .always_reply("gpt-3.5-turbo", "Amazing momentum!");
        let admin = admin(client);

        let results = admin
            .sync(Some(vec![
                "motivation".to_string(),
                "not-a-subject".to_string(),
            ]))
            .await;

        assert_eq!(results["motivation"], SyncOutcome::Synced { added: 3 });
        assert_eq!(results["not-a-subject"], SyncOutcome::InvalidSubject);

        let listing = admin.list_fallbacks();
        assert_eq!(listing.total, 3);
        let synced = &listing.responses[&Subject::Motivation];
        assert!(synced.iter().all(|r| r.text == "Amazing momentum!"));
        assert_eq!(synced[0].mood, "excited");
    }

    #[tokio::test]
    async fn test_sync_runs_each_subject_once() {
        let client = ScriptedModelClient::new().always_reply("gpt-3.5-turbo", "Nicely done!");
        let admin = admin(client);

        let results = admin
            .sync(Some(vec![
                "task-completion".to_string(),
                "task_completion".to_string(),
                " Task_Completion ".to_string(),
            ]))
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(
            results["task_completion"],
            SyncOutcome::Synced {
                added: SYNC_SCENARIOS.len(),
            }
        );
        assert_eq!(
            admin.list_fallbacks().responses[&Subject::TaskCompletion].len(),
            SYNC_SCENARIOS.len()
        );
    }

    #[tokio::test]
    async fn test_extreme_ttl_rejected_and_generation_still_live() {
        let client = ScriptedModelClient::new().always_reply("gpt-3.5-turbo", "Keep going!");
        let admin = admin(client);

        let update = SubjectConfigUpdate {
            cache_ttl_secs: Some(u64::MAX),
            ..SubjectConfigUpdate::default()
        };
        let err = admin
            .update_subject_config("motivation", update)
            .await
            .unwrap_err();
        assert_eq!(err, ConfigurationError::validation("cache_ttl_secs", "range"));

        let response = admin
            .test_subject("motivation", &ResponseContext::new(), Some(false))
            .await
            .unwrap();
        assert_eq!(response.provenance, Provenance::LiveModel);
        assert_eq!(response.text, "Keep going!");
    }

    #[tokio::test]
    async fn test_sync_with_failing_model_adds_nothing() {
        let client = ScriptedModelClient::new()
            .always_fail("gpt-3.5-turbo", ModelError::malformed("empty"));
        let admin = admin(client);

        let results = admin.sync(None).await;
        assert_eq!(results.len(), Subject::all().len());
        assert!(
            results
                .values()
                .all(|o| *o == SyncOutcome::Synced { added: 0 })
        );
        assert_eq!(admin.list_fallbacks().total, 0);
    }

    #[tokio::test]
    async fn test_subject_test_defaults_to_forced_refresh() {
        let client = ScriptedModelClient::new().always_reply("gpt-3.5-turbo", "Plan it out");
        let admin = admin(client);
        let ctx = ResponseContext::new().with("project_name", "Cake");

        let first = admin.test_subject("project_planning", &ctx, None).await.unwrap();
        let second = admin.test_subject("project_planning", &ctx, None).await.unwrap();
        assert_eq!(first.provenance, Provenance::LiveModel);
        assert_eq!(second.provenance, Provenance::LiveModel);

        let cached = admin
            .test_subject("project_planning", &ctx, Some(false))
            .await
            .unwrap();
        assert_eq!(cached.provenance, Provenance::Cache);
        assert_eq!(admin.clear_cache(), 1);
    }

    #[tokio::test]
    async fn test_add_fallback_validates() {
        let admin = admin(ScriptedModelClient::new());
        let empty =
            StaticResponse::new(Subject::Celebration, "general", "cheerful", "", "bounce", 1);
        assert!(admin.add_fallback(empty).is_err());

        let good = StaticResponse::new(
            Subject::Celebration,
            "general",
            "cheerful",
            "Party time!",
            "confetti_explosion",
            2,
        );
        admin.add_fallback(good).unwrap();
        assert_eq!(admin.config_snapshot().fallback_counts[&Subject::Celebration], 1);
    }
}
