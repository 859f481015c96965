//! # Cake Responder
//!
//! Mood-tagged response generation with tiered fallback.
//!
//! A call to [`ResponseOrchestrator::generate`] is answered, in order, from
//! the response cache, the subject's primary model (with retries), its
//! secondary model, or the canned-response library. Every component is
//! constructed once by [`ResponderBuilder`] and shared by `Arc`; nothing
//! lives in global state.

pub mod admin;
pub mod cache;
pub mod connectivity;
pub mod error;
pub mod fallback;
pub mod llm;
pub mod orchestrator;
pub mod prompt;
pub mod store;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use cake_core::{ModelClient, ReachabilityProbe, StaticResponse};
use config::Config;
use config::defaults::default_static_responses;
use tracing::info;

pub use admin::{AdminService, EndpointUpdate, SubjectConfigUpdate};
pub use cache::ResponseCache;
pub use connectivity::{ConnectivityTracker, CredentialProbe};
pub use error::{ResponderError, ResponderResult};
pub use fallback::FallbackSelector;
pub use llm::{HttpModelClient, ScriptedModelClient};
pub use orchestrator::ResponseOrchestrator;
pub use prompt::PromptRenderer;
pub use store::{ConfigPersistence, ConfigurationStore, FilePersistence, InMemoryPersistence};
pub use telemetry::ResponderTelemetry;

/// The wired components.
pub struct Responder {
    pub orchestrator: Arc<ResponseOrchestrator>,
    pub admin: AdminService,
}

/// Builds a [`Responder`] from process configuration. Every collaborator
/// defaults to its production implementation and can be replaced.
pub struct ResponderBuilder {
    config: Config,
    client: Option<Arc<dyn ModelClient>>,
    probe: Option<Arc<dyn ReachabilityProbe>>,
    persistence: Option<Arc<dyn ConfigPersistence>>,
    library: Option<Vec<StaticResponse>>,
}

impl ResponderBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: None,
            probe: None,
            persistence: None,
            library: None,
        }
    }

    pub fn with_model_client(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn ReachabilityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_persistence(mut self, persistence: Arc<dyn ConfigPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Replaces the built-in canned-response library.
    pub fn with_static_responses(mut self, library: Vec<StaticResponse>) -> Self {
        self.library = Some(library);
        self
    }

    pub async fn build(self) -> ResponderResult<Responder> {
        let config = self.config;
        let telemetry = Arc::new(if config.observability.metrics_enabled {
            ResponderTelemetry::new()
        } else {
            ResponderTelemetry::disabled()
        });

        let client: Arc<dyn ModelClient> = match self.client {
            Some(client) => client,
            None => Arc::new(HttpModelClient::new(config.providers.clone())?),
        };
        let probe: Arc<dyn ReachabilityProbe> = match self.probe {
            Some(probe) => probe,
            None => Arc::new(CredentialProbe::new(config.providers.clone())),
        };
        let persistence: Arc<dyn ConfigPersistence> = match self.persistence {
            Some(persistence) => persistence,
            None => Arc::new(FilePersistence::new(&config.service.subject_config_path)),
        };

        let cache = Arc::new(ResponseCache::new(config.service.cache_max_entries));
        let store = Arc::new(
            ConfigurationStore::load(
                persistence,
                self.library.unwrap_or_else(default_static_responses),
                cache,
                telemetry.clone(),
            )
            .await?,
        );
        let tracker = Arc::new(ConnectivityTracker::new(
            probe,
            Duration::from_secs(config.service.connectivity_cooldown_secs),
            telemetry.clone(),
        ));
        let selector = Arc::new(FallbackSelector::new(
            store.clone(),
            config.service.rng_seed,
        ));

        let orchestrator = Arc::new(ResponseOrchestrator::new(
            store.clone(),
            tracker,
            client,
            selector,
            PromptRenderer::new()?,
            telemetry,
        ));
        info!(
            subjects = store.configured_subjects().len(),
            cache_capacity = config.service.cache_max_entries,
            "Responder initialized"
        );

        Ok(Responder {
            admin: AdminService::new(orchestrator.clone()),
            orchestrator,
        })
    }
}
