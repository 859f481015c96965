//! Configuration store: per-subject configuration, canned-response
//! libraries and the response cache.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cake_core::{GeneratedResponse, StaticResponse, Subject, SubjectConfig};
use config::defaults::default_subject_config;
use config::{
    LoadedSubjectDocument, SubjectDocument, validate_static_response, validate_subject_config,
};
use dashmap::DashMap;
use errors::{ConfigResult, ConfigurationError};
use tracing::{error, info, warn};

use crate::cache::ResponseCache;
use crate::telemetry::ResponderTelemetry;

/// Durable storage for the subject document.
#[async_trait]
pub trait ConfigPersistence: Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet.
    async fn load(&self) -> ConfigResult<Option<LoadedSubjectDocument>>;

    async fn save(&self, document: &SubjectDocument) -> ConfigResult<()>;
}

/// Subject document stored as a JSON, YAML or TOML file.
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl ConfigPersistence for FilePersistence {
    async fn load(&self) -> ConfigResult<Option<LoadedSubjectDocument>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            if !path.exists() {
                return Ok(None);
            }
            config::load_subject_document(&path)
                .map(Some)
                .map_err(ConfigurationError::from)
        })
        .await
        .map_err(|e| ConfigurationError::Persistence {
            reason: e.to_string(),
        })?
    }

    async fn save(&self, document: &SubjectDocument) -> ConfigResult<()> {
        let path = self.path.clone();
        let document = document.clone();
        tokio::task::spawn_blocking(move || {
            config::save_subject_document(&path, &document).map_err(ConfigurationError::from)
        })
        .await
        .map_err(|e| ConfigurationError::Persistence {
            reason: e.to_string(),
        })?
    }
}

/// Process-local persistence for tests and ephemeral runs.
#[derive(Default)]
pub struct InMemoryPersistence {
    document: parking_lot::Mutex<Option<SubjectDocument>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: SubjectDocument) -> Self {
        Self {
            document: parking_lot::Mutex::new(Some(document)),
            ..Self::default()
        }
    }

    pub fn saved(&self) -> Option<SubjectDocument> {
        self.document.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConfigPersistence for InMemoryPersistence {
    async fn load(&self) -> ConfigResult<Option<LoadedSubjectDocument>> {
        Ok(self.document.lock().clone().map(|document| LoadedSubjectDocument {
            document,
            rejected: Vec::new(),
        }))
    }

    async fn save(&self, document: &SubjectDocument) -> ConfigResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ConfigurationError::Persistence {
                reason: "in-memory store configured to fail".to_string(),
            });
        }
        *self.document.lock() = Some(document.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Owns subject configurations and canned-response libraries.
///
/// Readers get `Arc` snapshots; writers replace whole values, so a reader
/// never observes a partially applied update. Persisting writes are
/// serialized so the saved document always reflects every accepted update.
pub struct ConfigurationStore {
    configs: DashMap<Subject, Arc<SubjectConfig>>,
    responses: DashMap<Subject, Arc<Vec<StaticResponse>>>,
    cache: Arc<ResponseCache>,
    persistence: Arc<dyn ConfigPersistence>,
    write_lock: tokio::sync::Mutex<()>,
    telemetry: Arc<ResponderTelemetry>,
}

impl ConfigurationStore {
    /// Loads the persisted document, filling in defaults for any subject it
    /// lacks or whose entry fails validation, and re-saving the merged
    /// document. With nothing persisted, defaults for every subject are written
    /// back. An unreadable document is left on disk untouched and defaults
    /// are served from memory.
    pub async fn load(
        persistence: Arc<dyn ConfigPersistence>,
        library: Vec<StaticResponse>,
        cache: Arc<ResponseCache>,
        telemetry: Arc<ResponderTelemetry>,
    ) -> ConfigResult<Self> {
        let (document, needs_save) = match persistence.load().await {
            Ok(Some(loaded)) => {
                let mut document = loaded.document;
                let mut rejected = loaded.rejected.len();
                for (subject, config) in &mut document.subjects {
                    if let Err(e) = validate_subject_config(config) {
                        warn!(
                            subject = %subject,
                            error = %e,
                            "Replacing invalid persisted subject configuration with defaults"
                        );
                        *config = default_subject_config(*subject);
                        rejected += 1;
                    }
                }
                let missing = document.missing_subjects();
                for subject in &missing {
                    document
                        .subjects
                        .insert(*subject, default_subject_config(*subject));
                }
                if !missing.is_empty() || rejected > 0 {
                    info!(
                        missing = missing.len(),
                        rejected,
                        "Merged built-in defaults into subject configuration"
                    );
                }
                (document, !missing.is_empty() || rejected > 0)
            }
            Ok(None) => {
                info!("No persisted subject configuration, creating defaults");
                (defaults_document(), true)
            }
            Err(e) => {
                error!(error = %e, "Failed to read subject configuration, serving defaults");
                (defaults_document(), false)
            }
        };

        if needs_save {
            if let Err(e) = persistence.save(&document).await {
                warn!(error = %e, "Failed to persist subject configuration");
            }
        }

        Ok(Self::from_parts(
            document,
            library,
            persistence,
            cache,
            telemetry,
        ))
    }

    /// Builds a store from an explicit document and library without touching
    /// persistence.
    pub fn from_parts(
        document: SubjectDocument,
        library: Vec<StaticResponse>,
        persistence: Arc<dyn ConfigPersistence>,
        cache: Arc<ResponseCache>,
        telemetry: Arc<ResponderTelemetry>,
    ) -> Self {
        let configs = DashMap::new();
        for (subject, config) in document.subjects {
            configs.insert(subject, Arc::new(config));
        }

        let mut grouped: BTreeMap<Subject, Vec<StaticResponse>> = BTreeMap::new();
        for response in library {
            grouped.entry(response.subject).or_default().push(response);
        }
        let responses = DashMap::new();
        for (subject, list) in grouped {
            responses.insert(subject, Arc::new(list));
        }

        Self {
            configs,
            responses,
            cache,
            persistence,
            write_lock: tokio::sync::Mutex::new(()),
            telemetry,
        }
    }

    pub fn get_subject_config(&self, subject: Subject) -> Option<Arc<SubjectConfig>> {
        self.configs.get(&subject).map(|c| Arc::clone(&c))
    }

    pub fn configured_subjects(&self) -> Vec<Subject> {
        let mut subjects: Vec<Subject> = self.configs.iter().map(|e| *e.key()).collect();
        subjects.sort();
        subjects
    }

    pub fn document(&self) -> SubjectDocument {
        SubjectDocument {
            subjects: self
                .configs
                .iter()
                .map(|e| (*e.key(), e.value().as_ref().clone()))
                .collect(),
        }
    }

    /// Validates, persists and then swaps in the new configuration. On any
    /// error the store is left unchanged.
    pub async fn update_subject_config(
        &self,
        subject: Subject,
        config: SubjectConfig,
    ) -> ConfigResult<()> {
        if config.subject != subject {
            self.telemetry.record_config_update(subject.as_ref(), false);
            return Err(ConfigurationError::validation(
                "subject",
                format!("configuration declares {} but targets {}", config.subject, subject),
            ));
        }
        if let Err(e) = validate_subject_config(&config) {
            self.telemetry.record_config_update(subject.as_ref(), false);
            warn!(subject = %subject, error = %e, "Rejected subject configuration update");
            return Err(e);
        }

        let _guard = self.write_lock.lock().await;
        let mut document = self.document();
        document.subjects.insert(subject, config.clone());
        self.persistence.save(&document).await?;
        self.configs.insert(subject, Arc::new(config));

        self.telemetry.record_config_update(subject.as_ref(), true);
        info!(subject = %subject, "Updated subject configuration");
        Ok(())
    }

    /// Candidates for a subject, filtered by context tag and then by mood.
    /// A filter that matches nothing is ignored. Never empty: a subject with
    /// no authored responses yields one synthesized generic response.
    pub fn get_fallback_responses(
        &self,
        subject: Subject,
        context_tag: &str,
        mood: &str,
    ) -> Vec<StaticResponse> {
        let library = self.responses_for(subject);
        if library.is_empty() {
            return vec![StaticResponse::generic(subject, context_tag)];
        }

        let by_tag: Vec<&StaticResponse> = library
            .iter()
            .filter(|r| r.context_tag == context_tag)
            .collect();
        let stage: Vec<&StaticResponse> = if by_tag.is_empty() {
            library.iter().collect()
        } else {
            by_tag
        };

        let by_mood: Vec<&StaticResponse> =
            stage.iter().copied().filter(|r| r.mood == mood).collect();
        let chosen = if by_mood.is_empty() { stage } else { by_mood };

        chosen.into_iter().cloned().collect()
    }

    /// Full library for a subject, in insertion order.
    pub fn all_fallback_responses(&self, subject: Subject) -> Vec<StaticResponse> {
        self.responses_for(subject).as_ref().clone()
    }

    pub fn fallback_counts(&self) -> BTreeMap<Subject, usize> {
        Subject::all()
            .into_iter()
            .map(|s| (s, self.responses_for(s).len()))
            .collect()
    }

    /// Appends without deduplicating.
    pub fn add_fallback_response(&self, response: StaticResponse) -> ConfigResult<()> {
        validate_static_response(&response)?;
        let subject = response.subject;
        let mut entry = self.responses.entry(subject).or_default();
        Arc::make_mut(entry.value_mut()).push(response);
        Ok(())
    }

    fn responses_for(&self, subject: Subject) -> Arc<Vec<StaticResponse>> {
        self.responses
            .get(&subject)
            .map(|r| Arc::clone(&r))
            .unwrap_or_default()
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn cache_get(&self, key: &str) -> Option<GeneratedResponse> {
        let hit = self.cache.get(key);
        if hit.is_some() {
            self.telemetry.record_cache_hit();
        } else {
            self.telemetry.record_cache_miss();
        }
        hit
    }

    pub fn cache_put(&self, key: &str, response: GeneratedResponse, ttl: Duration) {
        self.cache.put(key, response, ttl);
        self.telemetry.record_cache_size(self.cache.len());
    }

    pub fn cache_clear(&self) -> usize {
        let removed = self.cache.clear();
        self.telemetry.record_cache_size(0);
        info!(removed, "Cleared response cache");
        removed
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

fn defaults_document() -> SubjectDocument {
    SubjectDocument::from_configs(Subject::all().into_iter().map(default_subject_config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cake_core::{ModelEndpointConfig, Provider};
    use config::defaults::default_static_responses;

    fn telemetry() -> Arc<ResponderTelemetry> {
        Arc::new(ResponderTelemetry::disabled())
    }

    async fn default_store(persistence: Arc<InMemoryPersistence>) -> ConfigurationStore {
        ConfigurationStore::load(
            persistence,
            default_static_responses(),
            Arc::new(ResponseCache::new(100)),
            telemetry(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_first_start_persists_defaults() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let store = default_store(persistence.clone()).await;

        assert_eq!(store.configured_subjects().len(), Subject::all().len());
        assert_eq!(persistence.save_count(), 1);
        assert_eq!(
            persistence.saved().unwrap().subjects.len(),
            Subject::all().len()
        );
    }

    #[tokio::test]
    async fn test_partial_document_is_completed() {
        let mut motivation = default_subject_config(Subject::Motivation);
        motivation.prompt_template = "custom {streak}".to_string();
        let persistence = Arc::new(InMemoryPersistence::with_document(
            SubjectDocument::from_configs(vec![motivation]),
        ));

        let store = default_store(persistence.clone()).await;
        assert_eq!(store.configured_subjects().len(), Subject::all().len());
        assert_eq!(
            store
                .get_subject_config(Subject::Motivation)
                .unwrap()
                .prompt_template,
            "custom {streak}"
        );
        assert_eq!(persistence.save_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_persisted_entries_are_replaced_with_defaults() {
        let mut motivation = default_subject_config(Subject::Motivation);
        motivation.primary.temperature = 5.0;
        motivation.primary.retry_attempts = 0;
        let mut celebration = default_subject_config(Subject::Celebration);
        celebration.primary.retry_delay_ms = u64::MAX;
        let mut encouragement = default_subject_config(Subject::Encouragement);
        encouragement.prompt_template = "Keep at it, {challenge}".to_string();

        let mut document = defaults_document();
        for config in [motivation, celebration, encouragement] {
            document.subjects.insert(config.subject, config);
        }
        let persistence = Arc::new(InMemoryPersistence::with_document(document));
        let store = default_store(persistence.clone()).await;

        assert_eq!(
            *store.get_subject_config(Subject::Motivation).unwrap(),
            default_subject_config(Subject::Motivation)
        );
        assert_eq!(
            *store.get_subject_config(Subject::Celebration).unwrap(),
            default_subject_config(Subject::Celebration)
        );
        assert_eq!(
            store
                .get_subject_config(Subject::Encouragement)
                .unwrap()
                .prompt_template,
            "Keep at it, {challenge}"
        );

        assert_eq!(persistence.save_count(), 1);
        let saved = persistence.saved().unwrap();
        assert_eq!(saved, store.document());
        assert!(
            saved
                .subjects
                .values()
                .all(|config| validate_subject_config(config).is_ok())
        );
    }

    #[tokio::test]
    async fn test_complete_document_is_not_rewritten() {
        let persistence = Arc::new(InMemoryPersistence::with_document(defaults_document()));
        let _store = default_store(persistence.clone()).await;
        assert_eq!(persistence.save_count(), 0);
    }

    #[tokio::test]
    async fn test_update_validates_and_leaves_store_unchanged() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let store = default_store(persistence.clone()).await;
        let before = store.get_subject_config(Subject::Motivation).unwrap();

        let mut bad = before.as_ref().clone();
        bad.primary.temperature = 5.0;
        let err = store
            .update_subject_config(Subject::Motivation, bad)
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(store.get_subject_config(Subject::Motivation).unwrap(), before);
        assert_eq!(persistence.save_count(), 1);
    }

    #[tokio::test]
    async fn test_update_persists_new_config() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let store = default_store(persistence.clone()).await;

        let mut updated = default_subject_config(Subject::Celebration);
        updated.primary = ModelEndpointConfig::new(Provider::Anthropic, "claude-3-haiku");
        updated.primary.temperature = 0.4;
        store
            .update_subject_config(Subject::Celebration, updated.clone())
            .await
            .unwrap();

        assert_eq!(
            store.get_subject_config(Subject::Celebration).unwrap().as_ref(),
            &updated
        );
        let saved = persistence.saved().unwrap();
        assert_eq!(saved.subjects[&Subject::Celebration], updated);
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_store_unchanged() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let store = default_store(persistence.clone()).await;
        persistence.set_fail_saves(true);

        let mut updated = default_subject_config(Subject::Celebration);
        updated.cache_eligible = false;
        let err = store
            .update_subject_config(Subject::Celebration, updated)
            .await
            .unwrap_err();

        assert!(matches!(err, ConfigurationError::Persistence { .. }));
        assert!(store.get_subject_config(Subject::Celebration).unwrap().cache_eligible);
    }

    #[tokio::test]
    async fn test_update_rejects_mismatched_subject() {
        let store = default_store(Arc::new(InMemoryPersistence::new())).await;
        let err = store
            .update_subject_config(
                Subject::Motivation,
                default_subject_config(Subject::Celebration),
            )
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_concurrent_updates_to_different_subjects() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let store = Arc::new(default_store(persistence.clone()).await);

        let mut handles = Vec::new();
        for subject in [Subject::Motivation, Subject::Celebration, Subject::GoalSetting] {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut config = default_subject_config(subject);
                config.cache_ttl_secs = 60;
                store.update_subject_config(subject, config).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let saved = persistence.saved().unwrap();
        for subject in [Subject::Motivation, Subject::Celebration, Subject::GoalSetting] {
            assert_eq!(saved.subjects[&subject].cache_ttl_secs, 60);
        }
    }

    #[tokio::test]
    async fn test_fallback_filtering_stages() {
        let store = default_store(Arc::new(InMemoryPersistence::new())).await;

        let exact = store.get_fallback_responses(Subject::TaskCompletion, "streak", "excited");
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].animation, "confetti_explosion");

        let tag_only = store.get_fallback_responses(Subject::TaskCompletion, "difficult", "sleepy");
        assert_eq!(tag_only.len(), 1);
        assert_eq!(tag_only[0].mood, "proud");

        let unfiltered =
            store.get_fallback_responses(Subject::TaskCompletion, "unknown", "sleepy");
        assert_eq!(unfiltered.len(), 3);

        let mood_only =
            store.get_fallback_responses(Subject::TaskCreation, "unknown", "supportive");
        assert_eq!(mood_only.len(), 1);
        assert_eq!(mood_only[0].context_tag, "difficult");
    }

    #[tokio::test]
    async fn test_fallback_never_empty() {
        let store = default_store(Arc::new(InMemoryPersistence::new())).await;
        for subject in Subject::all() {
            for tag in ["general", "streak", "nonsense"] {
                for mood in ["cheerful", "excited", "nonsense"] {
                    assert!(!store.get_fallback_responses(subject, tag, mood).is_empty());
                }
            }
        }
        let generic = store.get_fallback_responses(Subject::ProjectPlanning, "general", "cheerful");
        assert_eq!(generic.len(), 1);
        assert_eq!(generic[0].mood, "cheerful");
    }

    #[tokio::test]
    async fn test_add_fallback_appends_without_dedup() {
        let store = default_store(Arc::new(InMemoryPersistence::new())).await;
        let response = StaticResponse::new(
            Subject::Celebration,
            "general",
            "excited",
            "🎉 Party!",
            "bounce",
            2,
        );

        store.add_fallback_response(response.clone()).unwrap();
        store.add_fallback_response(response).unwrap();
        assert_eq!(store.all_fallback_responses(Subject::Celebration).len(), 2);
        assert_eq!(store.fallback_counts()[&Subject::Celebration], 2);

        let empty =
            StaticResponse::new(Subject::Celebration, "general", "excited", " ", "bounce", 1);
        assert!(store.add_fallback_response(empty).is_err());
    }

    #[tokio::test]
    async fn test_file_persistence_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let persistence = Arc::new(FilePersistence::new(dir.path().join("cake_ai_config.json")));

        assert!(persistence.load().await.unwrap().is_none());
        persistence.save(&defaults_document()).await.unwrap();
        let loaded = persistence.load().await.unwrap().unwrap();
        assert_eq!(loaded.document, defaults_document());
    }

    #[tokio::test]
    async fn test_unreadable_document_is_not_overwritten() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cake_ai_config.json");
        std::fs::write(&path, "{ broken").unwrap();

        let store = ConfigurationStore::load(
            Arc::new(FilePersistence::new(&path)),
            default_static_responses(),
            Arc::new(ResponseCache::new(10)),
            telemetry(),
        )
        .await
        .unwrap();

        assert_eq!(store.configured_subjects().len(), Subject::all().len());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ broken");
    }
}
