use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use validator::{Validate, ValidationError};

/// Situation category that selects the prompt, model configuration and
/// canned-response library.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Subject {
    TaskCreation,
    TaskCompletion,
    Motivation,
    Celebration,
    Encouragement,
    ProductivityTips,
    GoalSetting,
    TimeManagement,
    HabitFormation,
    StressManagement,
    TeamCollaboration,
    ProjectPlanning,
}

impl Subject {
    /// Parses a caller-supplied tag. Accepts `task_completion` and
    /// `task-completion` alike.
    pub fn from_tag(tag: &str) -> Option<Self> {
        tag.trim().replace('-', "_").parse().ok()
    }

    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }
}

/// External model provider. `Static` is the process-local canned-response
/// provider: always reachable, never probed, never called over the network.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Provider {
    #[serde(rename = "openai")]
    #[strum(to_string = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    #[strum(to_string = "anthropic")]
    Anthropic,
    #[serde(rename = "local")]
    #[strum(to_string = "local")]
    Local,
    #[serde(rename = "static", alias = "fallback")]
    #[strum(to_string = "static", serialize = "fallback")]
    Static,
}

impl Provider {
    pub fn is_static(self) -> bool {
        self == Self::Static
    }

    /// Documented sampling-temperature range for the provider's API.
    pub fn temperature_range(self) -> (f32, f32) {
        match self {
            Self::Anthropic => (0.0, 1.0),
            Self::OpenAi | Self::Local | Self::Static => (0.0, 2.0),
        }
    }

    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("https://api.openai.com/v1"),
            Self::Anthropic => Some("https://api.anthropic.com"),
            Self::Local => Some("http://localhost:11434/v1"),
            Self::Static => None,
        }
    }

    /// Providers reached over the network.
    pub fn remote() -> Vec<Self> {
        Self::iter().filter(|p| !p.is_static()).collect()
    }
}

/// Which tier produced a [`GeneratedResponse`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Provenance {
    LiveModel,
    SecondaryModel,
    Cache,
    StaticFallback,
}

fn default_max_tokens() -> u32 {
    150
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn validate_endpoint_temperature(endpoint: &ModelEndpointConfig) -> Result<(), ValidationError> {
    let (min, max) = endpoint.provider.temperature_range();
    if endpoint.temperature.is_nan() || endpoint.temperature < min || endpoint.temperature > max {
        let mut err = ValidationError::new("temperature_out_of_range");
        err.message = Some(
            format!(
                "temperature {} outside [{}, {}] for provider {}",
                endpoint.temperature, min, max, endpoint.provider
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// One callable model. Each call works on its own clone, so administrative
/// updates never change an endpoint while a call is in flight.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[validate(schema(function = "validate_endpoint_temperature"))]
pub struct ModelEndpointConfig {
    pub provider: Provider,

    #[validate(length(min = 1, max = 200))]
    pub model_name: String,

    /// Overrides the environment-supplied credential for this endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    #[serde(default = "default_max_tokens")]
    #[validate(range(min = 1, max = 32000))]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1, max = 300))]
    pub timeout_secs: u64,

    #[serde(default = "default_retry_attempts")]
    #[validate(range(min = 1, max = 10))]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    #[validate(range(max = 60000))]
    pub retry_delay_ms: u64,
}

impl ModelEndpointConfig {
    pub fn new(provider: Provider, model_name: impl Into<String>) -> Self {
        Self {
            provider,
            model_name: model_name.into(),
            api_key: None,
            api_base: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }

    /// The canned-response pseudo endpoint used as a secondary marker.
    pub fn static_responses() -> Self {
        Self {
            timeout_secs: 1,
            retry_attempts: 1,
            ..Self::new(Provider::Static, "static_responses")
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn default_max_context_length() -> usize {
    1000
}

fn default_cache_eligible() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn validate_primary_provider(config: &SubjectConfig) -> Result<(), ValidationError> {
    if config.primary.provider.is_static() {
        let mut err = ValidationError::new("static_primary");
        err.message = Some("primary endpoint must call a model provider".into());
        return Err(err);
    }
    Ok(())
}

/// Per-subject configuration: which models to call and how to prompt them.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[validate(schema(function = "validate_primary_provider"))]
pub struct SubjectConfig {
    pub subject: Subject,

    #[validate(nested)]
    pub primary: ModelEndpointConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub secondary: Option<ModelEndpointConfig>,

    #[serde(default)]
    pub system_prompt: String,

    /// User prompt with `{name}` placeholders filled from the context.
    #[serde(default)]
    pub prompt_template: String,

    #[serde(default = "default_max_context_length")]
    #[validate(range(min = 1, max = 100000))]
    pub max_context_length: usize,

    #[serde(default = "default_cache_eligible")]
    pub cache_eligible: bool,

    #[serde(default = "default_cache_ttl_secs")]
    #[validate(range(min = 1, max = 2_592_000))]
    pub cache_ttl_secs: u64,
}

impl SubjectConfig {
    pub fn new(subject: Subject, primary: ModelEndpointConfig) -> Self {
        Self {
            subject,
            primary,
            secondary: None,
            system_prompt: String::new(),
            prompt_template: String::new(),
            max_context_length: default_max_context_length(),
            cache_eligible: default_cache_eligible(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// The secondary endpoint, if one is configured that actually calls a
    /// model.
    pub fn callable_secondary(&self) -> Option<&ModelEndpointConfig> {
        self.secondary.as_ref().filter(|s| !s.provider.is_static())
    }
}

/// Text served when no authored candidate exists.
pub const GENERIC_RESPONSE_TEXT: &str = "🎂 Sweet! Let's keep the productivity celebration going! ✨";

fn default_weight() -> u32 {
    1
}

/// Pre-authored canned response. Never mutated once added to a library.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaticResponse {
    pub subject: Subject,
    pub context_tag: String,
    pub mood: String,
    pub text: String,
    pub animation: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl StaticResponse {
    /// Weights below one are raised to one.
    pub fn new(
        subject: Subject,
        context_tag: impl Into<String>,
        mood: impl Into<String>,
        text: impl Into<String>,
        animation: impl Into<String>,
        weight: u32,
    ) -> Self {
        Self {
            subject,
            context_tag: context_tag.into(),
            mood: mood.into(),
            text: text.into(),
            animation: animation.into(),
            weight: weight.max(1),
            created_at: Utc::now(),
        }
    }

    /// Synthesized response for subjects without authored candidates.
    pub fn generic(subject: Subject, context_tag: impl Into<String>) -> Self {
        Self::new(
            subject,
            context_tag,
            "cheerful",
            GENERIC_RESPONSE_TEXT,
            "bounce",
            1,
        )
    }
}

/// Primitive context value. Nested structures are rejected at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl ContextValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContextValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for ContextValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for ContextValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

const CONTEXT_TAG_KEYS: [&str; 2] = ["context_type", "context_tag"];
const MOOD_KEY: &str = "mood";
const SENSITIVE_KEY_MARKERS: [&str; 6] =
    ["password", "email", "token", "secret", "api_key", "authorization"];

/// Caller-supplied context. Keys are kept sorted so serialization is
/// canonical.
///
/// Documented optional keys:
/// - `context_type` (alias `context_tag`): selects the canned-response
///   context tag, default `general`
/// - `mood`: preferred mood for canned responses, default `cheerful`
///
/// Any other key is available to prompt templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseContext(BTreeMap<String, ContextValue>);

impl ResponseContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ContextValue)> {
        self.0.iter()
    }

    /// Builds a context from a JSON object. Non-primitive values are dropped;
    /// anything other than an object yields `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut ctx = Self::new();
        for (key, value) in object {
            let converted = match value {
                serde_json::Value::Bool(b) => ContextValue::Bool(*b),
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(i) => ContextValue::Integer(i),
                    None => ContextValue::Number(n.as_f64().unwrap_or_default()),
                },
                serde_json::Value::String(s) => ContextValue::Text(s.clone()),
                serde_json::Value::Null
                | serde_json::Value::Array(_)
                | serde_json::Value::Object(_) => {
                    tracing::debug!(key = %key, "Dropping non-primitive context value");
                    continue;
                }
            };
            ctx.0.insert(key.clone(), converted);
        }
        Some(ctx)
    }

    pub fn explicit_context_tag(&self) -> Option<&str> {
        CONTEXT_TAG_KEYS
            .iter()
            .find_map(|k| self.0.get(*k).and_then(ContextValue::as_str))
    }

    pub fn context_tag(&self) -> &str {
        self.explicit_context_tag().unwrap_or("general")
    }

    pub fn explicit_mood(&self) -> Option<&str> {
        self.0.get(MOOD_KEY).and_then(ContextValue::as_str)
    }

    pub fn mood(&self) -> &str {
        self.explicit_mood().unwrap_or("cheerful")
    }

    /// Copy without keys that look like credentials or personal data.
    pub fn redacted(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(key, _)| {
                    let lower = key.to_lowercase();
                    !SENSITIVE_KEY_MARKERS.iter().any(|m| lower.contains(m))
                })
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Stable serialization used for cache keys.
    pub fn canonical_string(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.0).unwrap_or(serde_json::Value::Null)
    }
}

/// Raw result of one successful model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedText {
    pub text: String,
    pub mood: String,
    pub animation: String,
    pub provider: Provider,
    pub model: String,
    pub tokens_used: Option<u32>,
}

/// Uniform orchestrator output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedResponse {
    pub text: String,
    pub mood: String,
    pub animation: String,
    pub provenance: Provenance,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub generated_at: DateTime<Utc>,
}

impl GeneratedResponse {
    pub fn from_model(generated: GeneratedText, provenance: Provenance) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("model".to_string(), generated.model.into());
        metadata.insert(
            "provider".to_string(),
            generated.provider.to_string().into(),
        );
        if let Some(tokens) = generated.tokens_used {
            metadata.insert("tokens_used".to_string(), tokens.into());
        }
        Self {
            text: generated.text,
            mood: generated.mood,
            animation: generated.animation,
            provenance,
            metadata,
            generated_at: Utc::now(),
        }
    }

    pub fn from_static(response: &StaticResponse, reason: &str, context_tag: &str) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("fallback_reason".to_string(), reason.into());
        metadata.insert("context_type".to_string(), context_tag.into());
        Self {
            text: response.text.clone(),
            mood: response.mood.clone(),
            animation: response.animation.clone(),
            provenance: Provenance::StaticFallback,
            metadata,
            generated_at: Utc::now(),
        }
    }

    /// Canned response for callers whose subject is not known at all.
    pub fn generic(reason: &str, context_tag: &str) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("fallback_reason".to_string(), reason.into());
        metadata.insert("context_type".to_string(), context_tag.into());
        Self {
            text: GENERIC_RESPONSE_TEXT.to_string(),
            mood: "cheerful".to_string(),
            animation: "bounce".to_string(),
            provenance: Provenance::StaticFallback,
            metadata,
            generated_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        self.metadata
            .get("fallback_reason")
            .and_then(serde_json::Value::as_str)
    }
}
