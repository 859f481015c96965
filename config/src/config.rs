//! # Configuration Structures
//!
//! Process-level configuration for the cake responder.
//!
//! All configuration structures:
//! - Use `serde` for serialization/deserialization
//! - Use `validator` for input validation
//! - Default every field so partial files and environments load cleanly

use cake_core::Provider;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Main configuration structure for the cake responder.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Aggregates service tuning, provider credentials and observability
/// settings. Per-subject model configuration lives in the persisted subject
/// document, not here.
///
/// ## Usage
/// ```rust,no_run
/// use config::Config;
///
/// let config = Config::default();
/// println!("Cache capacity: {}", config.service.cache_max_entries);
/// ```
///
/// ## Fields
/// - `service`: Cache capacity, connectivity cool-down, document path, RNG
///   seed
/// - `providers`: Credentials and base URLs for the remote model providers
/// - `observability`: Logging level and metrics toggle
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    #[validate(nested)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub providers: ProviderCredentials,

    #[serde(default)]
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

/// Service tuning.
///
/// # M-CANONICAL-DOCS
///
/// ## Fields
/// - `cache_max_entries`: Upper bound on cached responses (default: 10000)
/// - `connectivity_cooldown_secs`: How long a reachability result is trusted
///   (default: 300)
/// - `subject_config_path`: Persisted subject document (default:
///   "cake_ai_config.json")
/// - `rng_seed`: Optional seed for canned-response selection
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ServiceConfig {
    #[serde(default = "default_cache_max_entries")]
    #[validate(range(min = 1, max = 1_000_000))]
    pub cache_max_entries: usize,

    #[serde(default = "default_connectivity_cooldown_secs")]
    #[validate(range(min = 1, max = 86400))]
    pub connectivity_cooldown_secs: u64,

    #[serde(default = "default_subject_config_path")]
    #[validate(length(min = 1))]
    pub subject_config_path: String,

    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_cache_max_entries() -> usize {
    10_000
}

fn default_connectivity_cooldown_secs() -> u64 {
    300
}

fn default_subject_config_path() -> String {
    "cake_ai_config.json".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_max_entries: default_cache_max_entries(),
            connectivity_cooldown_secs: default_connectivity_cooldown_secs(),
            subject_config_path: default_subject_config_path(),
            rng_seed: None,
        }
    }
}

/// Credentials and base URL for one provider.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProviderCredential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

impl ProviderCredential {
    pub fn has_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn has_base(&self) -> bool {
        self.api_base.as_deref().is_some_and(|b| !b.trim().is_empty())
    }
}

/// Credentials for every remote provider, resolved at call time.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProviderCredentials {
    #[serde(default)]
    pub openai: ProviderCredential,

    #[serde(default)]
    pub anthropic: ProviderCredential,

    #[serde(default)]
    pub local: ProviderCredential,
}

impl ProviderCredentials {
    /// `None` for the static provider, which has no credentials.
    pub fn for_provider(&self, provider: Provider) -> Option<&ProviderCredential> {
        match provider {
            Provider::OpenAi => Some(&self.openai),
            Provider::Anthropic => Some(&self.anthropic),
            Provider::Local => Some(&self.local),
            Provider::Static => None,
        }
    }

    /// Base URL for the provider: explicit credential first, then the
    /// provider default.
    pub fn base_url(&self, provider: Provider) -> Option<String> {
        self.for_provider(provider)
            .and_then(|c| c.api_base.clone())
            .filter(|b| !b.trim().is_empty())
            .or_else(|| provider.default_base_url().map(str::to_string))
    }
}

/// Observability configuration.
///
/// # M-CANONICAL-DOCS
///
/// ## Fields
/// - `logging_level`: Log level (default: "info")
/// - `metrics_enabled`: Emit `metrics` counters and histograms (default: true)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ObservabilityConfig {
    #[serde(default = "default_observability_logging_level")]
    #[validate(custom(function = "validate_logging_level"))]
    pub logging_level: String,

    #[serde(default = "default_observability_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_observability_logging_level() -> String {
    "info".to_string()
}

fn default_observability_metrics_enabled() -> bool {
    true
}

fn validate_logging_level(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(validator::ValidationError::new("Invalid logging level")),
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            logging_level: default_observability_logging_level(),
            metrics_enabled: default_observability_metrics_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.service.cache_max_entries, 10_000);
        assert_eq!(config.service.connectivity_cooldown_secs, 300);
        assert_eq!(config.service.subject_config_path, "cake_ai_config.json");
        assert_eq!(config.observability.logging_level, "info");
    }

    #[test]
    fn test_invalid_logging_level() {
        let mut config = Config::default();
        config.observability.logging_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cache_capacity_bounds() {
        let mut config = Config::default();
        config.service.cache_max_entries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_url_resolution() {
        let mut credentials = ProviderCredentials::default();
        assert_eq!(
            credentials.base_url(Provider::OpenAi).as_deref(),
            Some("https://api.openai.com/v1")
        );
        credentials.local.api_base = Some("http://gpu-box:8000/v1".to_string());
        assert_eq!(
            credentials.base_url(Provider::Local).as_deref(),
            Some("http://gpu-box:8000/v1")
        );
        assert!(credentials.base_url(Provider::Static).is_none());
    }

    #[test]
    fn test_credential_presence_ignores_blank() {
        let credential = ProviderCredential {
            api_key: Some("  ".to_string()),
            api_base: None,
        };
        assert!(!credential.has_key());
        assert!(!credential.has_base());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"service": {"rng_seed": 7}}"#).unwrap();
        assert_eq!(config.service.rng_seed, Some(7));
        assert_eq!(config.service.cache_max_entries, 10_000);
    }
}
