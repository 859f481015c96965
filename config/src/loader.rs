//! # Environment Variable Loader
//!
//! Loads configuration from environment variables following 12-factor app
//! principles.
//!
//! # Naming Convention
//! - `CAKE_*`: Service and observability settings
//! - `OPENAI_*`, `ANTHROPIC_*`, `LOCAL_MODEL_*`: Provider credentials

use crate::config::{
    Config, ObservabilityConfig, ProviderCredential, ProviderCredentials, ServiceConfig,
};
use std::env;

/// Load configuration from environment variables.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Builds the process configuration from the environment. Missing or
/// unparsable values fall back to their defaults.
///
/// ## Usage
/// ```rust,no_run
/// use config::load_from_env;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = load_from_env()?;
///     println!("Subject document: {}", config.service.subject_config_path);
///     Ok(())
/// }
/// ```
///
/// ## Environment Variables
/// ### Service Settings (`CAKE_*`)
/// - `CAKE_CONFIG_PATH`: Persisted subject document (default:
///   "cake_ai_config.json")
/// - `CAKE_CACHE_MAX_ENTRIES`: Cache capacity (default: 10000)
/// - `CAKE_CONNECTIVITY_COOLDOWN_SECS`: Reachability cool-down (default: 300)
/// - `CAKE_RNG_SEED`: Seed for canned-response selection (optional)
/// - `CAKE_LOG_LEVEL`: Logging level (trace/debug/info/warn/error, default:
///   "info")
/// - `CAKE_METRICS_ENABLED`: Enable metrics (true/false, default: true)
///
/// ### Provider Settings
/// - `OPENAI_API_KEY`, `OPENAI_API_BASE`
/// - `ANTHROPIC_API_KEY`, `ANTHROPIC_API_BASE`
/// - `LOCAL_MODEL_BASE`, `LOCAL_MODEL_API_KEY`
pub fn load_from_env() -> Result<Config, Box<dyn std::error::Error>> {
    Ok(Config {
        service: load_service_from_env()?,
        providers: load_providers_from_env()?,
        observability: load_observability_from_env()?,
    })
}

fn load_service_from_env() -> Result<ServiceConfig, Box<dyn std::error::Error>> {
    let defaults = ServiceConfig::default();
    Ok(ServiceConfig {
        cache_max_entries: parse_env("CAKE_CACHE_MAX_ENTRIES")
            .unwrap_or(defaults.cache_max_entries),
        connectivity_cooldown_secs: parse_env("CAKE_CONNECTIVITY_COOLDOWN_SECS")
            .unwrap_or(defaults.connectivity_cooldown_secs),
        subject_config_path: env::var("CAKE_CONFIG_PATH")
            .unwrap_or(defaults.subject_config_path),
        rng_seed: parse_env("CAKE_RNG_SEED").ok(),
    })
}

fn load_providers_from_env() -> Result<ProviderCredentials, Box<dyn std::error::Error>> {
    Ok(ProviderCredentials {
        openai: ProviderCredential {
            api_key: non_empty_env("OPENAI_API_KEY"),
            api_base: non_empty_env("OPENAI_API_BASE"),
        },
        anthropic: ProviderCredential {
            api_key: non_empty_env("ANTHROPIC_API_KEY"),
            api_base: non_empty_env("ANTHROPIC_API_BASE"),
        },
        local: ProviderCredential {
            api_key: non_empty_env("LOCAL_MODEL_API_KEY"),
            api_base: non_empty_env("LOCAL_MODEL_BASE"),
        },
    })
}

fn load_observability_from_env() -> Result<ObservabilityConfig, Box<dyn std::error::Error>> {
    let defaults = ObservabilityConfig::default();
    Ok(ObservabilityConfig {
        logging_level: env::var("CAKE_LOG_LEVEL").unwrap_or(defaults.logging_level),
        metrics_enabled: parse_env("CAKE_METRICS_ENABLED").unwrap_or(defaults.metrics_enabled),
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str) -> Result<T, Box<dyn std::error::Error>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(s) => s
            .trim()
            .parse::<T>()
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>),
        Err(e) => Err(Box::new(e) as Box<dyn std::error::Error>),
    }
}
