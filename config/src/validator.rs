//! # Configuration Validation
//!
//! Validation for the process configuration and for subject configurations
//! using the `validator` crate.

use crate::config::Config;
use cake_core::{StaticResponse, SubjectConfig};
use errors::ConfigurationError;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate configuration structure.
pub fn validate(config: &Config) -> Result<(), ValidationErrors> {
    config.validate()
}

/// Validate a subject configuration before it is stored.
///
/// # M-CANONICAL-DOCS
///
/// ## Validation Rules
/// - `temperature`: within the provider's documented range (OpenAI and Local
///   `[0, 2]`, Anthropic `[0, 1]`)
/// - `max_tokens`: 1 or more
/// - `timeout_secs`: 1-300
/// - `retry_attempts`: 1-10
/// - `retry_delay_ms`: at most 60000
/// - `cache_ttl_secs`: 1 second to 30 days
/// - `model_name`: 1-200 characters
/// - `primary.provider`: must not be the static provider
///
/// The first failing field becomes a `ConfigurationError::Validation`.
pub fn validate_subject_config(config: &SubjectConfig) -> Result<(), ConfigurationError> {
    config
        .validate()
        .map_err(|errors| first_violation(&errors, ""))
}

/// Validate a canned response before it joins a library.
pub fn validate_static_response(response: &StaticResponse) -> Result<(), ConfigurationError> {
    if response.text.trim().is_empty() {
        return Err(ConfigurationError::validation("text", "must not be empty"));
    }
    if response.weight < 1 {
        return Err(ConfigurationError::validation("weight", "must be at least 1"));
    }
    if response.context_tag.trim().is_empty() {
        return Err(ConfigurationError::validation(
            "context_tag",
            "must not be empty",
        ));
    }
    Ok(())
}

fn first_violation(errors: &ValidationErrors, prefix: &str) -> ConfigurationError {
    for (field, kind) in errors.errors() {
        let path = match (prefix.is_empty(), field.as_ref()) {
            (true, "__all__") => "config".to_string(),
            (true, name) => name.to_string(),
            (false, "__all__") => prefix.to_string(),
            (false, name) => format!("{prefix}.{name}"),
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    let reason = err
                        .message
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| err.code.to_string());
                    return ConfigurationError::validation(path, reason);
                }
            }
            ValidationErrorsKind::Struct(nested) => return first_violation(nested, &path),
            ValidationErrorsKind::List(items) => {
                if let Some((idx, nested)) = items.iter().next() {
                    return first_violation(nested, &format!("{path}[{idx}]"));
                }
            }
        }
    }
    ConfigurationError::validation(
        if prefix.is_empty() { "config" } else { prefix },
        "invalid value",
    )
}
