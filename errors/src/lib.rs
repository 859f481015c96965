//! # Cake Responder Errors
//!
//! Error taxonomy for the response-generation subsystem.
//!
//! - Uses `thiserror` for structured error definitions
//! - Named fields in every message so log lines stay self-describing
//! - Model failures and configuration failures are separate enums because
//!   they travel different paths: model errors are absorbed by the
//!   orchestrator, configuration errors surface to operators

use thiserror::Error;

/// Failure of a single generation call against one model endpoint.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Model call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Transport failure: {reason}")]
    Transport { reason: String },

    #[error("Malformed model response: {reason}")]
    MalformedResponse { reason: String },
}

impl ModelError {
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }

    /// Timeouts and transport failures may succeed on a later attempt; a
    /// structurally bad completion is not retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport { .. })
    }

    /// Short tag used in response metadata and metric labels.
    pub fn reason_tag(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Transport { .. } => "transport",
            Self::MalformedResponse { .. } => "malformed-response",
        }
    }
}

/// Errors reported to administrative callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Unknown subject: {subject}")]
    UnknownSubject { subject: String },

    #[error("Unknown provider: {provider}")]
    UnknownProvider { provider: String },

    #[error("Failed to persist configuration: {reason}")]
    Persistence { reason: String },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },
}

impl ConfigurationError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
pub type ConfigResult<T> = Result<T, ConfigurationError>;
