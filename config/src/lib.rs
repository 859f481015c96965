//! # Configuration System
//!
//! Centralized configuration for the cake responder.
//!
//! This crate provides:
//! - Process configuration structures (service tuning, provider credentials,
//!   observability)
//! - Environment variable loading (12-factor app principles)
//! - Configuration file loading (TOML/YAML/JSON)
//! - The persisted per-subject document and its built-in defaults
//! - Subject configuration validation

pub mod config;
pub mod defaults;
pub mod file_loader;
pub mod loader;
pub mod validator;

pub use config::{
    Config, ObservabilityConfig, ProviderCredential, ProviderCredentials, ServiceConfig,
};
pub use file_loader::{
    ConfigFileError, LoadedSubjectDocument, SubjectDocument, load_from_file, load_from_toml,
    load_from_yaml, load_subject_document, save_subject_document,
};
pub use loader::load_from_env;
pub use validator::{validate, validate_static_response, validate_subject_config};
pub use ::validator::Validate;
