//! Builds the responder for a single CLI invocation.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use config::Config;
use responder::{Responder, ResponderBuilder};

use crate::ux_error;

/// Reads the process configuration from `path` when given, otherwise from
/// the environment.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => config::load_from_file(path).map_err(|e| {
            ux_error::config_error(&e.to_string()).display();
            anyhow!("Failed to load {}: {e}", path.display())
        })?,
        None => config::load_from_env()
            .map_err(|e| anyhow!("Failed to load configuration from environment: {e}"))?,
    };

    config::validate(&config).context("Invalid configuration")?;
    Ok(config)
}

pub async fn build(config: Config) -> Result<Responder> {
    let path = config.service.subject_config_path.clone();
    tracing::debug!(subject_document = %path, "Building responder");
    ResponderBuilder::new(config)
        .build()
        .await
        .with_context(|| format!("Failed to start responder with subject document {path}"))
}
