use errors::{ConfigurationError, ModelError};
use thiserror::Error;

/// Failures while wiring the responder at startup. Once built, generation
/// never fails and administrative calls report [`ConfigurationError`].
#[derive(Error, Debug)]
pub enum ResponderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigurationError),

    #[error("Model client error: {0}")]
    ModelClient(#[from] ModelError),

    #[error("Prompt template engine error: {0}")]
    Prompt(#[from] regex::Error),
}

pub type ResponderResult<T> = Result<T, ResponderError>;
