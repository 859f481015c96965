//! Shared test fixtures for the cake responder workspace.
//!
//! - [`unique_id`] for collision-free names across tests in one process
//! - [`MockModelServer`], a `wiremock` server speaking the OpenAI-compatible
//!   chat-completions shape, for exercising the HTTP model client and the
//!   wired responder end to end

mod fixtures;

pub use fixtures::*;
