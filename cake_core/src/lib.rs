//! # Cake Responder Core
//!
//! Shared types and traits for the response-generation subsystem.
//!
//! This crate provides:
//! - Closed enums for subjects, providers and provenance tags
//! - Endpoint and per-subject configuration records (validated with `validator`)
//! - The typed context mapping supplied by callers
//! - The seams the orchestrator depends on: [`traits::ModelClient`] and
//!   [`traits::ReachabilityProbe`]

pub mod traits;
pub mod types;

pub use traits::{GenerationRequest, ModelClient, ProbeError, ReachabilityProbe};
pub use types::{
    ContextValue, GENERIC_RESPONSE_TEXT, GeneratedResponse, GeneratedText, ModelEndpointConfig,
    Provenance, Provider, ResponseContext, StaticResponse, Subject, SubjectConfig,
};
