//! Error types for the proctoring engine

use thiserror::Error;

use crate::schema::ValidationError;

/// Errors returned by engine, configuration and record parsing operations
#[derive(Debug, Error)]
pub enum ProctorError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("A proctoring session is already active")]
    SessionAlreadyActive,

    #[error("No active proctoring session")]
    NoActiveSession,

    #[error("Failed to parse frame record: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid frame record: {0}")]
    Validation(#[from] ValidationError),
}

/// Failure reported by the perception collaborator for a single tick.
///
/// A failed tick yields no signal; it never affects the active session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Perception failed: {reason}")]
pub struct PerceptionError {
    pub reason: String,
}

impl PerceptionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
