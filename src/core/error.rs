use thiserror::Error;
use crate::services::{QueryError, SinkError};

/// Errors raised while scoring a ticket group
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("Invalid input: cannot score an empty ticket group")]
    EmptyGroup,

    #[error("Invalid input: ticket {ticket_id} has no numeric attribute '{attribute}'")]
    MissingAttribute { ticket_id: String, attribute: String },
}

/// Errors that abort a match function run
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Pool query failed: {0}")]
    QueryFailed(#[from] QueryError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Scoring failed: {0}")]
    Scoring(#[from] ScoreError),

    #[error("Failed to encode proposal extension: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Failed to send proposal: {0}")]
    SendFailed(#[from] SinkError),

    #[error("Run cancelled")]
    Cancelled,
}
