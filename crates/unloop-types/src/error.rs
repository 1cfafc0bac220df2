use thiserror::Error;

/// Errors from session store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("session not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from flow state machine transitions.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("missing precondition: {0}")]
    MissingPrecondition(&'static str),
}
