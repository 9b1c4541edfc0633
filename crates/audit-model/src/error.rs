//! Error types for the audit trail.

use thiserror::Error;

/// Errors surfaced by ingestion and storage.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl AuditError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput(message.into())
    }

    pub fn unavailable(error: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable(error.to_string())
    }
}

/// Convenience result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;
