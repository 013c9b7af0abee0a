//! Audit persistence errors.
//!
//! These never leave the audit logger: the worker logs and drops them.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audit event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Audit store unavailable: {0}")]
    Unavailable(String),

    #[error("Audit write timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, AuditError>;
