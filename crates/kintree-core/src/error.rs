//! Error types for record handling.

use std::io;
use thiserror::Error;

/// Errors raised while reading or interpreting family records.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] io::Error),

    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown relationship type: {0:?}")]
    UnknownRelationship(String),

    #[error("unknown gender: {0:?}")]
    UnknownGender(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
