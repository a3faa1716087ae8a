//! Errors at the persistence boundary
//!
//! Editing and evaluation never fail; only loading and saving do.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("malformed pattern data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid pattern record: {0}")]
    InvalidRecord(String),
}

pub type Result<T> = std::result::Result<T, PatternError>;
