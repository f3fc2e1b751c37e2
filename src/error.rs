//! Error taxonomy for the consolidation core.
//!
//! Store-level failures (`FragmentNotFound`, `DocumentNotFound`,
//! `DuplicateTitle`) are converted to structured failure JSON at the tool
//! boundary and never cross it. Only [`InsightError::FragmentNotFound`]
//! raised during context building and [`InsightError::Transport`] from the
//! model call propagate out of a batch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("fragment not found: {0}")]
    FragmentNotFound(i64),

    #[error("document not found: {0}")]
    DocumentNotFound(i64),

    #[error("document title already exists: {0}")]
    DuplicateTitle(String),

    #[error("invalid arguments for tool {tool}: {message}")]
    InvalidToolArguments { tool: String, message: String },

    #[error("model transport error: {0}")]
    Transport(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Db(#[from] rusqlite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, InsightError>;
