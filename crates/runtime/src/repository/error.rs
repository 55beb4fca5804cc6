//! Error types raised by repository implementations.

use thiserror::Error;

/// Errors surfaced by repository implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("map not found: {0}")]
    MapNotFound(String),

    #[error("content error: {0}")]
    Content(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
