//! Undersync client errors

use thiserror::Error;

/// Errors that can occur when asking Undersync to push switch configuration
#[derive(Debug, Error)]
pub enum UndersyncError {
    /// HTTP request/response error, including timeouts
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Undersync answered with a non-success status
    #[error("Undersync returned {status}: {body}")]
    Api { status: u16, body: String },
}
