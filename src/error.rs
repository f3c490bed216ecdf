//! Error types for the grant matrix

use thiserror::Error;

/// Result type alias for grant matrix operations
pub type Result<T> = std::result::Result<T, MatrixError>;

/// Main error type for the grant matrix
#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("A save is already in progress")]
    SaveInFlight,
}

impl MatrixError {
    /// Check if the failed operation can be re-issued as is
    pub fn is_retryable(&self) -> bool {
        match self {
            MatrixError::Http(_) | MatrixError::SaveInFlight => true,
            MatrixError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Short message suitable for a transient notification
    pub fn user_message(&self) -> String {
        match self {
            MatrixError::Http(e) if e.is_timeout() => "The server did not respond in time".into(),
            MatrixError::Http(_) => "Could not reach the server".into(),
            MatrixError::Api { status, .. } if *status >= 500 => {
                "The server failed to process the request".into()
            }
            other => other.to_string(),
        }
    }
}
