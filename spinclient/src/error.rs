//! Error types for the spin source client

/// Result type alias for spin client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when fetching spin data
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed (connection error, timeout, non-HTTP failure)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status
    #[error("API returned error status: {0}")]
    Api(reqwest::StatusCode),

    /// JSON parsing failed (malformed payload, never partially applied)
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The spins feed returned an empty item list
    #[error("Spin feed returned no items")]
    EmptyFeed,
}

impl Error {
    /// Whether this error was a request timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}
