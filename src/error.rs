use thiserror::Error;

/// Errors raised by the stores and the TMDB client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The API answered with a non-success status
    #[error("TMDB returned status {status} for {path}")]
    Status { status: u16, path: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No TMDB API key configured")]
    MissingApiKey,
    #[error("Movie {0} not found")]
    NotFound(u32),
    /// A background task panicked or was aborted
    #[error("Background task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, Error>;
