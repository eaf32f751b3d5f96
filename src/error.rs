// Error types for the library half of the crate (`api`, `converter`).
// The demos and the binary wrap these in `anyhow::Error`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while talking to NAKALA or reading local input files.
#[derive(Debug, Error)]
pub enum NakalaError {
    /// Transport-level failure (DNS, TLS, connection reset, ...).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Error reading a local file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API key cannot be sent as a header value.
    #[error("Invalid API key: {0}")]
    InvalidApiKey(#[from] reqwest::header::InvalidHeaderValue),

    /// The service answered with a status the caller cannot work with.
    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
}

pub type Result<T> = std::result::Result<T, NakalaError>;
