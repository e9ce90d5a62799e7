use std::io;
use thiserror::Error;

/// Every way a single probe can fail. The dashboard does not tell these
/// apart: any of them renders as offline.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Timeout")]
    Timeout,
}

#[derive(Error, Debug)]
pub enum NetpulseError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to write summary: {0}")]
    Summary(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, NetpulseError>;
