//! Error types for the component boundaries

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Network error connecting to inference server: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Request to inference server timed out")]
    Timeout,
    #[error("Inference server error (status {status}): {body}")]
    Status { status: u16, body: String },
    #[error("Error processing token stream: {0}")]
    Stream(#[source] reqwest::Error),
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl GenerationError {
    /// Classify a reqwest failure raised while sending the request
    pub fn from_send(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerationError::Timeout
        } else {
            GenerationError::Transport(err)
        }
    }
}

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Malformed document at position {index}: {reason}")]
    MalformedDocument { index: usize, reason: String },
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("WalkDir error: {0}")]
    WalkDir(#[from] walkdir::Error),
    #[error("Documents root does not exist: {0}")]
    MissingRoot(PathBuf),
}
