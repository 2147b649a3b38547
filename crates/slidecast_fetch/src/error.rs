use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid asset reference {reference:?}: {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("failed to download {url}: HTTP {status}")]
    FetchFailed { url: String, status: u16 },

    #[error("network error fetching {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, FetchError>;
