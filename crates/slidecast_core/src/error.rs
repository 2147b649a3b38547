use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to create workspace {path}: {source}")]
    WorkspaceCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid render settings: {0}")]
    InvalidSettings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
