use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single render-engine invocation.
#[derive(Debug, Error)]
pub enum EngineFailure {
    #[error("{0} not found")]
    NotFound(PathBuf),

    #[error("failed to execute {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("exited with {status}: {stderr}")]
    Exited { status: String, stderr: String },

    #[error("timed out after {}s", .0.as_secs_f64())]
    TimedOut(Duration),

    #[error("unreadable probe output: {0}")]
    Probe(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render of segment {index} failed: {diagnostic}")]
    RenderFailed { index: usize, diagnostic: String },

    #[error("concatenation failed: {0}")]
    ConcatFailed(String),

    #[error("audio mux failed: {0}")]
    MuxFailed(String),

    #[error("failed to read final artifact {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no segments to render")]
    NoSegments,
}

pub type Result<T> = std::result::Result<T, RenderError>;
