use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

use crate::error::EngineFailure;
use crate::probe::{self, MediaProbe};

/// Lines of engine stderr kept in a failure diagnostic.
const STDERR_TAIL_LINES: usize = 12;

/// Which pipeline stage an engine invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Segment(usize),
    Concat,
    Mux,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Segment(i) => write!(f, "segment {i}"),
            Stage::Concat => f.write_str("concat"),
            Stage::Mux => f.write_str("mux"),
        }
    }
}

/// One engine invocation: input/filter/codec arguments plus the output file.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineJob {
    pub stage: Stage,
    pub args: Vec<String>,
    pub output_path: PathBuf,
}

impl EngineJob {
    pub fn new(stage: Stage, output_path: PathBuf) -> Self {
        Self {
            stage,
            args: Vec::new(),
            output_path,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    /// Full ffmpeg argument vector: overwrite/quiet flags, the job's
    /// arguments, then the output path.
    pub fn command_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-y", "-hide_banner", "-loglevel", "error"]
            .into_iter()
            .map(String::from)
            .collect();
        args.extend(self.args.iter().cloned());
        args.push(self.output_path.to_string_lossy().to_string());
        args
    }
}

/// The external tool that renders, joins and muxes media.
///
/// Implementations must be safe to call concurrently from many requests;
/// each job writes only its own `output_path`.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Run a job to completion. Returns once the output file is written.
    async fn run(&self, job: &EngineJob) -> Result<(), EngineFailure>;

    /// Inspect a media file.
    async fn probe(&self, path: &Path) -> Result<MediaProbe, EngineFailure>;
}

/// [`MediaEngine`] backed by the `ffmpeg` and `ffprobe` binaries. Every call
/// is bounded by `timeout`; on expiry the child process is killed.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    timeout: Duration,
}

impl FfmpegEngine {
    pub fn new(timeout: Duration) -> Self {
        Self::with_binaries("ffmpeg", "ffprobe", timeout)
    }

    pub fn with_binaries(
        ffmpeg: impl Into<PathBuf>,
        ffprobe: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// First line of `ffmpeg -version`.
    pub async fn version(&self) -> Result<String, EngineFailure> {
        let output = self.execute(&self.ffmpeg, &["-version".to_string()]).await?;
        check_status(&output)?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string())
    }

    async fn execute(&self, binary: &Path, args: &[String]) -> Result<Output, EngineFailure> {
        let mut command = Command::new(binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => Err(EngineFailure::TimedOut(self.timeout)),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(EngineFailure::NotFound(binary.to_path_buf()))
            }
            Ok(Err(source)) => Err(EngineFailure::Spawn {
                binary: binary.to_path_buf(),
                source,
            }),
            Ok(Ok(output)) => Ok(output),
        }
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn run(&self, job: &EngineJob) -> Result<(), EngineFailure> {
        tracing::debug!(stage = %job.stage, output = %job.output_path.display(), "running ffmpeg");
        let output = self.execute(&self.ffmpeg, &job.command_args()).await?;
        check_status(&output)
    }

    async fn probe(&self, path: &Path) -> Result<MediaProbe, EngineFailure> {
        let output = self.execute(&self.ffprobe, &probe::probe_args(path)).await?;
        check_status(&output)?;
        probe::parse_probe_output(&output.stdout)
    }
}

fn check_status(output: &Output) -> Result<(), EngineFailure> {
    if output.status.success() {
        Ok(())
    } else {
        Err(EngineFailure::Exited {
            status: output.status.to_string(),
            stderr: stderr_tail(&output.stderr, STDERR_TAIL_LINES),
        })
    }
}

/// Whether a job left a regular file at `path`.
pub(crate) async fn output_written(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Last `max_lines` non-empty lines of an engine's stderr.
pub fn stderr_tail(stderr: &[u8], max_lines: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return "no diagnostic output".to_string();
    }
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
