use std::path::{Path, PathBuf};
use std::time::Instant;

use slidecast_core::{ConcatenatedVideo, FinalArtifact, RenderSettings, Workspace};
use tracing::info;

use crate::engine::{output_written, EngineJob, MediaEngine, Stage};
use crate::error::{RenderError, Result};

/// Copy the video stream, encode the narration, stop at the shorter input.
pub fn mux_job(video: &Path, audio: &Path, output: PathBuf, settings: &RenderSettings) -> EngineJob {
    EngineJob::new(Stage::Mux, output)
        .arg("-i")
        .path(video)
        .arg("-i")
        .path(audio)
        .args(["-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy"])
        .args(["-c:a", settings.audio_codec.as_str()])
        .args(["-b:a", settings.audio_bitrate.as_str()])
        .args(["-shortest", "-movflags", "+faststart"])
}

/// Mux the narration over the concatenated video into `output.mp4`.
pub async fn mux_audio(
    engine: &dyn MediaEngine,
    video: &ConcatenatedVideo,
    audio: &Path,
    workspace: &Workspace,
    settings: &RenderSettings,
) -> Result<FinalArtifact> {
    let output = workspace.output_path();
    let job = mux_job(&video.path, audio, output.clone(), settings);

    let started = Instant::now();
    engine
        .run(&job)
        .await
        .map_err(|e| RenderError::MuxFailed(e.to_string()))?;
    if !output_written(&output).await {
        return Err(RenderError::MuxFailed(format!(
            "engine wrote no output at {}",
            output.display()
        )));
    }

    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "audio muxed"
    );
    Ok(FinalArtifact {
        path: output,
        video_duration_seconds: video.duration_seconds,
    })
}
