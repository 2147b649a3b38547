use serde::Deserialize;
use std::path::Path;

use crate::error::EngineFailure;

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// What the pipeline needs to know about a rendered or downloaded file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaProbe {
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
}

/// ffprobe arguments that print streams and container format as JSON.
pub fn probe_args(path: &Path) -> Vec<String> {
    vec![
        "-v".into(),
        "quiet".into(),
        "-print_format".into(),
        "json".into(),
        "-show_format".into(),
        "-show_streams".into(),
        path.to_string_lossy().to_string(),
    ]
}

pub fn parse_probe_output(stdout: &[u8]) -> Result<MediaProbe, EngineFailure> {
    let probe: FfprobeOutput =
        serde_json::from_slice(stdout).map_err(|e| EngineFailure::Probe(e.to_string()))?;

    let video_stream = probe.streams.iter().find(|s| s.codec_type == "video");
    let audio_stream = probe.streams.iter().find(|s| s.codec_type == "audio");

    // Container duration first; raw streams (e.g. bare mp3) may only carry
    // it per stream.
    let duration_seconds = probe
        .format
        .duration
        .as_deref()
        .and_then(parse_seconds)
        .or_else(|| {
            probe
                .streams
                .iter()
                .filter_map(|s| s.duration.as_deref().and_then(parse_seconds))
                .reduce(f64::max)
        })
        .unwrap_or(0.0);

    Ok(MediaProbe {
        duration_seconds,
        width: video_stream.and_then(|s| s.width).unwrap_or(0),
        height: video_stream.and_then(|s| s.height).unwrap_or(0),
        video_codec: video_stream.map(|s| s.codec_name.clone().unwrap_or_default()),
        audio_codec: audio_stream.map(|s| s.codec_name.clone().unwrap_or_default()),
    })
}

fn parse_seconds(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
