use std::path::{Path, PathBuf};
use std::time::Instant;

use slidecast_core::{ConcatenatedVideo, Segment, Workspace};
use tracing::info;

use crate::engine::{output_written, EngineJob, MediaEngine, Stage};
use crate::error::{RenderError, Result};

/// Quote a path for a concat demuxer `file` directive. Inside single quotes
/// nothing is special except the quote itself, which is closed, escaped and
/// reopened.
pub fn escape_manifest_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

pub fn manifest_line(path: &Path) -> String {
    format!("file '{}'", escape_manifest_path(path))
}

/// Manifest text for `segments`, one `file` line per segment in the given
/// order.
///
/// Segments must arrive with `index == position`, every path absolute and
/// free of line breaks; anything else is a `ConcatFailed`.
pub fn build_manifest(segments: &[Segment]) -> Result<String> {
    let mut manifest = String::new();
    for (position, segment) in segments.iter().enumerate() {
        if segment.index != position {
            return Err(RenderError::ConcatFailed(format!(
                "segment {} found at position {position}",
                segment.index
            )));
        }
        if !segment.path.is_absolute() {
            return Err(RenderError::ConcatFailed(format!(
                "segment path {} is not absolute",
                segment.path.display()
            )));
        }
        let raw = segment.path.to_string_lossy();
        if raw.contains('\n') || raw.contains('\r') {
            return Err(RenderError::ConcatFailed(format!(
                "segment path {raw:?} contains a line break"
            )));
        }
        manifest.push_str(&manifest_line(&segment.path));
        manifest.push('\n');
    }
    Ok(manifest)
}

/// Join via the concat demuxer with stream copy.
pub fn concat_job(manifest: &Path, output: PathBuf) -> EngineJob {
    EngineJob::new(Stage::Concat, output)
        .args(["-f", "concat", "-safe", "0", "-i"])
        .path(manifest)
        .args(["-c", "copy"])
}

/// Write `filelist.txt` and join the segments into `concat.mp4`.
pub async fn concatenate(
    engine: &dyn MediaEngine,
    segments: &[Segment],
    workspace: &Workspace,
) -> Result<ConcatenatedVideo> {
    if segments.is_empty() {
        return Err(RenderError::NoSegments);
    }

    let manifest = build_manifest(segments)?;
    let manifest_path = workspace.manifest_path();
    tokio::fs::write(&manifest_path, manifest)
        .await
        .map_err(|e| {
            RenderError::ConcatFailed(format!(
                "cannot write manifest {}: {e}",
                manifest_path.display()
            ))
        })?;

    let output = workspace.concat_path();
    let job = concat_job(&manifest_path, output.clone());

    let started = Instant::now();
    engine
        .run(&job)
        .await
        .map_err(|e| RenderError::ConcatFailed(e.to_string()))?;
    if !output_written(&output).await {
        return Err(RenderError::ConcatFailed(format!(
            "engine wrote no output at {}",
            output.display()
        )));
    }

    let duration_seconds: f64 = segments
        .iter()
        .map(|s| f64::from(s.duration_seconds))
        .sum();
    info!(
        segments = segments.len(),
        duration_seconds,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "segments concatenated"
    );
    Ok(ConcatenatedVideo {
        path: output,
        segment_count: segments.len(),
        duration_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineFailure;
    use crate::probe::MediaProbe;
    use async_trait::async_trait;
    use tempfile::TempDir;

    fn segment(index: usize, path: &str) -> Segment {
        Segment {
            index,
            path: PathBuf::from(path),
            duration_seconds: 5,
            fps: 30,
            pixel_format: "yuv420p".into(),
            caption: String::new(),
        }
    }

    struct ScriptedEngine {
        fail: bool,
    }

    #[async_trait]
    impl MediaEngine for ScriptedEngine {
        async fn run(&self, job: &EngineJob) -> std::result::Result<(), EngineFailure> {
            if self.fail {
                return Err(EngineFailure::TimedOut(std::time::Duration::from_secs(120)));
            }
            std::fs::write(&job.output_path, b"joined").unwrap();
            Ok(())
        }

        async fn probe(&self, _path: &Path) -> std::result::Result<MediaProbe, EngineFailure> {
            Ok(MediaProbe::default())
        }
    }

    #[test]
    fn manifest_lists_segments_in_order() {
        let segments = vec![
            segment(0, "/tmp/ws/video_0.mp4"),
            segment(1, "/tmp/ws/video_1.mp4"),
        ];
        assert_eq!(
            build_manifest(&segments).unwrap(),
            "file '/tmp/ws/video_0.mp4'\nfile '/tmp/ws/video_1.mp4'\n"
        );
    }

    #[test]
    fn manifest_escapes_single_quotes() {
        assert_eq!(
            manifest_line(Path::new("/tmp/it's/video_0.mp4")),
            r"file '/tmp/it'\''s/video_0.mp4'"
        );
    }

    #[test]
    fn manifest_rejects_reordered_segments() {
        let segments = vec![
            segment(1, "/tmp/ws/video_1.mp4"),
            segment(0, "/tmp/ws/video_0.mp4"),
        ];
        assert!(matches!(
            build_manifest(&segments),
            Err(RenderError::ConcatFailed(_))
        ));
    }

    #[test]
    fn manifest_rejects_relative_and_multiline_paths() {
        assert!(build_manifest(&[segment(0, "video_0.mp4")]).is_err());
        assert!(build_manifest(&[segment(0, "/tmp/a\nfile '/etc/passwd'")]).is_err());
    }

    #[test]
    fn job_uses_stream_copy() {
        let job = concat_job(Path::new("/ws/filelist.txt"), PathBuf::from("/ws/concat.mp4"));
        assert_eq!(
            job.command_args()[4..].join(" "),
            "-f concat -safe 0 -i /ws/filelist.txt -c copy /ws/concat.mp4"
        );
        assert_eq!(job.stage, Stage::Concat);
    }

    #[tokio::test]
    async fn concatenate_writes_manifest_and_sums_duration() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::create(dir.path()).unwrap();
        let segments: Vec<Segment> = (0..3)
            .map(|i| segment(i, &ws.segment_path(i).to_string_lossy()))
            .collect();

        let video = concatenate(&ScriptedEngine { fail: false }, &segments, &ws)
            .await
            .unwrap();

        assert_eq!(video.path, ws.concat_path());
        assert_eq!(video.segment_count, 3);
        assert!((video.duration_seconds - 15.0).abs() < f64::EPSILON);

        let manifest = std::fs::read_to_string(ws.manifest_path()).unwrap();
        let lines: Vec<&str> = manifest.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].ends_with("video_2.mp4'"));
    }

    #[tokio::test]
    async fn engine_timeout_is_concat_failed() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::create(dir.path()).unwrap();
        let segments = vec![segment(0, &ws.segment_path(0).to_string_lossy())];

        let err = concatenate(&ScriptedEngine { fail: true }, &segments, &ws)
            .await
            .unwrap_err();
        match err {
            RenderError::ConcatFailed(msg) => assert!(msg.contains("timed out")),
            other => panic!("expected ConcatFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unwritable_manifest_is_concat_failed() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::create(dir.path()).unwrap();
        std::fs::create_dir(ws.manifest_path()).unwrap();
        let segments = vec![segment(0, &ws.segment_path(0).to_string_lossy())];

        let err = concatenate(&ScriptedEngine { fail: false }, &segments, &ws)
            .await
            .unwrap_err();
        match err {
            RenderError::ConcatFailed(msg) => assert!(msg.contains("filelist.txt")),
            other => panic!("expected ConcatFailed, got {other:?}"),
        }
    }
}
