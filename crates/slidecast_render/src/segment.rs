use std::path::{Path, PathBuf};
use std::time::Instant;

use slidecast_core::caption::{self, escape_filter_path};
use slidecast_core::{RenderSettings, Segment, Workspace};
use tracing::{debug, info};

use crate::engine::{output_written, EngineJob, MediaEngine, Stage};
use crate::error::{RenderError, Result};

/// Distance between the bottom of the caption box and the frame edge.
const CAPTION_MARGIN_PX: u32 = 40;

/// drawtext overlay for an already escaped caption: white text on a
/// translucent black box, centred horizontally near the bottom of the frame.
pub fn drawtext_filter(escaped_caption: &str, settings: &RenderSettings) -> String {
    format!(
        "drawtext=fontfile='{font}':text='{escaped_caption}':expansion=none\
         :fontcolor=white:fontsize={size}:line_spacing=6\
         :box=1:boxcolor=0x00000099:boxborderw=5\
         :x=(w-text_w)/2:y=h-text_h-{CAPTION_MARGIN_PX}",
        font = escape_filter_path(&settings.font_path),
        size = settings.font_size,
    )
}

/// Scale/pad to the output frame, then overlay the caption if there is one.
pub fn video_filter(escaped_caption: &str, settings: &RenderSettings) -> String {
    let (w, h) = (settings.width, settings.height);
    let mut filter = format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1"
    );
    if !escaped_caption.is_empty() {
        filter.push(',');
        filter.push_str(&drawtext_filter(escaped_caption, settings));
    }
    filter
}

/// Still image to a fixed-length silent clip.
pub fn segment_job(
    index: usize,
    image: &Path,
    escaped_caption: &str,
    output: PathBuf,
    settings: &RenderSettings,
) -> EngineJob {
    let fps = settings.fps.to_string();
    let seconds = settings.segment_seconds.to_string();
    let job = EngineJob::new(Stage::Segment(index), output)
        .args(["-loop", "1", "-framerate", fps.as_str(), "-i"])
        .path(image)
        .arg("-vf")
        .arg(video_filter(escaped_caption, settings))
        .args(["-t", seconds.as_str(), "-r", fps.as_str()])
        .args(["-c:v", settings.video_codec.as_str()])
        .args(["-pix_fmt", settings.pixel_format.as_str()])
        .arg("-an");
    job
}

/// Render segment `index` from `image`, writing `video_<index>.mp4` in the
/// workspace. `caption` is raw text; it is normalised, truncated, wrapped and
/// escaped here.
pub async fn render_segment(
    engine: &dyn MediaEngine,
    index: usize,
    image: &Path,
    caption: &str,
    workspace: &Workspace,
    settings: &RenderSettings,
) -> Result<Segment> {
    let prepared = caption::prepare(caption, &settings.caption);
    let escaped = caption::escape_drawtext(&prepared);
    let output = workspace.segment_path(index);
    let job = segment_job(index, image, &escaped, output.clone(), settings);

    let started = Instant::now();
    engine
        .run(&job)
        .await
        .map_err(|e| RenderError::RenderFailed {
            index,
            diagnostic: e.to_string(),
        })?;
    if !output_written(&output).await {
        return Err(RenderError::RenderFailed {
            index,
            diagnostic: format!("engine wrote no output at {}", output.display()),
        });
    }

    debug!(
        index,
        caption_chars = prepared.chars().count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "segment rendered"
    );
    Ok(Segment {
        index,
        path: output,
        duration_seconds: settings.segment_seconds,
        fps: settings.fps,
        pixel_format: settings.pixel_format.clone(),
        caption: escaped,
    })
}

/// Render one segment per image, strictly in order. `captions[i]` belongs to
/// `images[i]`; a missing caption renders as no overlay. The first failure
/// stops the loop.
pub async fn render_segments(
    engine: &dyn MediaEngine,
    images: &[PathBuf],
    captions: &[String],
    workspace: &Workspace,
    settings: &RenderSettings,
) -> Result<Vec<Segment>> {
    if images.is_empty() {
        return Err(RenderError::NoSegments);
    }

    let started = Instant::now();
    let mut segments = Vec::with_capacity(images.len());
    for (index, image) in images.iter().enumerate() {
        let caption = captions.get(index).map(String::as_str).unwrap_or("");
        debug!(index, total = images.len(), "rendering segment");
        segments.push(render_segment(engine, index, image, caption, workspace, settings).await?);
    }

    info!(
        segments = segments.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "segments rendered"
    );
    Ok(segments)
}
