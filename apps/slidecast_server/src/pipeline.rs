use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use slidecast_core::{ExportRequest, FinalArtifact, RenderSettings, Workspace};
use slidecast_fetch::{AssetFetcher, FetchSettings, ResolvedAssets};
use slidecast_render::{
    concatenate, encode_artifact, mux_audio, render_segments, EncodedVideo, MediaEngine,
};
use tracing::{debug, error, info, info_span, warn, Instrument, Span};
use url::Url;
use uuid::Uuid;

use crate::error::ExportError;

/// Allowed gap between the probed and the expected output duration.
const DURATION_TOLERANCE_SECS: f64 = 0.5;

/// Per-process settings of the export pipeline.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Parent of every request workspace.
    pub temp_root: PathBuf,
    /// Base for relative asset references. `None` rejects them.
    pub base_url: Option<Url>,
    pub render: RenderSettings,
}

/// Runs the export pipeline: resolve, fetch, render, concat, mux, encode.
///
/// One `Exporter` serves every request; each call to [`Exporter::export`]
/// gets its own workspace and shares nothing mutable with other calls.
pub struct Exporter {
    settings: ExportSettings,
    fetcher: AssetFetcher,
    engine: Arc<dyn MediaEngine>,
}

impl Exporter {
    pub fn new(
        settings: ExportSettings,
        fetch: FetchSettings,
        engine: Arc<dyn MediaEngine>,
    ) -> Result<Self, ExportError> {
        Ok(Self {
            settings,
            fetcher: AssetFetcher::new(fetch)?,
            engine,
        })
    }

    pub async fn export(&self, request: ExportRequest) -> Result<EncodedVideo, ExportError> {
        let request_id = Uuid::new_v4();
        self.run(request)
            .instrument(info_span!("export", %request_id))
            .await
    }

    async fn run(&self, request: ExportRequest) -> Result<EncodedVideo, ExportError> {
        let started = Instant::now();

        // Nothing touches the disk or the network until every reference
        // resolves.
        request.validate()?;
        let assets = ResolvedAssets::from_request(&request, self.settings.base_url.as_ref())
            .inspect_err(|e| warn!(error = %e, "rejected asset reference"))?;

        let workspace = Workspace::create(&self.settings.temp_root)?;
        info!(
            images = request.segment_count(),
            captions = request.script.len(),
            workspace = %workspace.path().display(),
            "export started"
        );

        let result = self.run_stages(&request, &assets, &workspace).await;

        // remove_dir_all blocks.
        let span = Span::current();
        let cleanup = tokio::task::spawn_blocking(move || span.in_scope(|| workspace.destroy()));
        if let Err(e) = cleanup.await {
            warn!(error = %e, "workspace cleanup task failed");
        }

        match &result {
            Ok(video) => info!(
                bytes = video.byte_len,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "export finished"
            ),
            Err(e) => error!(
                stage = e.stage(),
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "export failed"
            ),
        }
        result
    }

    async fn run_stages(
        &self,
        request: &ExportRequest,
        assets: &ResolvedAssets,
        workspace: &Workspace,
    ) -> Result<EncodedVideo, ExportError> {
        let render = &self.settings.render;
        let engine = self.engine.as_ref();

        let fetched = self.fetcher.fetch_assets(assets, workspace).await?;
        let audio_seconds = self.probe_duration(&fetched.audio).await;

        let captions: Vec<String> = (0..request.segment_count())
            .map(|i| request.caption(i).to_string())
            .collect();
        let segments = render_segments(engine, &fetched.images, &captions, workspace, render).await?;
        let video = concatenate(engine, &segments, workspace).await?;
        let artifact = mux_audio(engine, &video, &fetched.audio, workspace, render).await?;

        self.verify_duration(&artifact, audio_seconds).await;
        Ok(encode_artifact(&artifact).await?)
    }

    async fn probe_duration(&self, path: &Path) -> Option<f64> {
        match self.engine.probe(path).await {
            Ok(probe) if probe.duration_seconds > 0.0 => Some(probe.duration_seconds),
            Ok(_) => {
                debug!(path = %path.display(), "probe reported no duration");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "probe failed");
                None
            }
        }
    }

    /// The muxed file should last `min(video, audio)`. A mismatch is logged,
    /// never fatal.
    async fn verify_duration(&self, artifact: &FinalArtifact, audio_seconds: Option<f64>) {
        let Some(actual) = self.probe_duration(&artifact.path).await else {
            return;
        };
        let expected = expected_duration(artifact.video_duration_seconds, audio_seconds);
        if duration_matches(actual, expected) {
            debug!(actual, expected, "output duration verified");
        } else {
            warn!(actual, expected, "output duration differs from min(video, audio)");
        }
    }
}

/// The shorter of the visual track and the narration. Without a probed
/// narration length only the visual track is known.
fn expected_duration(video_seconds: f64, audio_seconds: Option<f64>) -> f64 {
    audio_seconds.map_or(video_seconds, |audio| video_seconds.min(audio))
}

fn duration_matches(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() <= DURATION_TOLERANCE_SECS
}
