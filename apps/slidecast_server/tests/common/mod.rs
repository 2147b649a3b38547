#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use slidecast_core::{CaptionRecord, ExportRequest, RenderSettings};
use slidecast_fetch::FetchSettings;
use slidecast_render::{EngineFailure, EngineJob, MediaEngine, MediaProbe, Stage};
use slidecast_server::{ExportSettings, Exporter};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Bytes the fake engine writes as the final muxed file.
pub const FAKE_MP4: &[u8] = b"\x00\x00\x00\x18ftypmp42fake-movie";

/// Stand-in for ffmpeg. Writes each job's output file, records the job and
/// the manifest it was given, and checks that every `-i` input exists.
#[derive(Default)]
pub struct FakeEngine {
    pub jobs: Mutex<Vec<EngineJob>>,
    pub manifests: Mutex<Vec<String>>,
    pub fail_on: Option<Stage>,
    pub hang_on: Option<Stage>,
    pub probe_seconds: f64,
    pub delay: Duration,
}

impl FakeEngine {
    pub fn failing(stage: Stage) -> Self {
        Self {
            fail_on: Some(stage),
            ..Self::default()
        }
    }

    pub fn hanging(stage: Stage) -> Self {
        Self {
            hang_on: Some(stage),
            ..Self::default()
        }
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.jobs.lock().unwrap().iter().map(|j| j.stage).collect()
    }

    pub fn job(&self, stage: Stage) -> EngineJob {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.stage == stage)
            .cloned()
            .unwrap()
    }
}

/// The argument following `-vf`, if any.
pub fn video_filter(job: &EngineJob) -> Option<String> {
    let pos = job.args.iter().position(|a| a == "-vf")?;
    job.args.get(pos + 1).cloned()
}

pub fn inputs(job: &EngineJob) -> Vec<PathBuf> {
    job.args
        .windows(2)
        .filter(|w| w[0] == "-i")
        .map(|w| PathBuf::from(&w[1]))
        .collect()
}

#[async_trait]
impl MediaEngine for FakeEngine {
    async fn run(&self, job: &EngineJob) -> Result<(), EngineFailure> {
        self.jobs.lock().unwrap().push(job.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.hang_on == Some(job.stage) {
            return Err(EngineFailure::TimedOut(Duration::from_secs(120)));
        }
        if self.fail_on == Some(job.stage) {
            return Err(EngineFailure::Exited {
                status: "exit status: 1".into(),
                stderr: format!("{}: Invalid data found when processing input", job.stage),
            });
        }

        for input in inputs(job) {
            if !input.is_file() {
                return Err(EngineFailure::Exited {
                    status: "exit status: 1".into(),
                    stderr: format!("{}: No such file or directory", input.display()),
                });
            }
        }
        if job.stage == Stage::Concat {
            let manifest = std::fs::read_to_string(&inputs(job)[0]).unwrap();
            self.manifests.lock().unwrap().push(manifest);
        }

        let body: &[u8] = match job.stage {
            Stage::Mux => FAKE_MP4,
            _ => b"intermediate",
        };
        std::fs::write(&job.output_path, body).unwrap();
        Ok(())
    }

    async fn probe(&self, _path: &Path) -> Result<MediaProbe, EngineFailure> {
        Ok(MediaProbe {
            duration_seconds: self.probe_seconds,
            ..MediaProbe::default()
        })
    }
}

/// Asset host serving two images and a narration track under `/media/`.
pub async fn asset_server() -> MockServer {
    let server = MockServer::start().await;
    for (route, body) in [
        ("/media/a.jpg", &b"jpeg-a"[..]),
        ("/media/b.jpg", &b"jpeg-b"[..]),
        ("/media/c.png", &b"png-c"[..]),
        ("/media/narration.mp3", &b"mp3-audio"[..]),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(&server)
            .await;
    }
    server
}

pub fn base_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}/media/", server.uri())).unwrap()
}

pub fn exporter(temp_root: &Path, base_url: Option<Url>, engine: Arc<FakeEngine>) -> Exporter {
    let settings = ExportSettings {
        temp_root: temp_root.to_path_buf(),
        base_url,
        render: RenderSettings::default(),
    };
    let fetch = FetchSettings {
        request_timeout: Duration::from_secs(5),
        ..FetchSettings::default()
    };
    Exporter::new(settings, fetch, engine).unwrap()
}

pub fn request(images: &[&str], audio: &str, captions: &[&str]) -> ExportRequest {
    ExportRequest::new(
        images.iter().map(|i| (*i).into()).collect(),
        audio.into(),
        captions.iter().map(|c| CaptionRecord::new(*c)).collect(),
    )
}

/// Number of entries directly under `dir`; zero when it does not exist.
pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
