use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures::{StreamExt, TryStreamExt};
use slidecast_core::{AssetKind, Workspace};
use tracing::{debug, info};
use url::Url;

use crate::error::{FetchError, Result};
use crate::resolve::{extension_for, ResolvedAssets};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Maximum number of downloads in flight for one request.
    pub concurrency: usize,
    /// Per-request timeout, covering connect and body.
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            concurrency: 8,
            request_timeout: Duration::from_secs(60),
            user_agent: concat!("slidecast/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Local copies of a request's assets, in `imageList` order.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedAssets {
    pub images: Vec<PathBuf>,
    pub audio: PathBuf,
}

#[derive(Debug, Clone)]
struct Download {
    url: Url,
    dest: PathBuf,
}

/// Downloads remote assets into a request workspace.
#[derive(Debug, Clone)]
pub struct AssetFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
}

impl AssetFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client, settings })
    }

    /// Download every image and the narration into `workspace`.
    ///
    /// Image and audio downloads share one bounded pool. The first failure
    /// drops the downloads still in flight and is returned.
    pub async fn fetch_assets(
        &self,
        assets: &ResolvedAssets,
        workspace: &Workspace,
    ) -> Result<FetchedAssets> {
        let images: Vec<PathBuf> = assets
            .images
            .iter()
            .enumerate()
            .map(|(i, url)| workspace.image_path(i, &extension_for(url, AssetKind::Image)))
            .collect();
        let audio = workspace.audio_path(&extension_for(&assets.audio, AssetKind::Audio));

        let downloads: Vec<Download> = assets
            .images
            .iter()
            .zip(&images)
            .chain(std::iter::once((&assets.audio, &audio)))
            .map(|(url, dest)| Download {
                url: url.clone(),
                dest: dest.clone(),
            })
            .collect();

        let started = Instant::now();
        let total_bytes: u64 = futures::stream::iter(downloads)
            .map(|d| async move { self.fetch(&d.url, &d.dest).await })
            .buffer_unordered(self.settings.concurrency.max(1))
            .try_fold(0u64, |acc, n| async move { Ok::<_, FetchError>(acc + n) })
            .await?;

        info!(
            images = images.len(),
            bytes = total_bytes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "assets downloaded"
        );
        Ok(FetchedAssets { images, audio })
    }

    /// GET `url` and write the body verbatim to `dest`. Returns the byte count.
    pub async fn fetch(&self, url: &Url, dest: &Path) -> Result<u64> {
        debug!(%url, dest = %dest.display(), "downloading asset");

        let network_error = |source| FetchError::NetworkError {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::FetchFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(network_error)?;
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|source| FetchError::Io {
                path: dest.to_path_buf(),
                source,
            })?;

        debug!(%url, bytes = bytes.len(), "asset written");
        Ok(bytes.len() as u64)
    }
}
