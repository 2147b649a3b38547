use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use slidecast_core::caption::CaptionLimits;
use slidecast_core::settings::{preset_1080p, preset_720p, preset_shorts, DEFAULT_FONT_PATH};
use slidecast_core::{CoreError, RenderSettings};
use slidecast_fetch::FetchSettings;
use slidecast_render::FfmpegEngine;
use thiserror::Error;
use url::Url;

use crate::pipeline::ExportSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid listen address {0:?}")]
    InvalidAddress(String),

    #[error(transparent)]
    Settings(#[from] CoreError),
}

/// Named frame sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    #[value(name = "720p")]
    Hd720,
    #[value(name = "1080p")]
    Hd1080,
    /// Vertical 1080x1920.
    Shorts,
}

impl Preset {
    pub fn settings(self) -> RenderSettings {
        match self {
            Preset::Hd720 => preset_720p(),
            Preset::Hd1080 => preset_1080p(),
            Preset::Shorts => preset_shorts(),
        }
    }
}

/// Process configuration. Every flag can also be set through the named
/// environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "slidecast-server", version, about = "Slideshow video export service")]
pub struct ServerConfig {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 10000)]
    pub port: u16,

    /// Base URL that relative image and audio references are joined onto.
    #[arg(long, env = "BASE_IMAGE_URL")]
    pub base_image_url: Option<String>,

    /// Parent directory for per-request workspaces. Defaults to the system
    /// temp directory.
    #[arg(long, env = "SLIDECAST_TEMP_ROOT")]
    pub temp_root: Option<PathBuf>,

    #[arg(long, env = "SLIDECAST_FONT", default_value = DEFAULT_FONT_PATH)]
    pub font: PathBuf,

    #[arg(long, env = "SLIDECAST_FFMPEG", default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    #[arg(long, env = "SLIDECAST_FFPROBE", default_value = "ffprobe")]
    pub ffprobe: PathBuf,

    /// JSON render settings file. When given it replaces the individual
    /// frame, timing and caption flags below; `--font` still applies.
    #[arg(long, env = "SLIDECAST_RENDER_SETTINGS")]
    pub render_settings: Option<PathBuf>,

    #[arg(long, env = "SLIDECAST_SEGMENT_SECONDS", default_value_t = 5)]
    pub segment_seconds: u32,

    #[arg(long, env = "SLIDECAST_FPS", default_value_t = 30)]
    pub fps: u32,

    #[arg(long, env = "SLIDECAST_PRESET", value_enum, default_value = "720p")]
    pub preset: Preset,

    /// Overrides the preset's width.
    #[arg(long, env = "SLIDECAST_WIDTH")]
    pub width: Option<u32>,

    /// Overrides the preset's height.
    #[arg(long, env = "SLIDECAST_HEIGHT")]
    pub height: Option<u32>,

    #[arg(long, env = "SLIDECAST_FONT_SIZE", default_value_t = 24)]
    pub font_size: u32,

    #[arg(long, env = "SLIDECAST_CAPTION_WRAP", default_value_t = 50)]
    pub caption_wrap: usize,

    #[arg(long, env = "SLIDECAST_CAPTION_MAX_CHARS", default_value_t = 500)]
    pub caption_max_chars: usize,

    /// Downloads in flight per request.
    #[arg(long, env = "SLIDECAST_FETCH_CONCURRENCY", default_value_t = 8)]
    pub fetch_concurrency: usize,

    #[arg(
        long,
        env = "SLIDECAST_FETCH_TIMEOUT_SECS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub fetch_timeout_secs: u64,

    /// Upper bound for each ffmpeg/ffprobe invocation.
    #[arg(
        long,
        env = "SLIDECAST_ENGINE_TIMEOUT_SECS",
        default_value_t = 120,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub engine_timeout_secs: u64,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(format!("{}:{}", self.host, self.port)))
    }

    pub fn base_url(&self) -> Result<Option<Url>, ConfigError> {
        self.base_image_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(|u| {
                Url::parse(u).map_err(|source| ConfigError::InvalidBaseUrl {
                    url: u.to_string(),
                    source,
                })
            })
            .transpose()
    }

    pub fn render(&self) -> Result<RenderSettings, ConfigError> {
        let settings = match &self.render_settings {
            Some(path) => RenderSettings::load_from_file(path)?.with_font(&self.font),
            None => {
                let base = self.preset.settings();
                RenderSettings {
                    width: self.width.unwrap_or(base.width),
                    height: self.height.unwrap_or(base.height),
                    fps: self.fps,
                    segment_seconds: self.segment_seconds,
                    font_path: self.font.clone(),
                    font_size: self.font_size,
                    caption: CaptionLimits {
                        wrap_width: self.caption_wrap,
                        max_chars: self.caption_max_chars,
                    },
                    ..base
                }
            }
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn export(&self) -> Result<ExportSettings, ConfigError> {
        Ok(ExportSettings {
            temp_root: self.temp_root.clone().unwrap_or_else(std::env::temp_dir),
            base_url: self.base_url()?,
            render: self.render()?,
        })
    }

    pub fn fetch(&self) -> FetchSettings {
        FetchSettings {
            concurrency: self.fetch_concurrency.max(1),
            request_timeout: Duration::from_secs(self.fetch_timeout_secs),
            ..FetchSettings::default()
        }
    }

    pub fn engine(&self) -> FfmpegEngine {
        FfmpegEngine::with_binaries(
            &self.ffmpeg,
            &self.ffprobe,
            Duration::from_secs(self.engine_timeout_secs),
        )
    }
}
