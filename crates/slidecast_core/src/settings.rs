use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::caption::{CaptionLimits, DEFAULT_MAX_CHARS, DEFAULT_WRAP_WIDTH};
use crate::error::{CoreError, Result};

pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf";

/// Fixed parameters every segment is rendered with. Identical parameters
/// across segments are what make stream-copy concatenation valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub segment_seconds: u32,
    pub pixel_format: String,
    pub video_codec: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub font_path: PathBuf,
    pub font_size: u32,
    pub caption: CaptionLimits,
}

impl Default for RenderSettings {
    fn default() -> Self {
        preset_720p()
    }
}

impl RenderSettings {
    /// Load settings from a JSON file; absent fields take the 720p defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let settings: RenderSettings = serde_json::from_str(&data).map_err(|e| {
            CoreError::InvalidSettings(format!("{}: {e}", path.display()))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CoreError::InvalidSettings("frame size must be non-zero".into()));
        }
        // yuv420p subsamples chroma 2x2
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(CoreError::InvalidSettings(format!(
                "frame size {}x{} must be even",
                self.width, self.height
            )));
        }
        if self.fps == 0 {
            return Err(CoreError::InvalidSettings("fps must be non-zero".into()));
        }
        if self.segment_seconds == 0 {
            return Err(CoreError::InvalidSettings(
                "segment duration must be non-zero".into(),
            ));
        }
        if self.font_size == 0 {
            return Err(CoreError::InvalidSettings("font size must be non-zero".into()));
        }
        self.caption.validate()
    }

    /// Length of the visual track for `segments` clips.
    pub fn visual_duration(&self, segments: usize) -> f64 {
        segments as f64 * f64::from(self.segment_seconds)
    }

    pub fn with_font(mut self, font_path: impl Into<PathBuf>) -> Self {
        self.font_path = font_path.into();
        self
    }
}

fn preset(width: u32, height: u32) -> RenderSettings {
    RenderSettings {
        width,
        height,
        fps: 30,
        segment_seconds: 5,
        pixel_format: "yuv420p".to_string(),
        video_codec: "libx264".to_string(),
        audio_codec: "aac".to_string(),
        audio_bitrate: "192k".to_string(),
        font_path: PathBuf::from(DEFAULT_FONT_PATH),
        font_size: 24,
        caption: CaptionLimits {
            wrap_width: DEFAULT_WRAP_WIDTH,
            max_chars: DEFAULT_MAX_CHARS,
        },
    }
}

/// 1280x720 30fps preset.
pub fn preset_720p() -> RenderSettings {
    preset(1280, 720)
}

/// 1920x1080 30fps preset.
pub fn preset_1080p() -> RenderSettings {
    preset(1920, 1080)
}

/// 1080x1920 30fps (vertical/shorts) preset.
pub fn preset_shorts() -> RenderSettings {
    preset(1080, 1920)
}
