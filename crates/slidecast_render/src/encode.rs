use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use slidecast_core::FinalArtifact;

use crate::error::{RenderError, Result};

pub const MP4_MEDIA_TYPE: &str = "video/mp4";

/// The final video, base64 encoded and tagged with its media type.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedVideo {
    pub media_type: &'static str,
    pub base64: String,
    /// Size of the decoded file.
    pub byte_len: usize,
}

impl EncodedVideo {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            media_type: MP4_MEDIA_TYPE,
            base64: BASE64_STANDARD.encode(bytes),
            byte_len: bytes.len(),
        }
    }

    /// `data:video/mp4;base64,...`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.base64)
    }
}

/// Read the muxed file out of the workspace. A missing, unreadable or empty
/// file is `ReadFailed`.
pub async fn encode_artifact(artifact: &FinalArtifact) -> Result<EncodedVideo> {
    let read_failed = |source| RenderError::ReadFailed {
        path: artifact.path.clone(),
        source,
    };

    let bytes = tokio::fs::read(&artifact.path).await.map_err(read_failed)?;
    if bytes.is_empty() {
        return Err(read_failed(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "artifact is empty",
        )));
    }

    tracing::debug!(bytes = bytes.len(), "artifact encoded");
    Ok(EncodedVideo::from_bytes(&bytes))
}
