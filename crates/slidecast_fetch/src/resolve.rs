use std::path::Path;

use slidecast_core::{AssetKind, AssetReference, ExportRequest};
use url::Url;

use crate::error::{FetchError, Result};

const MAX_EXTENSION_LEN: usize = 5;

/// Every asset of one request, resolved to absolute URLs.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAssets {
    pub images: Vec<Url>,
    pub audio: Url,
}

impl ResolvedAssets {
    /// Resolve every reference of `request`. Runs before any side effect, so a
    /// single bad reference rejects the request up front.
    pub fn from_request(request: &ExportRequest, base: Option<&Url>) -> Result<Self> {
        let images = request
            .image_list
            .iter()
            .map(|r| resolve(r, base))
            .collect::<Result<Vec<_>>>()?;
        let audio = resolve(&request.audio_file_url, base)?;
        Ok(Self { images, audio })
    }
}

/// Turn a reference into an absolute `http(s)` URL.
///
/// Absolute references are parsed as-is; anything else is joined onto
/// `base`. A relative reference with no base is an error, there is no
/// implicit default host.
pub fn resolve(reference: &AssetReference, base: Option<&Url>) -> Result<Url> {
    let invalid = |reason: String| FetchError::InvalidReference {
        reference: reference.as_str().to_string(),
        reason,
    };

    if reference.is_blank() {
        return Err(invalid("reference is empty".into()));
    }
    let raw = reference.as_str().trim();

    let url = if reference.is_absolute() {
        Url::parse(raw).map_err(|e| invalid(e.to_string()))?
    } else {
        match Url::parse(raw) {
            // "ftp://host/x", "file:///etc/passwd", "data:..."
            Ok(other) => {
                return Err(invalid(format!("unsupported scheme {:?}", other.scheme())));
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = base.ok_or_else(|| {
                    invalid("relative reference and no base URL is configured".into())
                })?;
                base.join(raw).map_err(|e| invalid(e.to_string()))?
            }
            Err(e) => return Err(invalid(e.to_string())),
        }
    };

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme {other:?}"))),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("URL has no host".into()));
    }
    Ok(url)
}

/// File extension for a downloaded asset: the one in the URL path when it is
/// short and alphanumeric, otherwise the kind's default. Restricting the
/// character set keeps workspace file names safe to embed in engine
/// arguments and the concat manifest.
pub fn extension_for(url: &Url, kind: AssetKind) -> String {
    let last_segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    Path::new(last_segment)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| {
            !e.is_empty()
                && e.len() <= MAX_EXTENSION_LEN
                && e.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| kind.default_extension().to_string())
}
