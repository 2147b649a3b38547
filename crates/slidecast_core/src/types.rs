use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{CoreError, Result};

// ---------------------------------------------------------------------------
// AssetKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Audio,
}

impl AssetKind {
    /// Extension used when the remote resource does not reveal one.
    pub fn default_extension(self) -> &'static str {
        match self {
            AssetKind::Image => "jpg",
            AssetKind::Audio => "mp3",
        }
    }
}

// ---------------------------------------------------------------------------
// AssetReference
// ---------------------------------------------------------------------------

/// A string naming a remote asset: either an absolute `http(s)` URL or a path
/// resolved against the configured base URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct AssetReference(pub String);

impl AssetReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// True when the reference carries its own `http://` or `https://` scheme.
    pub fn is_absolute(&self) -> bool {
        let s = self.0.trim_start();
        starts_with_ignore_case(s, "http://") || starts_with_ignore_case(s, "https://")
    }
}

impl From<&str> for AssetReference {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AssetReference {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for AssetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

// ---------------------------------------------------------------------------
// CaptionRecord
// ---------------------------------------------------------------------------

/// Field names a caption record may carry its text under, in lookup order.
const CAPTION_TEXT_KEYS: [&str; 3] = ["ContentText", "contentText", "text"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptionRecord {
    #[serde(rename = "ContentText", default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CaptionRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    /// Lenient conversion from an arbitrary JSON script entry. Entries that
    /// are not objects, or carry no string text field, become empty captions.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let text = value.as_object().and_then(|obj| {
            CAPTION_TEXT_KEYS
                .iter()
                .find_map(|key| obj.get(*key).and_then(|v| v.as_str()))
                .map(str::to_string)
        });
        Self { text }
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// ExportRequest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub image_list: Vec<AssetReference>,
    pub audio_file_url: AssetReference,
    pub script: Vec<CaptionRecord>,
}

/// Wire shape before validation; every field is optional so that missing
/// fields surface as `InvalidInput` rather than a deserializer message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExportRequest {
    image_list: Option<Vec<String>>,
    audio_file_url: Option<String>,
    script: Option<Vec<serde_json::Value>>,
}

impl ExportRequest {
    pub fn new(
        image_list: Vec<AssetReference>,
        audio_file_url: AssetReference,
        script: Vec<CaptionRecord>,
    ) -> Self {
        Self {
            image_list,
            audio_file_url,
            script,
        }
    }

    /// Parse and validate a JSON request body.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let raw: RawExportRequest = serde_json::from_slice(body)
            .map_err(|e| CoreError::InvalidInput(format!("malformed request body: {e}")))?;

        let image_list = raw
            .image_list
            .ok_or_else(|| CoreError::InvalidInput("imageList is required".into()))?;
        let audio_file_url = raw
            .audio_file_url
            .ok_or_else(|| CoreError::InvalidInput("audioFileUrl is required".into()))?;
        let script = raw
            .script
            .ok_or_else(|| CoreError::InvalidInput("script is required".into()))?;

        let request = Self {
            image_list: image_list.into_iter().map(AssetReference).collect(),
            audio_file_url: AssetReference(audio_file_url),
            script: script.iter().map(CaptionRecord::from_value).collect(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Check the structural invariants. Reference syntax is checked later, at
    /// resolution time.
    pub fn validate(&self) -> Result<()> {
        if self.image_list.is_empty() {
            return Err(CoreError::InvalidInput(
                "imageList must contain at least one image".into(),
            ));
        }
        if self.audio_file_url.is_blank() {
            return Err(CoreError::InvalidInput("audioFileUrl must not be empty".into()));
        }
        Ok(())
    }

    /// Number of segments the request renders; one per image.
    pub fn segment_count(&self) -> usize {
        self.image_list.len()
    }

    /// Caption for segment `index`, empty when the script is shorter.
    pub fn caption(&self, index: usize) -> &str {
        self.script.get(index).map(CaptionRecord::text).unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// One rendered clip, identified by its position in `imageList`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub index: usize,
    pub path: PathBuf,
    pub duration_seconds: u32,
    pub fps: u32,
    pub pixel_format: String,
    /// Caption as handed to the render engine, after escaping.
    pub caption: String,
}

// ---------------------------------------------------------------------------
// Stage outputs
// ---------------------------------------------------------------------------

/// Silent video produced by joining every segment in order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcatenatedVideo {
    pub path: PathBuf,
    pub segment_count: usize,
    pub duration_seconds: f64,
}

/// The muxed video + narration file, still inside the workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalArtifact {
    pub path: PathBuf,
    pub video_duration_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_request() {
        let body = br#"{
            "imageList": ["a.jpg", "https://cdn.example.com/b.png"],
            "audioFileUrl": "narration.mp3",
            "script": [{"ContentText": "Hello"}, {"ContentText": "World"}]
        }"#;
        let req = ExportRequest::from_json(body).unwrap();
        assert_eq!(req.segment_count(), 2);
        assert_eq!(req.image_list[1].as_str(), "https://cdn.example.com/b.png");
        assert_eq!(req.audio_file_url.as_str(), "narration.mp3");
        assert_eq!(req.caption(0), "Hello");
        assert_eq!(req.caption(1), "World");
    }

    #[test]
    fn empty_image_list_is_invalid_input() {
        let body = br#"{"imageList": [], "audioFileUrl": "a.mp3", "script": []}"#;
        let err = ExportRequest::from_json(body).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn missing_fields_are_invalid_input() {
        let cases: [&[u8]; 4] = [
            br#"{"audioFileUrl": "a.mp3", "script": []}"#,
            br#"{"imageList": ["a.jpg"], "script": []}"#,
            br#"{"imageList": ["a.jpg"], "audioFileUrl": "a.mp3"}"#,
            br#"{"imageList": ["a.jpg"], "audioFileUrl": "", "script": []}"#,
        ];
        for body in cases {
            let err = ExportRequest::from_json(body).unwrap_err();
            assert!(
                matches!(err, CoreError::InvalidInput(_)),
                "expected InvalidInput for {}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn malformed_json_is_invalid_input() {
        let err = ExportRequest::from_json(b"{not json").unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));

        let err =
            ExportRequest::from_json(br#"{"imageList": [1, 2], "audioFileUrl": "a", "script": []}"#)
                .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn short_script_yields_empty_captions() {
        let body = br#"{
            "imageList": ["a.jpg", "b.jpg", "c.jpg"],
            "audioFileUrl": "a.mp3",
            "script": [{"ContentText": "only first"}]
        }"#;
        let req = ExportRequest::from_json(body).unwrap();
        assert_eq!(req.caption(0), "only first");
        assert_eq!(req.caption(1), "");
        assert_eq!(req.caption(2), "");
    }

    #[test]
    fn caption_record_accepts_alternate_keys_and_junk() {
        let v = serde_json::json!({"text": "plain"});
        assert_eq!(CaptionRecord::from_value(&v).text(), "plain");

        let v = serde_json::json!({"contentText": "camel"});
        assert_eq!(CaptionRecord::from_value(&v).text(), "camel");

        let v = serde_json::json!({"ContentText": 42});
        assert_eq!(CaptionRecord::from_value(&v).text(), "");

        assert_eq!(CaptionRecord::from_value(&serde_json::Value::Null).text(), "");
        assert_eq!(CaptionRecord::from_value(&serde_json::json!("bare")).text(), "");
    }

    #[test]
    fn reference_absoluteness() {
        assert!(AssetReference::from("http://x/a.jpg").is_absolute());
        assert!(AssetReference::from("HTTPS://x/a.jpg").is_absolute());
        assert!(!AssetReference::from("images/a.jpg").is_absolute());
        assert!(!AssetReference::from("/images/a.jpg").is_absolute());
        assert!(!AssetReference::from("httpfoo/a.jpg").is_absolute());
        assert!(AssetReference::from("   ").is_blank());
    }

    #[test]
    fn default_extensions() {
        assert_eq!(AssetKind::Image.default_extension(), "jpg");
        assert_eq!(AssetKind::Audio.default_extension(), "mp3");
    }

    #[test]
    fn request_serializes_in_wire_shape() {
        let req = ExportRequest::new(
            vec!["a.jpg".into()],
            "n.mp3".into(),
            vec![CaptionRecord::new("Hi")],
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["imageList"][0], "a.jpg");
        assert_eq!(json["audioFileUrl"], "n.mp3");
        assert_eq!(json["script"][0]["ContentText"], "Hi");

        let back = ExportRequest::from_json(json.to_string().as_bytes()).unwrap();
        assert_eq!(back, req);
    }
}
