//! Caption text handling for the drawtext overlay.
//!
//! A caption goes through four steps before it reaches the render engine:
//! [`normalize`] flattens control characters and line breaks into single
//! spaces, [`truncate`] caps the total length, [`wrap`] splits the result
//! into lines of bounded width, and [`escape_drawtext`] makes the text inert
//! inside an ffmpeg filter graph. [`prepare`] runs the first three.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CoreError, Result};

pub const DEFAULT_WRAP_WIDTH: usize = 50;
pub const DEFAULT_MAX_CHARS: usize = 500;

const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CaptionLimits {
    /// Soft line budget, in characters.
    pub wrap_width: usize,
    /// Hard cap on the caption length, in characters, before wrapping.
    pub max_chars: usize,
}

impl Default for CaptionLimits {
    fn default() -> Self {
        Self {
            wrap_width: DEFAULT_WRAP_WIDTH,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl CaptionLimits {
    pub fn validate(&self) -> Result<()> {
        if self.wrap_width == 0 {
            return Err(CoreError::InvalidSettings(
                "caption wrap width must be non-zero".into(),
            ));
        }
        if self.max_chars == 0 {
            return Err(CoreError::InvalidSettings(
                "caption maximum length must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Normalize, truncate and wrap a caption. Lines are joined with `\n`, which
/// drawtext renders as a line break.
pub fn prepare(text: &str, limits: &CaptionLimits) -> String {
    let normalized = normalize(text);
    let truncated = truncate(&normalized, limits.max_chars);
    wrap(&truncated, limits.wrap_width).join("\n")
}

/// Collapse every run of whitespace (including CR and LF) into one space and
/// drop other control characters.
pub fn normalize(text: &str) -> String {
    let flattened: String = text
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some(' ')
            } else if c.is_control() {
                None
            } else {
                Some(c)
            }
        })
        .collect();
    flattened.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cap `text` at `max_chars` characters. A cut caption ends in `...` and the
/// result, ellipsis included, never exceeds `max_chars`.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= ELLIPSIS.len() {
        return text.chars().take(max_chars).collect();
    }

    let mut cut: String = text.chars().take(max_chars - ELLIPSIS.len()).collect();
    let kept = cut.trim_end().len();
    cut.truncate(kept);
    cut.push_str(ELLIPSIS);
    cut
}

/// Greedy word wrap. Words longer than `width` are split across lines.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut rest = word;
        loop {
            let word_len = rest.chars().count();

            if word_len > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let split_at = rest
                    .char_indices()
                    .nth(width)
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                lines.push(rest[..split_at].to_string());
                rest = &rest[split_at..];
                continue;
            }

            if !current.is_empty() && current_len + 1 + word_len > width {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if !current.is_empty() {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(rest);
            current_len += word_len;
            break;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Escape text for a single-quoted drawtext option inside a `-vf` graph.
///
/// The graph is unescaped twice by ffmpeg: once by the filtergraph parser,
/// which honours the surrounding quotes, and once by the filter's option
/// parser. Backslash and colon are escaped for the option parser; a single
/// quote has to leave the quoted run and be escaped for both levels, giving
/// `'\\\''`. Carriage returns are dropped. Line feeds are kept, drawtext
/// draws them as line breaks.
pub fn escape_drawtext(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            ':' => escaped.push_str("\\:"),
            '\'' => escaped.push_str("'\\\\\\''"),
            '\r' => {}
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Escape a filesystem path for a single-quoted filter option such as
/// `fontfile`.
pub fn escape_filter_path(path: &Path) -> String {
    escape_drawtext(&path.to_string_lossy())
}
