pub mod config;
pub mod error;
pub mod gemini;
pub mod insight;
pub mod output;
pub mod pipeline;
pub mod server;
pub mod youtube;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use error::{Error, ErrorKind, Result};

/// Title used when the metadata lookup fails
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Canonical 11-character YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch page URL for this video
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transcript text for a video, joined from its caption track
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRecord {
    pub video_id: VideoId,
    pub title: String,
    pub language: String,
    pub text: String,
}

impl TranscriptRecord {
    /// The resolved title, or None when only the placeholder is available
    pub fn known_title(&self) -> Option<&str> {
        let title = self.title.trim();
        (!title.is_empty() && title != UNKNOWN_TITLE).then_some(title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HowToStep {
    pub step: String,
    pub description: String,
}

/// Structured result of the insight pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInsight {
    pub title: String,
    pub summary: String,
    pub is_how_to: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub how_to_steps: Option<Vec<HowToStep>>,
    pub source_urls: Vec<String>,
}

const ID: &str = "[a-zA-Z0-9_-]{11}";

// Ordered: the first pattern that captures wins.
static VIDEO_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        format!(r"youtube\.com/watch\?(?:[^#]*&)?v=({ID})(?:[^a-zA-Z0-9_-]|$)"),
        format!(r"youtu\.be/({ID})(?:[^a-zA-Z0-9_-]|$)"),
        format!(r"youtube\.com/embed/({ID})(?:[^a-zA-Z0-9_-]|$)"),
        format!(r"youtube\.com/shorts/({ID})(?:[^a-zA-Z0-9_-]|$)"),
        format!(r"^({ID})$"),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Extract video ID from various YouTube URL formats
pub fn extract_video_id(input: &str) -> Option<VideoId> {
    let input = input.trim();

    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(input))
        .map(|caps| VideoId(caps[1].to_string()))
}
