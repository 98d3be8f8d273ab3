use std::sync::LazyLock;

use async_trait::async_trait;
use log::{debug, info, warn};
use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::{TranscriptRecord, UNKNOWN_TITLE, VideoId};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

static CAPTIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""captions":\s*(\{[^}]*?"playerCaptionsTracklistRenderer"[^}]+?\})"#).unwrap());

static PLAYABILITY_REASON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""playabilityStatus":\s*\{[^}]*"reason":\s*"([^"]+)""#).unwrap());

static CAPTION_TRACKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""captionTracks":\s*(\[[^\]]+\])"#).unwrap());

/// Anything that can turn a video ID into a transcript
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    async fn fetch(&self, video_id: &VideoId) -> Result<TranscriptRecord>;
}

/// Base URLs for the pages the scraper talks to
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub watch: String,
    pub oembed: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            watch: "https://www.youtube.com/watch".to_string(),
            oembed: "https://www.youtube.com/oembed".to_string(),
        }
    }
}

/// Transcript provider that scrapes caption tracks from the public watch page
#[derive(Debug, Clone)]
pub struct YouTubeScraper {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl YouTubeScraper {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_endpoints(client, Endpoints::default())
    }

    pub fn with_endpoints(client: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    async fn fetch_transcript(&self, video_id: &VideoId) -> Result<(String, String)> {
        let watch_url = format!("{}?v={video_id}", self.endpoints.watch);
        debug!("Fetching watch page: {watch_url}");

        let page_html = self
            .client
            .get(&watch_url)
            .header("User-Agent", USER_AGENT)
            .header("Accept-Language", ACCEPT_LANGUAGE)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::PageUnavailable(e.to_string()))?
            .text()
            .await
            .map_err(|e| Error::PageUnavailable(e.to_string()))?;

        let tracks = find_caption_tracks(&page_html)?;
        let track = select_track(&tracks).ok_or_else(Error::no_captions)?;
        let base_url = track
            .base_url
            .as_deref()
            .ok_or_else(|| Error::NoCaptions("No caption URL found".to_string()))?;
        let language = track.language_code.clone().unwrap_or_default();
        debug!("Using caption track: lang={language}");

        let caption_xml = self
            .client
            .get(base_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::PageUnavailable(format!("failed to fetch captions: {e}")))?
            .text()
            .await
            .map_err(|e| Error::PageUnavailable(format!("failed to fetch captions: {e}")))?;

        let segments = parse_caption_xml(&caption_xml)?;
        if let Some(last) = segments.last() {
            debug!("Parsed {} caption segments ({:.1}s)", segments.len(), last.start + last.duration);
        }

        Ok((join_segments(&segments)?, language))
    }

    async fn fetch_title(&self, video_id: &VideoId) -> String {
        match self.lookup_title(video_id).await {
            Ok(Some(title)) => title,
            Ok(None) => {
                warn!("oEmbed response for {video_id} carried no title");
                UNKNOWN_TITLE.to_string()
            }
            Err(e) => {
                warn!("Title lookup failed for {video_id}: {e}");
                UNKNOWN_TITLE.to_string()
            }
        }
    }

    async fn lookup_title(&self, video_id: &VideoId) -> reqwest::Result<Option<String>> {
        let watch_url = video_id.watch_url();
        let oembed: OEmbed = self
            .client
            .get(&self.endpoints.oembed)
            .query(&[("url", watch_url.as_str()), ("format", "json")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(oembed.title.filter(|t| !t.trim().is_empty()))
    }
}

#[async_trait]
impl TranscriptProvider for YouTubeScraper {
    async fn fetch(&self, video_id: &VideoId) -> Result<TranscriptRecord> {
        let (transcript, title) = tokio::join!(self.fetch_transcript(video_id), self.fetch_title(video_id));
        let (text, language) = transcript?;

        info!("Fetched transcript for {video_id}: {} chars", text.len());
        Ok(TranscriptRecord {
            video_id: video_id.clone(),
            title,
            language,
            text,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OEmbed {
    title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    pub base_url: Option<String>,
    #[serde(rename = "languageCode")]
    pub language_code: Option<String>,
}

/// A single timed caption line
#[derive(Debug, Clone)]
struct Segment {
    text: String,
    start: f64,
    duration: f64,
}

/// Locate and parse the caption track list embedded in a watch page
pub fn find_caption_tracks(html: &str) -> Result<Vec<CaptionTrack>> {
    if !CAPTIONS_RE.is_match(html) {
        if let Some(caps) = PLAYABILITY_REASON_RE.captures(html) {
            return Err(Error::VideoUnavailable(caps[1].to_string()));
        }
        return Err(Error::no_captions());
    }

    let fragment = CAPTION_TRACKS_RE
        .captures(html)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| Error::NoCaptions("No caption tracks found".to_string()))?;

    let tracks: Vec<CaptionTrack> =
        serde_json::from_str(&fragment).map_err(|e| Error::CaptionParse(e.to_string()))?;

    if tracks.is_empty() {
        return Err(Error::NoCaptions("No caption tracks available".to_string()));
    }
    Ok(tracks)
}

/// Prefer any English variant, otherwise the first track
pub fn select_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    tracks
        .iter()
        .find(|t| t.language_code.as_deref().is_some_and(|code| code.starts_with("en")))
        .or_else(|| tracks.first())
}

fn parse_caption_xml(xml: &str) -> Result<Vec<Segment>> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current: Option<Segment> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                let mut segment = Segment {
                    text: String::new(),
                    start: 0.0,
                    duration: 0.0,
                };
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                    match attr.key.as_ref() {
                        b"start" => segment.start = value.unwrap_or_default(),
                        b"dur" => segment.duration = value.unwrap_or_default(),
                        _ => {}
                    }
                }
                current = Some(segment);
            }
            Ok(Event::Text(ref e)) => {
                if let Some(segment) = current.as_mut() {
                    // Captions arrive double-escaped (`&amp;#39;`), so decode twice
                    let raw_text = String::from_utf8_lossy(e);
                    let once = html_escape::decode_html_entities(&raw_text);
                    segment.text.push_str(&html_escape::decode_html_entities(&once));
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => {
                if let Some(mut segment) = current.take() {
                    segment.text = segment.text.replace('\n', " ").trim().to_string();
                    if !segment.text.is_empty() {
                        segments.push(segment);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::CaptionParse(format!("error parsing caption XML: {e}"))),
            _ => {}
        }
    }

    Ok(segments)
}

fn join_segments(segments: &[Segment]) -> Result<String> {
    let text = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() {
        return Err(Error::EmptyTranscript);
    }
    Ok(text)
}
