use std::sync::Arc;

use log::{debug, warn};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::gemini::{GenerationRequest, GenerativeModel};
use crate::{HowToStep, TranscriptRecord, UNKNOWN_TITLE, VideoInsight};

const TASKS: &str = "1. Provide a concise summary in 120 words or less.
2. Determine if it is a \"how-to\" or instructional video.
3. If it is how-to, extract a list of structured steps with detailed descriptions, in the order they are presented.";

/// What the model is allowed to look at
#[derive(Debug, Clone, Copy)]
pub enum Evidence<'a> {
    /// Transcript text only; the model never sees the video
    Transcript(&'a TranscriptRecord),
    /// Video URL plus Google Search grounding
    SearchGrounded { url: &'a str },
    /// Raw video reference for a multimodal model
    Video { url: &'a str },
}

/// Turns evidence about a video into a `VideoInsight`
#[derive(Clone)]
pub struct InsightGenerator {
    model: Arc<dyn GenerativeModel>,
}

impl InsightGenerator {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    pub async fn generate(&self, evidence: Evidence<'_>) -> Result<VideoInsight> {
        let request = build_request(evidence);
        let reply = self.model.generate_content(&request).await?;
        let parsed = parse_insight(&reply.text)?;

        let (known_title, source_urls) = match evidence {
            Evidence::Transcript(record) => (record.known_title(), Vec::new()),
            Evidence::SearchGrounded { .. } => (None, reply.source_urls),
            Evidence::Video { .. } => (None, Vec::new()),
        };

        let title = known_title
            .map(str::to_string)
            .or(parsed.title.filter(|t| !t.trim().is_empty()))
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

        let how_to_steps = if parsed.is_how_to { parsed.how_to_steps } else { None };
        debug!(
            "Generated insight for \"{title}\": how_to={}, steps={}, sources={}",
            parsed.is_how_to,
            how_to_steps.as_ref().map_or(0, Vec::len),
            source_urls.len()
        );

        Ok(VideoInsight {
            title,
            summary: parsed.summary,
            is_how_to: parsed.is_how_to,
            how_to_steps,
            source_urls,
        })
    }
}

fn build_request(evidence: Evidence<'_>) -> GenerationRequest {
    match evidence {
        Evidence::Transcript(record) => GenerationRequest {
            prompt: transcript_prompt(record),
            video_uri: None,
            search_grounding: false,
            response_schema: response_schema(false),
        },
        Evidence::SearchGrounded { url } => GenerationRequest {
            prompt: format!(
                "Analyze this YouTube video: {url}.\n{TASKS}\n4. Identify the video title.\n\n\
                 Search for the video metadata and transcript to ensure accuracy."
            ),
            video_uri: None,
            search_grounding: true,
            response_schema: response_schema(true),
        },
        Evidence::Video { url } => GenerationRequest {
            prompt: format!(
                "Analyze the attached YouTube video ({url}). Base your answer only on what is shown and said in it.\n\
                 {TASKS}\n4. Identify the video title."
            ),
            video_uri: Some(url.to_string()),
            search_grounding: false,
            response_schema: response_schema(true),
        },
    }
}

fn transcript_prompt(record: &TranscriptRecord) -> String {
    let about = match record.known_title() {
        Some(title) => format!("the YouTube video \"{title}\""),
        None => format!("the YouTube video {}", record.video_id),
    };
    format!(
        "Below is the transcript of {about}. Use only this transcript as evidence; do not rely on outside knowledge.\n\
         {TASKS}\n\nTranscript:\n{}",
        record.text
    )
}

/// JSON schema the model must answer with
pub fn response_schema(require_title: bool) -> serde_json::Value {
    let mut required = vec!["summary", "isHowTo"];
    if require_title {
        required.insert(0, "title");
    }

    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "summary": { "type": "STRING" },
            "isHowTo": { "type": "BOOLEAN" },
            "howToSteps": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "step": { "type": "STRING" },
                        "description": { "type": "STRING" }
                    },
                    "required": ["step", "description"]
                }
            }
        },
        "required": required
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInsight {
    #[serde(default)]
    title: Option<String>,
    summary: String,
    is_how_to: bool,
    #[serde(default)]
    how_to_steps: Option<Vec<HowToStep>>,
}

fn parse_insight(text: &str) -> Result<ModelInsight> {
    let parsed: ModelInsight = serde_json::from_str(text.trim()).map_err(|e| {
        warn!("Failed to parse Gemini response: {text}");
        Error::SchemaViolation(e.to_string())
    })?;

    if parsed.is_how_to && parsed.how_to_steps.as_ref().is_none_or(Vec::is_empty) {
        return Err(Error::SchemaViolation("isHowTo is true but howToSteps is missing".to_string()));
    }
    Ok(parsed)
}
