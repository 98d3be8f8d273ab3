use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::insight::{Evidence, InsightGenerator};
use crate::youtube::TranscriptProvider;
use crate::{VideoInsight, extract_video_id};

/// How the generator gets its evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Scrape captions and send only the transcript
    Transcript,
    /// Send the URL and let the model search for it
    Search,
    /// Send the raw video to a multimodal model
    Video,
}

impl Strategy {
    pub fn default_ranking() -> Vec<Strategy> {
        vec![Strategy::Transcript, Strategy::Search]
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Transcript => write!(f, "transcript"),
            Strategy::Search => write!(f, "search"),
            Strategy::Video => write!(f, "video"),
        }
    }
}

/// URL in, insight out
pub struct Pipeline {
    transcripts: Arc<dyn TranscriptProvider>,
    generator: InsightGenerator,
    strategies: Vec<Strategy>,
}

impl Pipeline {
    pub fn new(transcripts: Arc<dyn TranscriptProvider>, generator: InsightGenerator, strategies: Vec<Strategy>) -> Self {
        let strategies = if strategies.is_empty() {
            Strategy::default_ranking()
        } else {
            strategies
        };
        Self {
            transcripts,
            generator,
            strategies,
        }
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Try each strategy in rank order. Only transcript failures move on to the next
    /// strategy; anything the generator returns is final.
    pub async fn run(&self, input: &str) -> Result<VideoInsight> {
        let video_id =
            extract_video_id(input).ok_or_else(|| Error::InvalidVideoReference(input.trim().to_string()))?;
        let url = video_id.watch_url();

        let mut last_err = None;
        for strategy in &self.strategies {
            info!("Generating insight for {video_id} via {strategy} strategy");
            let insight = match strategy {
                Strategy::Transcript => match self.transcripts.fetch(&video_id).await {
                    Ok(record) => self.generator.generate(Evidence::Transcript(&record)).await,
                    Err(e) if e.is_transcript_failure() => {
                        warn!("Transcript unavailable for {video_id}: {e}");
                        last_err = Some(e);
                        continue;
                    }
                    Err(e) => Err(e),
                },
                Strategy::Search => self.generator.generate(Evidence::SearchGrounded { url: &url }).await,
                Strategy::Video => self.generator.generate(Evidence::Video { url: &url }).await,
            };
            return insight;
        }

        Err(last_err.unwrap_or_else(Error::no_captions))
    }
}
