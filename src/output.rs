use std::fmt::Write;

use crate::{TranscriptRecord, VideoInsight};

/// Render transcript as plain text
pub fn render_transcript(record: &TranscriptRecord) -> String {
    record.text.clone()
}

/// Render transcript with its metadata as JSON
pub fn render_transcript_json(record: &TranscriptRecord) -> String {
    serde_json::to_string_pretty(record).unwrap_or_default()
}

pub fn render_json(insight: &VideoInsight) -> String {
    serde_json::to_string_pretty(insight).unwrap_or_default()
}

/// Human-readable summary, steps and sources
pub fn render_text(insight: &VideoInsight) -> String {
    let mut out = format!("{}\n\n{}\n", insight.title, insight.summary);

    if let Some(steps) = insight.how_to_steps.as_deref().filter(|_| insight.is_how_to) {
        out.push_str("\nSteps:\n");
        for (idx, step) in steps.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}: {}", idx + 1, step.step, step.description);
        }
    }

    if !insight.source_urls.is_empty() {
        out.push_str("\nSources:\n");
        for url in &insight.source_urls {
            let _ = writeln!(out, "  - {url}");
        }
    }

    out.trim_end().to_string()
}

/// Markdown how-to guide. None unless the insight is instructional.
pub fn render_guide(insight: &VideoInsight) -> Option<String> {
    if !insight.is_how_to {
        return None;
    }
    let steps = insight.how_to_steps.as_deref().filter(|s| !s.is_empty())?;

    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", insight.title);
    let _ = writeln!(out, "## Overview\n\n{}\n", insight.summary);
    out.push_str("## Steps\n");
    for (idx, step) in steps.iter().enumerate() {
        let _ = writeln!(out, "\n### Step {}: {}\n\n{}", idx + 1, step.step, step.description);
    }

    if !insight.source_urls.is_empty() {
        out.push_str("\n## Sources\n\n");
        for url in &insight.source_urls {
            let _ = writeln!(out, "- <{url}>");
        }
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HowToStep, extract_video_id};

    fn sample_insight() -> VideoInsight {
        VideoInsight {
            title: "Fix a Flat".to_string(),
            summary: "Replacing a bike inner tube.".to_string(),
            is_how_to: true,
            how_to_steps: Some(vec![
                HowToStep {
                    step: "Remove the wheel".to_string(),
                    description: "Open the brake and quick release.".to_string(),
                },
                HowToStep {
                    step: "Swap the tube".to_string(),
                    description: "Lever off the tyre and fit the new tube.".to_string(),
                },
            ]),
            source_urls: vec!["https://example.com/flat".to_string()],
        }
    }

    #[test]
    fn test_render_text() {
        let output = render_text(&sample_insight());
        assert_eq!(
            output,
            "Fix a Flat\n\nReplacing a bike inner tube.\n\nSteps:\n  \
             1. Remove the wheel: Open the brake and quick release.\n  \
             2. Swap the tube: Lever off the tyre and fit the new tube.\n\nSources:\n  \
             - https://example.com/flat"
        );
    }

    #[test]
    fn test_render_guide_keeps_order() {
        let guide = render_guide(&sample_insight()).unwrap();
        assert!(guide.starts_with("# Fix a Flat\n"));
        let first = guide.find("### Step 1: Remove the wheel").unwrap();
        let second = guide.find("### Step 2: Swap the tube").unwrap();
        assert!(first < second);
        assert!(guide.contains("- <https://example.com/flat>"));
    }

    #[test]
    fn test_render_guide_not_how_to() {
        let mut insight = sample_insight();
        insight.is_how_to = false;
        insight.how_to_steps = None;
        assert!(render_guide(&insight).is_none());
        assert_eq!(render_text(&insight), "Fix a Flat\n\nReplacing a bike inner tube.\n\nSources:\n  - https://example.com/flat");
    }

    #[test]
    fn test_render_json_camel_case() {
        let json: serde_json::Value = serde_json::from_str(&render_json(&sample_insight())).unwrap();
        assert_eq!(json["isHowTo"], true);
        assert_eq!(json["howToSteps"][1]["step"], "Swap the tube");
        assert_eq!(json["sourceUrls"][0], "https://example.com/flat");
    }

    #[test]
    fn test_render_transcript() {
        let record = TranscriptRecord {
            video_id: extract_video_id("dQw4w9WgXcQ").unwrap(),
            title: "Test Video".to_string(),
            language: "en".to_string(),
            text: "Hello world This is a test".to_string(),
        };
        assert_eq!(render_transcript(&record), "Hello world This is a test");
        let json: serde_json::Value = serde_json::from_str(&render_transcript_json(&record)).unwrap();
        assert_eq!(json["videoId"], "dQw4w9WgXcQ");
        assert_eq!(json["title"], "Test Video");
    }
}
