//! Gemini `generateContent` backend.
//!
//! The request always carries a response schema and `application/json` as the response
//! MIME type, so the reply text is machine-parseable. Decoding that text into a domain
//! record is the caller's job (see `insight`).

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Search grounding together with a response schema needs a Gemini 3 model
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// A single prompt/response exchange, independent of the wire format
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub video_uri: Option<String>,
    pub search_grounding: bool,
    pub response_schema: serde_json::Value,
}

/// Raw model output plus any grounding sources it cited
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub source_urls: Vec<String>,
}

/// A generative model that answers schema-constrained prompts
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate_content(&self, request: &GenerationRequest) -> Result<ModelReply>;
}

/// Explicit configuration for `GeminiClient`
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

pub struct GeminiClient {
    client: reqwest::Client,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, settings: GeminiSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            return Err(Error::ApiKeyMissing("GEMINI_API_KEY".to_string()));
        }
        Ok(Self { client, settings })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Gemini 1.x/2.x reject `tools` combined with `responseSchema`
    pub fn supports_grounded_schema(model: &str) -> bool {
        !(model.starts_with("gemini-1") || model.starts_with("gemini-2"))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_content(&self, request: &GenerationRequest) -> Result<ModelReply> {
        let body = WireRequest::from(request);
        let url = self.endpoint();
        debug!(
            "Calling Gemini model {} (grounding={}, video={})",
            self.settings.model,
            request.search_grounding,
            request.video_uri.is_some()
        );
        if request.search_grounding && !Self::supports_grounded_schema(&self.settings.model) {
            warn!(
                "Model {} does not accept search grounding with a response schema; expect a 400",
                self.settings.model
            );
        }

        let resp = self
            .client
            .post(&url)
            .timeout(self.settings.timeout)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::UpstreamRequest(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::UpstreamRequest(format!("Gemini API returned {status}: {body}")));
        }

        let wire: WireResponse = resp
            .json()
            .await
            .map_err(|e| Error::UpstreamRequest(format!("unexpected Gemini response format: {e}")))?;
        wire.into_reply()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: &'static str,
    file_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

impl From<&GenerationRequest> for WireRequest {
    fn from(request: &GenerationRequest) -> Self {
        let mut parts = Vec::new();
        if let Some(uri) = &request.video_uri {
            parts.push(Part {
                text: None,
                file_data: Some(FileData {
                    mime_type: "video/*",
                    file_uri: uri.clone(),
                }),
            });
        }
        parts.push(Part {
            text: Some(request.prompt.clone()),
            file_data: None,
        });

        let tools = if request.search_grounding {
            vec![Tool {
                google_search: serde_json::Map::new(),
            }]
        } else {
            Vec::new()
        };

        WireRequest {
            contents: vec![Content { role: "user", parts }],
            tools,
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: request.response_schema.clone(),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WireResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReplyPart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GroundingMetadata {
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebSource {
    uri: Option<String>,
}

impl WireResponse {
    fn into_reply(self) -> Result<ModelReply> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(Error::SchemaViolation("model returned no candidates".to_string()));
        };

        let text = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(Error::SchemaViolation("model returned no text".to_string()));
        }

        let mut source_urls: Vec<String> = Vec::new();
        let uris = candidate
            .grounding_metadata
            .into_iter()
            .flat_map(|m| m.grounding_chunks)
            .filter_map(|chunk| chunk.web.and_then(|w| w.uri));
        for uri in uris {
            if !source_urls.contains(&uri) {
                source_urls.push(uri);
            }
        }

        Ok(ModelReply { text, source_urls })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn settings(api_key: &str) -> GeminiSettings {
        GeminiSettings {
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: "http://localhost:9/".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_missing_key_fails_fast() {
        let err = GeminiClient::new(reqwest::Client::new(), settings("  ")).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new(reqwest::Client::new(), settings("key")).unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:9/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }

    #[test]
    fn test_default_model_accepts_grounded_schema() {
        assert!(GeminiClient::supports_grounded_schema(DEFAULT_MODEL));
        assert!(GeminiClient::supports_grounded_schema("gemini-3-pro-preview"));
        assert!(!GeminiClient::supports_grounded_schema("gemini-2.5-flash"));
        assert!(!GeminiClient::supports_grounded_schema("gemini-1.5-pro"));
    }

    #[test]
    fn test_wire_request_grounded() {
        let request = GenerationRequest {
            prompt: "Analyze".to_string(),
            video_uri: None,
            search_grounding: true,
            response_schema: serde_json::json!({"type": "OBJECT"}),
        };
        let json = serde_json::to_value(WireRequest::from(&request)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "Analyze"}]}],
                "tools": [{"googleSearch": {}}],
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "responseSchema": {"type": "OBJECT"}
                }
            })
        );
    }

    #[test]
    fn test_wire_request_video() {
        let request = GenerationRequest {
            prompt: "Watch".to_string(),
            video_uri: Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string()),
            search_grounding: false,
            response_schema: serde_json::json!({}),
        };
        let json = serde_json::to_value(WireRequest::from(&request)).unwrap();
        assert!(json.get("tools").is_none());
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["fileData"]["fileUri"], "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(parts[0]["fileData"]["mimeType"], "video/*");
        assert_eq!(parts[1]["text"], "Watch");
    }

    #[test]
    fn test_reply_with_grounding() {
        let wire: WireResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "{\"summary\":"}, {"text": "\"s\"}"}]},
                "groundingMetadata": {
                    "groundingChunks": [
                        {"web": {"uri": "https://a.example/1", "title": "a"}},
                        {"web": {"uri": "https://b.example/2"}},
                        {"web": {"uri": "https://a.example/1"}},
                        {"retrievedContext": {}}
                    ]
                }
            }]
        }))
        .unwrap();
        let reply = wire.into_reply().unwrap();
        assert_eq!(reply.text, "{\"summary\":\"s\"}");
        assert_eq!(reply.source_urls, vec!["https://a.example/1", "https://b.example/2"]);
    }

    #[test]
    fn test_reply_without_text() {
        let wire: WireResponse = serde_json::from_value(serde_json::json!({"candidates": []})).unwrap();
        assert_eq!(wire.into_reply().unwrap_err().kind(), ErrorKind::SchemaViolation);

        let wire: WireResponse =
            serde_json::from_value(serde_json::json!({"candidates": [{"finishReason": "SAFETY"}]})).unwrap();
        assert_eq!(wire.into_reply().unwrap_err().kind(), ErrorKind::SchemaViolation);
    }
}
