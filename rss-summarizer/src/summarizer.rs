use crate::traits::Summarizer;
use crate::types::{FetchConfig, Result, SummarizerError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const SYSTEM_INSTRUCTION: &str = "The user will provide the content of an article. \
    You must reply with a single sentence that summarizes the main points of the article.";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// The structured output the model is constrained to.
#[derive(Deserialize)]
struct SummaryPayload {
    summary: String,
}

/// Gemini-backed summarizer using structured JSON output.
pub struct GeminiSummarizer {
    http_client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiSummarizer {
    /// The client shares the fetch timeout and user agent, so a stalled
    /// model call fails its item instead of holding up the batch.
    pub fn new(api_key: Option<String>, model: impl Into<String>, config: &FetchConfig) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            api_key,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint (proxies, local stubs).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn build_request(text: &str) -> GenerateContentRequest<'_> {
        GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: json!({
                    "type": "OBJECT",
                    "properties": {
                        "summary": {
                            "type": "STRING",
                            "description": "A summary of the article. Must be a single sentence."
                        }
                    },
                    "required": ["summary"]
                }),
            },
        }
    }
}

/// Pull the `summary` field out of a raw `generateContent` response body.
pub(crate) fn parse_summary_response(body: &str) -> Result<String> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| SummarizerError::Summarization(format!("Malformed response: {}", e)))?;

    let text = response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .find_map(|p| p.text)
        .ok_or_else(|| SummarizerError::Summarization("No candidate text in response".to_string()))?;

    let payload: SummaryPayload = serde_json::from_str(&text)
        .map_err(|e| SummarizerError::Summarization(format!("Malformed structured output: {}", e)))?;

    let summary = payload.summary.trim().to_string();
    if summary.is_empty() {
        return Err(SummarizerError::Summarization("Empty summary".to_string()));
    }
    Ok(summary)
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    fn summarizer_name(&self) -> String {
        format!("Gemini ({})", self.model)
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SummarizerError::Summarization("GOOGLE_API_KEY not set".to_string()))?;

        let start = Instant::now();
        let response = self
            .http_client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", api_key)
            .json(&Self::build_request(text))
            .send()
            .await
            .map_err(|e| SummarizerError::Summarization(format!("Network error: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SummarizerError::Summarization(format!("Network error: {}", e)))?;

        if !status.is_success() {
            warn!(status = %status, "Gemini API error");
            return Err(SummarizerError::Summarization(format!(
                "API error {}: {}",
                status.as_u16(),
                body
            )));
        }

        let summary = parse_summary_response(&body)?;
        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis(),
            "Gemini summary generated"
        );
        Ok(summary)
    }
}
