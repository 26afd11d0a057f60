//! Gemini `generateContent` adapter

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{GenerationError, TextGenerator};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Settings for the Gemini client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
  pub api_key: String,
  pub model: String,
  pub base_url: String,
  pub timeout: Duration,
}

impl GeminiConfig {
  pub fn new(api_key: impl Into<String>) -> Self {
    Self {
      api_key: api_key.into(),
      model: DEFAULT_MODEL.to_string(),
      base_url: DEFAULT_BASE_URL.to_string(),
      timeout: Duration::from_secs(60),
    }
  }
}

/// HTTP client for Google's Generative Language API
#[derive(Debug, Clone)]
pub struct GeminiClient {
  client: reqwest::Client,
  base_url: String,
  model: String,
}

// Wire types
// ==========

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
  contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
  parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
  text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
  prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
  content: Option<CandidateContent>,
  finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
  #[serde(default)]
  parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
  text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
  block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
  error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
  message: String,
}

impl GeminiClient {
  pub fn new(config: &GeminiConfig) -> Result<Self, GenerationError> {
    if config.api_key.trim().is_empty() {
      return Err(GenerationError::Config { message: "API key is empty".into() });
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let key = HeaderValue::from_str(&config.api_key)
      .map_err(|_| GenerationError::Config { message: "invalid API key format".into() })?;
    headers.insert("x-goog-api-key", key);

    let client = reqwest::Client::builder()
      .timeout(config.timeout)
      .default_headers(headers)
      .build()
      .map_err(|e| GenerationError::Config {
        message: format!("failed to create HTTP client: {e}"),
      })?;

    Ok(Self {
      client,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      model: config.model.clone(),
    })
  }

  pub fn model(&self) -> &str {
    &self.model
  }

  fn generate_url(&self) -> String {
    format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
  }
}

#[async_trait]
impl TextGenerator for GeminiClient {
  async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
    let request =
      GenerateContentRequest { contents: vec![Content { parts: vec![RequestPart { text: prompt }] }] };

    let response = self
      .client
      .post(self.generate_url())
      .json(&request)
      .send()
      .await
      .map_err(|e| GenerationError::Transport { message: e.to_string() })?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| GenerationError::Transport { message: e.to_string() })?;

    if !status.is_success() {
      let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);
      return Err(GenerationError::Http { status: status.as_u16(), message });
    }

    let parsed: GenerateContentResponse = serde_json::from_str(&body)
      .map_err(|e| GenerationError::MalformedResponse { message: e.to_string() })?;

    extract_text(parsed)
  }
}

/// Pull the first candidate's text out of a response
fn extract_text(response: GenerateContentResponse) -> Result<String, GenerationError> {
  if let Some(reason) = response.prompt_feedback.and_then(|feedback| feedback.block_reason) {
    return Err(GenerationError::Blocked { reason });
  }

  let Some(candidate) = response.candidates.into_iter().next() else {
    return Err(GenerationError::EmptyResponse);
  };

  let text: String = candidate
    .content
    .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
    .unwrap_or_default();

  if text.trim().is_empty() {
    let reason = candidate.finish_reason.unwrap_or_default();
    let blocked = matches!(reason.as_str(), "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT");
    return if blocked {
      Err(GenerationError::Blocked { reason })
    } else {
      Err(GenerationError::EmptyResponse)
    };
  }

  Ok(text)
}
