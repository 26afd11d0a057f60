//! HTTP client for the brainstorm REST API
//!
//! Thin wrapper that speaks the callable envelope and passes the caller id
//! in the trusted header.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tokio::time::timeout;

use crate::endpoints::{
  ListIdeasInput, ListIdeasOutput, RequestIdeasInput, RequestIdeasOutput, SetStarredInput,
  SetStarredOutput,
};
use crate::server::types::{CallableErrorBody, CallableRequest, CallableResponse};

/// Configuration for the brainstorm HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
  /// Base URL of the server (e.g., "http://localhost:3000")
  pub base_url: String,
  /// Request timeout in seconds
  pub timeout_secs: u64,
  /// Caller id sent in `caller_header`
  pub caller_id: Option<String>,
  pub caller_header: String,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:3000".to_string(),
      timeout_secs: 90,
      caller_id: None,
      caller_header: "x-caller-id".to_string(),
    }
  }
}

/// HTTP client for the callable endpoints
pub struct BrainstormClient {
  client: Client,
  config: ClientConfig,
}

impl BrainstormClient {
  pub fn with_config(config: ClientConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .context("failed to create HTTP client")?;

    Ok(Self { client, config })
  }

  async fn call<I, O>(&self, route: &str, data: I) -> Result<O>
  where
    I: Serialize,
    O: DeserializeOwned,
  {
    let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), route);
    let mut request = self.client.post(&url).json(&CallableRequest { data });
    if let Some(caller) = &self.config.caller_id {
      request = request.header(self.config.caller_header.as_str(), caller.as_str());
    }

    let response = timeout(Duration::from_secs(self.config.timeout_secs), request.send())
      .await
      .map_err(|_| anyhow!("request to {url} timed out"))??;

    if !response.status().is_success() {
      let status = response.status();
      let text = response.text().await?;
      return Err(match serde_json::from_str::<CallableErrorBody>(&text) {
        Ok(body) => anyhow!("{} ({}): {}", route, body.error.code.as_str(), body.error.message),
        Err(_) => anyhow!("{route} failed with status {status}: {text}"),
      });
    }

    let body: CallableResponse<O> = response.json().await?;
    Ok(body.result)
  }

  /// Generate ideas for a category
  pub async fn request_ideas(&self, category: &str, custom_prompt: Option<&str>) -> Result<RequestIdeasOutput> {
    let input = RequestIdeasInput {
      category: Some(category.to_string()),
      custom_prompt: custom_prompt.map(str::to_string),
    };
    self.call("requestIdeas", input).await
  }

  /// Star or unstar an idea
  pub async fn set_starred(&self, idea_id: &str, starred: bool) -> Result<SetStarredOutput> {
    let input = SetStarredInput {
      idea_id: Some(idea_id.to_string()),
      starred: Some(serde_json::Value::Bool(starred)),
    };
    self.call("setStarred", input).await
  }

  /// List stored ideas
  pub async fn list_ideas(&self, category: Option<&str>, starred_only: bool) -> Result<ListIdeasOutput> {
    let input = ListIdeasInput {
      category: category.map(str::to_string),
      starred_only: Some(starred_only),
    };
    self.call("listIdeas", input).await
  }
}
