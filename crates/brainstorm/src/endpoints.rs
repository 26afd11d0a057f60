//! Callable endpoints
//!
//! Transport-independent operations invoked by authenticated clients. Each
//! takes the verified caller id explicitly; `None` means the platform could
//! not authenticate the request.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BrainstormError, ErrorCode, Result};
use crate::models::{Category, IdeaOrigin, IdeaRecord};
use crate::repository::{validate_idea_id, IdeaFilter, IdeaRepository};

/// Verified identity of the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerId(String);

impl CallerId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for CallerId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

fn require_caller(caller: Option<&CallerId>) -> Result<&CallerId> {
  caller.ok_or(BrainstormError::Unauthenticated)
}

// Types
// =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestIdeasInput {
  /// Category name; defaults to "features"
  #[serde(default)]
  pub category: Option<String>,
  /// Prompt used when the category is "custom"
  #[serde(default)]
  pub custom_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestIdeasOutput {
  pub success: bool,
  pub id: String,
  pub category: Category,
  pub ideas: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetStarredInput {
  #[serde(default)]
  pub idea_id: Option<String>,
  /// Only the literal `true` stars; anything else unstars
  #[serde(default)]
  pub starred: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetStarredOutput {
  pub success: bool,
  pub starred: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListIdeasInput {
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub starred_only: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListIdeasOutput {
  pub success: bool,
  pub ideas: Vec<IdeaView>,
}

/// Client-facing view of an idea record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdeaView {
  pub id: String,
  pub category: Category,
  pub prompt: String,
  pub ideas: String,
  pub generated_at: DateTime<Utc>,
  pub status: String,
  pub starred: bool,
  pub starred_at: Option<DateTime<Utc>>,
  pub starred_by: Option<String>,
  pub on_demand: bool,
  pub user_id: Option<String>,
}

impl From<IdeaRecord> for IdeaView {
  fn from(record: IdeaRecord) -> Self {
    let on_demand = record.is_on_demand();
    let user_id = record.user_id().map(str::to_string);
    let (starred_at, starred_by) = match record.star {
      Some(mark) => (Some(mark.starred_at), Some(mark.starred_by)),
      None => (None, None),
    };

    Self {
      starred: starred_at.is_some(),
      id: record.id,
      category: record.category,
      prompt: record.prompt,
      ideas: record.ideas,
      generated_at: record.generated_at,
      status: record.status.as_str().to_string(),
      starred_at,
      starred_by,
      on_demand,
      user_id,
    }
  }
}

/// Error payload returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CallableError {
  pub code: ErrorCode,
  pub message: String,
}

impl From<&BrainstormError> for CallableError {
  fn from(error: &BrainstormError) -> Self {
    Self { code: error.code(), message: error.to_string() }
  }
}

impl From<BrainstormError> for CallableError {
  fn from(error: BrainstormError) -> Self {
    Self::from(&error)
  }
}

// Endpoints
// =========

/// Resolve a requested category name, falling back to `features`
fn resolve_category(name: Option<&str>) -> Category {
  match name.map(str::trim).filter(|n| !n.is_empty()) {
    None => Category::Features,
    Some(name) => name.parse().unwrap_or_else(|_| {
      tracing::warn!(category = name, "unknown category requested, using features");
      Category::Features
    }),
  }
}

/// Generate a fresh batch of ideas for the caller
pub async fn request_ideas(
  repo: &IdeaRepository,
  caller: Option<&CallerId>,
  input: RequestIdeasInput,
) -> Result<RequestIdeasOutput> {
  let caller = require_caller(caller)?;

  let category = resolve_category(input.category.as_deref());
  let prompt = category.on_demand_prompt(input.custom_prompt.as_deref());
  let origin = IdeaOrigin::OnDemand { user_id: caller.as_str().to_string() };

  let record = repo.generate_for_category(category, &prompt, origin).await.map_err(|e| {
    tracing::error!(category = %category, caller = %caller, error = %e, "on-demand brainstorm failed");
    e
  })?;

  Ok(RequestIdeasOutput {
    success: true,
    id: record.id,
    category: record.category,
    ideas: record.ideas,
  })
}

/// Star or unstar an idea record
pub async fn set_starred(
  repo: &IdeaRepository,
  caller: Option<&CallerId>,
  input: SetStarredInput,
) -> Result<SetStarredOutput> {
  let caller = require_caller(caller)?;

  let idea_id = input
    .idea_id
    .as_deref()
    .map(str::trim)
    .filter(|id| !id.is_empty())
    .ok_or_else(|| BrainstormError::invalid_argument("ideaId is required"))?;
  validate_idea_id(idea_id)?;

  let starred = matches!(input.starred, Some(Value::Bool(true)));
  let starred = repo.toggle_star(idea_id, starred, caller.as_str()).await?;

  Ok(SetStarredOutput { success: true, starred })
}

/// List stored ideas, newest first
pub async fn list_ideas(
  repo: &IdeaRepository,
  caller: Option<&CallerId>,
  input: ListIdeasInput,
) -> Result<ListIdeasOutput> {
  require_caller(caller)?;

  let category = match input.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
    Some(name) => Some(
      name
        .parse::<Category>()
        .map_err(|e| BrainstormError::invalid_argument(e.to_string()))?,
    ),
    None => None,
  };

  let filter = IdeaFilter { category, starred_only: input.starred_only.unwrap_or(false) };
  let ideas = repo.list_ideas(&filter).await?.into_iter().map(IdeaView::from).collect();

  Ok(ListIdeasOutput { success: true, ideas })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_resolve_category() {
    assert_eq!(resolve_category(None), Category::Features);
    assert_eq!(resolve_category(Some("")), Category::Features);
    assert_eq!(resolve_category(Some("UI")), Category::Ui);
    assert_eq!(resolve_category(Some("custom")), Category::Custom);
    assert_eq!(resolve_category(Some("bogus")), Category::Features);
  }

  #[test]
  fn test_inputs_use_camel_case() {
    let input: SetStarredInput =
      serde_json::from_value(json!({"ideaId": "abc", "starred": "yes"})).unwrap();
    assert_eq!(input.idea_id.as_deref(), Some("abc"));
    assert_eq!(input.starred, Some(json!("yes")));

    let input: RequestIdeasInput =
      serde_json::from_value(json!({"category": "custom", "customPrompt": "x"})).unwrap();
    assert_eq!(input.custom_prompt.as_deref(), Some("x"));
  }

  #[test]
  fn test_callable_error_from_brainstorm_error() {
    let error = CallableError::from(BrainstormError::invalid_argument("ideaId is required"));
    assert_eq!(error.code, ErrorCode::InvalidArgument);
    assert_eq!(error.message, "ideaId is required");

    let json = serde_json::to_value(CallableError::from(BrainstormError::NotFound {
      id: "x".to_string(),
    }))
    .unwrap();
    assert_eq!(json["code"], "not-found");
  }
}
