//! Idea categories and the prompts that drive them

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Prompt used for `custom` requests that arrive without their own prompt
pub const CUSTOM_FALLBACK_PROMPT: &str = "Generate 3 creative ideas for improving a developer tool.";

/// Thematic bucket guiding a generation prompt
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
  Features,
  Ui,
  Optimization,
  Integration,
  Custom,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown category '{0}'")]
pub struct UnknownCategory(pub String);

impl Category {
  /// Every category, in display order
  pub const ALL: [Category; 5] = [
    Category::Features,
    Category::Ui,
    Category::Optimization,
    Category::Integration,
    Category::Custom,
  ];

  /// Categories generated by the daily batch, in the order they run
  pub const SCHEDULED: [Category; 4] =
    [Category::Features, Category::Ui, Category::Optimization, Category::Integration];

  pub fn as_str(&self) -> &'static str {
    match self {
      Category::Features => "features",
      Category::Ui => "ui",
      Category::Optimization => "optimization",
      Category::Integration => "integration",
      Category::Custom => "custom",
    }
  }

  /// Prompt used by the daily batch; `custom` has none
  pub fn scheduled_prompt(&self) -> Option<&'static str> {
    match self {
      Category::Features => Some(
        "Generate 3 innovative feature ideas for an AI-powered terminal assistant. \
         Focus on developer productivity and creative workflows. \
         Keep each idea concise (2-3 sentences).",
      ),
      Category::Ui => Some(
        "Suggest 3 UI/UX improvements for an AI terminal application. \
         Focus on visual elegance, accessibility, and user delight. Keep each idea concise.",
      ),
      Category::Optimization => Some(
        "Propose 3 performance or workflow optimizations for an AI assistant that integrates \
         local and cloud LLMs. Focus on speed, efficiency, and smart caching. \
         Keep each idea concise.",
      ),
      Category::Integration => Some(
        "Suggest 3 creative integrations for an AI terminal assistant with existing developer \
         tools or services (GitHub, VS Code, Docker, etc.). Keep each idea concise.",
      ),
      Category::Custom => None,
    }
  }

  /// Prompt used for caller-initiated requests.
  ///
  /// `custom` uses the caller's prompt when it has any non-whitespace content.
  pub fn on_demand_prompt(&self, custom_prompt: Option<&str>) -> String {
    let prompt = match self {
      Category::Features => {
        "Generate 3 innovative feature ideas for an AI-powered terminal assistant. \
         Focus on developer productivity."
      }
      Category::Ui => {
        "Suggest 3 UI/UX improvements for an AI terminal application. \
         Focus on visual elegance and user delight."
      }
      Category::Optimization => {
        "Propose 3 performance optimizations for an AI assistant. Focus on speed and efficiency."
      }
      Category::Integration => {
        "Suggest 3 creative integrations with developer tools (GitHub, VS Code, Docker, etc.)."
      }
      Category::Custom => custom_prompt
        .map(str::trim)
        .filter(|prompt| !prompt.is_empty())
        .unwrap_or(CUSTOM_FALLBACK_PROMPT),
    };
    prompt.to_string()
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Category {
  type Err = UnknownCategory;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    let normalized = value.trim().to_ascii_lowercase();
    Category::ALL
      .into_iter()
      .find(|category| category.as_str() == normalized)
      .ok_or_else(|| UnknownCategory(value.to_string()))
  }
}
