//! Local copy of the last listed ideas
//!
//! `list` saves every successful result here and reads it back when the
//! server cannot be reached.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::endpoints::IdeaView;

/// JSON file holding the most recent `list` result
#[derive(Debug, Clone)]
pub struct IdeaCache {
  path: PathBuf,
}

impl IdeaCache {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// `~/.brainstorm/ideas_cache.json`
  pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".brainstorm").join("ideas_cache.json"))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Replace the cached ideas
  pub fn save(&self, ideas: &[IdeaView]) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create cache directory {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(ideas)?;
    std::fs::write(&self.path, json)
      .with_context(|| format!("failed to write idea cache {}", self.path.display()))?;

    tracing::debug!(count = ideas.len(), path = %self.path.display(), "cached ideas");
    Ok(())
  }

  /// Cached ideas, or `None` when nothing has been cached yet
  pub fn load(&self) -> Result<Option<Vec<IdeaView>>> {
    if !self.path.exists() {
      return Ok(None);
    }

    let json = std::fs::read_to_string(&self.path)
      .with_context(|| format!("failed to read idea cache {}", self.path.display()))?;
    let ideas: Vec<IdeaView> = serde_json::from_str(&json)
      .with_context(|| format!("failed to parse idea cache {}", self.path.display()))?;

    tracing::debug!(count = ideas.len(), path = %self.path.display(), "loaded cached ideas");
    Ok(Some(ideas))
  }

  /// Cached ideas narrowed to the same filters `list` sends to the server
  pub fn load_filtered(&self, category: Option<&str>, starred_only: bool) -> Result<Option<Vec<IdeaView>>> {
    let category = category.map(str::trim).filter(|c| !c.is_empty());

    Ok(self.load()?.map(|ideas| {
      ideas
        .into_iter()
        .filter(|idea| category.map_or(true, |c| idea.category.as_str().eq_ignore_ascii_case(c)))
        .filter(|idea| !starred_only || idea.starred)
        .collect()
    }))
  }
}
