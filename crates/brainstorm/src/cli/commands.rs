use anyhow::Result;
use colored::*;
use std::path::Path;
use std::sync::Arc;

use crate::cli::cache::IdeaCache;
use crate::cli::client::BrainstormClient;
use crate::cli::display::{display_batch_result, display_idea, display_ideas};
use crate::clock::SystemClock;
use crate::config::Config;
use crate::repository::MAX_RETENTION_DAYS;

/// Ask the server for a fresh batch of ideas
pub async fn request_ideas(client: &BrainstormClient, category: &str, prompt: Option<&str>) -> Result<()> {
  let output = client.request_ideas(category, prompt).await?;
  display_ideas(&output.id, output.category, &output.ideas);
  Ok(())
}

/// Star or unstar an idea
pub async fn set_starred(client: &BrainstormClient, id: &str, starred: bool) -> Result<()> {
  let output = client.set_starred(id, starred).await?;

  if output.starred {
    println!("{} Starred {}", "★".yellow(), id.cyan());
  } else {
    println!("{} Unstarred {}", "☆".dimmed(), id.cyan());
  }
  Ok(())
}

/// List ideas from the server, falling back to the local cache when the
/// server call fails
pub async fn list_ideas(
  client: &BrainstormClient,
  cache: Option<&IdeaCache>,
  category: Option<&str>,
  starred_only: bool,
) -> Result<()> {
  let ideas = match client.list_ideas(category, starred_only).await {
    Ok(output) => {
      if let Some(cache) = cache {
        if let Err(e) = cache.save(&output.ideas) {
          tracing::warn!(error = %e, "failed to update idea cache");
        }
      }
      output.ideas
    }
    Err(e) => {
      let cached = match cache.map(|c| c.load_filtered(category, starred_only)).transpose() {
        Ok(cached) => cached.flatten(),
        Err(cache_error) => {
          tracing::warn!(error = %cache_error, "idea cache unreadable");
          None
        }
      };
      let Some(cached) = cached else {
        return Err(e);
      };
      tracing::warn!(error = %e, "listing ideas from local cache");
      eprintln!("{} Server unavailable ({e}); showing cached ideas", "⚠".yellow());
      cached
    }
  };

  if ideas.is_empty() {
    match category {
      Some(category) => println!("No ideas found for category: {}", category.yellow()),
      None => println!("No ideas found."),
    }
    return Ok(());
  }

  for idea in &ideas {
    display_idea(idea);
  }
  Ok(())
}

/// Run the scheduled batch once against the configured backends
pub async fn run_batch(config_path: Option<&Path>) -> Result<()> {
  let config = Config::load(config_path)?;
  let repository = config.build_repository(Arc::new(SystemClock))?;

  let result = repository.run_scheduled_batch(config.schedule.retention_days).await;
  display_batch_result(&result);
  Ok(())
}

/// Sweep stale ideas once
pub async fn run_cleanup(config_path: Option<&Path>, days: Option<u32>) -> Result<()> {
  let config = Config::load(config_path)?;
  let days = days.unwrap_or(config.schedule.retention_days);
  if !(1..=MAX_RETENTION_DAYS).contains(&days) {
    anyhow::bail!("--days must be between 1 and {MAX_RETENTION_DAYS}");
  }

  let repository = config.build_repository(Arc::new(SystemClock))?;
  let count = repository.cleanup_stale(days).await?;

  println!("{} Removed {} stale ideas older than {} days", "✓".green(), count.to_string().cyan(), days);
  Ok(())
}
