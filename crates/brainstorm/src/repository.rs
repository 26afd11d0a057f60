//! Idea record repository
//!
//! Owns every read and write of idea records plus the call out to the
//! generation service. Batch generation isolates per-category failures;
//! on-demand generation surfaces the first failure to the caller.

use chrono::TimeDelta;
use serde::Serialize;
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{BrainstormError, Result};
use crate::generation::TextGenerator;
use crate::models::{fields, Category, IdeaOrigin, IdeaRecord};
use crate::store::{Comparison, DocumentStore, Query, WriteBatch, MAX_BATCH_WRITES};

/// Collection holding idea records
pub const DEFAULT_COLLECTION: &str = "brainstorm_cache";

/// Age after which unstarred records are swept
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Longest accepted retention window
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Reject ids that would escape or rewrite a document path.
///
/// Follows Firestore's document id rules: non-empty, at most 1500 bytes, no
/// `/`, not `.` or `..`, and not of the reserved `__name__` form.
pub fn validate_idea_id(id: &str) -> Result<()> {
  let reserved = id.len() >= 4 && id.starts_with("__") && id.ends_with("__");
  let invalid = id.is_empty()
    || id.len() > 1500
    || id == "."
    || id == ".."
    || reserved
    || id.chars().any(|c| c == '/' || c.is_control());

  if invalid {
    return Err(BrainstormError::invalid_argument(format!("invalid idea id: {id:?}")));
  }
  Ok(())
}

/// Outcome of one scheduled batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
  pub succeeded: Vec<Category>,
  pub failed: Vec<Category>,
  pub cleaned_up: usize,
}

/// Equality filters for listing records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdeaFilter {
  pub category: Option<Category>,
  pub starred_only: bool,
}

/// Reads and writes idea records and drives the generation service
pub struct IdeaRepository {
  store: Arc<dyn DocumentStore>,
  generator: Arc<dyn TextGenerator>,
  clock: Arc<dyn Clock>,
  collection: String,
}

impl IdeaRepository {
  pub fn new(
    store: Arc<dyn DocumentStore>,
    generator: Arc<dyn TextGenerator>,
    clock: Arc<dyn Clock>,
  ) -> Self {
    Self { store, generator, clock, collection: DEFAULT_COLLECTION.to_string() }
  }

  /// Use a different collection name
  pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
    self.collection = collection.into();
    self
  }

  pub fn collection(&self) -> &str {
    &self.collection
  }

  /// Call the generation service for one category
  async fn generate_text(&self, category: Category, prompt: &str) -> Result<String> {
    if prompt.trim().is_empty() {
      return Err(BrainstormError::invalid_argument("prompt must not be empty"));
    }

    self
      .generator
      .generate(prompt)
      .await
      .map_err(|source| BrainstormError::GenerationFailed { category, source })
  }

  /// Generate ideas for a category and persist them as a new record
  pub async fn generate_for_category(
    &self,
    category: Category,
    prompt: &str,
    origin: IdeaOrigin,
  ) -> Result<IdeaRecord> {
    let ideas = self.generate_text(category, prompt).await?;

    let fields = IdeaRecord::new_fields(category, prompt, &ideas, &origin);
    let doc = self.store.add(&self.collection, fields).await?;
    let record = IdeaRecord::try_from(doc)?;

    tracing::info!(category = %category, id = %record.id, on_demand = record.is_on_demand(), "generated ideas");
    Ok(record)
  }

  /// Generate one record per scheduled category, commit them together, then
  /// sweep stale records. Never fails; problems are logged and reported in
  /// the result.
  pub async fn run_scheduled_batch(&self, retention_days: u32) -> BatchResult {
    tracing::info!("starting scheduled brainstorm batch");

    let mut result = BatchResult::default();
    let mut batch = WriteBatch::new();
    let mut queued = Vec::new();

    for category in Category::SCHEDULED {
      let Some(prompt) = category.scheduled_prompt() else {
        continue;
      };

      match self.generate_text(category, prompt).await {
        Ok(ideas) => {
          let fields = IdeaRecord::new_fields(category, prompt, &ideas, &IdeaOrigin::Scheduled);
          batch.create(&self.collection, fields);
          queued.push(category);
          tracing::info!(category = %category, "generated scheduled ideas");
        }
        Err(e) => {
          tracing::error!(category = %category, error = %e, "scheduled generation failed");
          result.failed.push(category);
        }
      }
    }

    if !batch.is_empty() {
      match self.store.commit(batch).await {
        Ok(()) => result.succeeded = queued,
        Err(e) => {
          tracing::error!(error = %e, categories = queued.len(), "failed to commit scheduled ideas");
          result.failed.extend(queued);
        }
      }
    }

    result.cleaned_up = match self.cleanup_stale(retention_days).await {
      Ok(count) => count,
      Err(e) => {
        tracing::error!(error = %e, "stale idea cleanup failed");
        0
      }
    };

    tracing::info!(
      succeeded = result.succeeded.len(),
      failed = result.failed.len(),
      cleaned_up = result.cleaned_up,
      "scheduled brainstorm batch complete"
    );
    result
  }

  /// Delete every unstarred record generated before `now - retention_days`.
  ///
  /// Returns the number of records deleted.
  pub async fn cleanup_stale(&self, retention_days: u32) -> Result<usize> {
    if retention_days > MAX_RETENTION_DAYS {
      return Err(BrainstormError::invalid_argument(format!(
        "retention of {retention_days} days exceeds the {MAX_RETENTION_DAYS} day maximum"
      )));
    }
    let cutoff = TimeDelta::try_days(i64::from(retention_days))
      .and_then(|window| self.clock.now().checked_sub_signed(window))
      .ok_or_else(|| BrainstormError::invalid_argument("retention window is out of range"))?;

    let query = Query::new(self.collection.as_str())
      .filter(fields::GENERATED_AT, Comparison::LessThan, cutoff)
      .filter(fields::STARRED, Comparison::Equal, false);
    let stale = self.store.query(&query).await?;

    if stale.is_empty() {
      tracing::debug!(%cutoff, "no stale ideas to clean up");
      return Ok(0);
    }

    let mut deleted = 0;
    for chunk in stale.chunks(MAX_BATCH_WRITES) {
      let mut batch = WriteBatch::new();
      for doc in chunk {
        batch.delete(&self.collection, &doc.id);
      }
      if let Err(e) = self.store.commit(batch).await {
        tracing::error!(deleted, remaining = stale.len() - deleted, "stale idea cleanup stopped early");
        return Err(e.into());
      }
      deleted += chunk.len();
    }

    tracing::info!(count = deleted, %cutoff, "cleaned up stale ideas");
    Ok(deleted)
  }

  /// Star or unstar a record on behalf of a caller.
  ///
  /// Setting the value the record already has is a no-op and keeps the
  /// original star metadata. Returns the resulting starred state.
  pub async fn toggle_star(&self, id: &str, starred: bool, caller: &str) -> Result<bool> {
    let current = self.get_idea(id).await?;

    if current.is_starred() == starred {
      tracing::debug!(id, starred, "star state unchanged");
      return Ok(starred);
    }

    self.store.update(&self.collection, id, IdeaRecord::star_fields(starred, caller)).await?;

    tracing::info!(id, starred, caller, "{} idea", if starred { "starred" } else { "unstarred" });
    Ok(starred)
  }

  /// Load a single record
  pub async fn get_idea(&self, id: &str) -> Result<IdeaRecord> {
    validate_idea_id(id)?;
    let doc = self
      .store
      .get(&self.collection, id)
      .await?
      .ok_or_else(|| BrainstormError::NotFound { id: id.to_string() })?;

    Ok(IdeaRecord::try_from(doc)?)
  }

  /// List records matching the filter, newest first.
  ///
  /// Documents that do not decode as idea records are skipped.
  pub async fn list_ideas(&self, filter: &IdeaFilter) -> Result<Vec<IdeaRecord>> {
    let mut query = Query::new(self.collection.as_str());
    if let Some(category) = filter.category {
      query = query.filter(fields::CATEGORY, Comparison::Equal, category.as_str());
    }
    if filter.starred_only {
      query = query.filter(fields::STARRED, Comparison::Equal, true);
    }

    let mut records: Vec<IdeaRecord> = self
      .store
      .query(&query)
      .await?
      .into_iter()
      .filter_map(|doc| match IdeaRecord::try_from(doc) {
        Ok(record) => Some(record),
        Err(e) => {
          tracing::warn!(error = %e, "skipping malformed idea document");
          None
        }
      })
      .collect();

    records.sort_by(|a, b| b.generated_at.cmp(&a.generated_at).then_with(|| a.id.cmp(&b.id)));
    Ok(records)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::clock::ManualClock;
  use crate::generation::{GenerationError, MockTextGenerator};
  use crate::store::MemoryStore;
  use chrono::{TimeZone, Utc};
  use mockall::predicate::*;

  fn repository(generator: MockTextGenerator) -> (IdeaRepository, Arc<MemoryStore>) {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 6, 0, 0).unwrap()));
    let store = Arc::new(MemoryStore::new(clock.clone()));
    let repo = IdeaRepository::new(store.clone(), Arc::new(generator), clock);
    (repo, store)
  }

  #[tokio::test]
  async fn test_generate_sends_prompt_and_persists_record() {
    let mut generator = MockTextGenerator::new();
    generator
      .expect_generate()
      .with(eq("Ideas please"))
      .times(1)
      .returning(|_| Ok("1. Something".to_string()));
    let (repo, store) = repository(generator);

    let record = repo
      .generate_for_category(Category::Custom, "Ideas please", IdeaOrigin::Scheduled)
      .await
      .unwrap();

    assert_eq!(record.ideas, "1. Something");
    assert_eq!(record.prompt, "Ideas please");
    assert_eq!(store.count(DEFAULT_COLLECTION).await, 1);
  }

  #[tokio::test]
  async fn test_generation_failure_writes_nothing() {
    let mut generator = MockTextGenerator::new();
    generator.expect_generate().times(1).returning(|_| Err(GenerationError::EmptyResponse));
    let (repo, store) = repository(generator);

    let err = repo
      .generate_for_category(Category::Ui, "prompt", IdeaOrigin::Scheduled)
      .await
      .unwrap_err();

    assert!(matches!(err, BrainstormError::GenerationFailed { category: Category::Ui, .. }));
    assert_eq!(store.count(DEFAULT_COLLECTION).await, 0);
  }

  #[tokio::test]
  async fn test_blank_prompt_is_rejected_before_generation() {
    let mut generator = MockTextGenerator::new();
    generator.expect_generate().times(0);
    let (repo, _) = repository(generator);

    let err = repo
      .generate_for_category(Category::Custom, "   ", IdeaOrigin::Scheduled)
      .await
      .unwrap_err();

    assert!(matches!(err, BrainstormError::InvalidArgument { .. }));
  }

  #[tokio::test]
  async fn test_batch_uses_scheduled_prompts_in_order() {
    let mut generator = MockTextGenerator::new();
    let mut sequence = mockall::Sequence::new();
    for category in Category::SCHEDULED {
      let prompt = category.scheduled_prompt().unwrap();
      generator
        .expect_generate()
        .with(eq(prompt))
        .times(1)
        .in_sequence(&mut sequence)
        .returning(move |_| Ok(format!("{category} ideas")));
    }
    let (repo, store) = repository(generator);

    let result = repo.run_scheduled_batch(DEFAULT_RETENTION_DAYS).await;

    assert_eq!(result.succeeded, Category::SCHEDULED.to_vec());
    assert!(result.failed.is_empty());
    assert_eq!(result.cleaned_up, 0);
    assert_eq!(store.count(DEFAULT_COLLECTION).await, 4);
  }

  #[test]
  fn test_validate_idea_id() {
    for id in ["abc123", "a b?c#d", "日本", "__x"] {
      assert!(validate_idea_id(id).is_ok(), "{id}");
    }
    let long = "x".repeat(1501);
    for id in ["", ".", "..", "a/b", "../users/alice", "__name__", "tab\tid", long.as_str()] {
      assert!(validate_idea_id(id).is_err(), "{id}");
    }
  }

  #[tokio::test]
  async fn test_oversized_retention_is_rejected_without_store_access() {
    let (repo, store) = repository(MockTextGenerator::new());
    store.insert_raw(DEFAULT_COLLECTION, "kept", Default::default()).await;

    for days in [MAX_RETENTION_DAYS + 1, 200_000_000, u32::MAX] {
      let err = repo.cleanup_stale(days).await.unwrap_err();
      assert!(matches!(err, BrainstormError::InvalidArgument { .. }), "{days}");
    }
    assert_eq!(repo.cleanup_stale(MAX_RETENTION_DAYS).await.unwrap(), 0);
    assert_eq!(store.count(DEFAULT_COLLECTION).await, 1);
  }

  #[tokio::test]
  async fn test_toggle_star_on_missing_idea_is_not_found() {
    let (repo, _) = repository(MockTextGenerator::new());
    let err = repo.toggle_star("missing", true, "user1").await.unwrap_err();
    assert!(matches!(err, BrainstormError::NotFound { id } if id == "missing"));
  }
}
