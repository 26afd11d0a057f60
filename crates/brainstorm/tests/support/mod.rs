//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use brainstorm::clock::ManualClock;
use brainstorm::generation::{GenerationError, TextGenerator};
use brainstorm::models::{fields, Category};
use brainstorm::store::{Document, DocumentStore, FieldValue, Fields, MemoryStore, Query, StoreError, WriteBatch};
use brainstorm::IdeaRepository;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const COLLECTION: &str = "brainstorm_cache";

/// Generator that echoes the prompt, failing for configured prompts
#[derive(Default)]
pub struct ScriptedGenerator {
  failing: Vec<String>,
  calls: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Fail whenever the prompt equals `prompt`
  pub fn failing_for(mut self, prompt: &str) -> Self {
    self.failing.push(prompt.to_string());
    self
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
  async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
    self.calls.lock().unwrap().push(prompt.to_string());
    if self.failing.iter().any(|p| p == prompt) {
      return Err(GenerationError::Http { status: 503, message: "model overloaded".to_string() });
    }
    Ok(format!("1. Idea for: {prompt}"))
  }
}

/// Memory store that can be switched to reject every operation. Records
/// the size of every commit it forwards.
pub struct FlakyStore {
  inner: MemoryStore,
  failing: AtomicBool,
  commits: Mutex<Vec<usize>>,
  fail_after_commits: AtomicUsize,
}

impl FlakyStore {
  pub fn new(inner: MemoryStore) -> Self {
    Self {
      inner,
      failing: AtomicBool::new(false),
      commits: Mutex::new(Vec::new()),
      fail_after_commits: AtomicUsize::new(usize::MAX),
    }
  }

  pub fn inner(&self) -> &MemoryStore {
    &self.inner
  }

  /// Write counts of the commits that went through
  pub fn commit_sizes(&self) -> Vec<usize> {
    self.commits.lock().unwrap().clone()
  }

  /// Reject commits once `count` of them have succeeded
  pub fn fail_commits_after(&self, count: usize) {
    self.fail_after_commits.store(count, Ordering::SeqCst);
  }

  pub fn set_failing(&self, failing: bool) {
    self.failing.store(failing, Ordering::SeqCst);
  }

  fn check(&self) -> Result<(), StoreError> {
    if self.failing.load(Ordering::SeqCst) {
      return Err(StoreError::backend("store unavailable"));
    }
    Ok(())
  }

  pub async fn count(&self, collection: &str) -> usize {
    self.inner.count(collection).await
  }
}

#[async_trait]
impl DocumentStore for FlakyStore {
  async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
    self.check()?;
    self.inner.get(collection, id).await
  }

  async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
    self.check()?;
    self.inner.query(query).await
  }

  async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
    self.check()?;
    if self.commit_sizes().len() >= self.fail_after_commits.load(Ordering::SeqCst) {
      return Err(StoreError::backend("commit rejected"));
    }
    let size = batch.len();
    self.inner.commit(batch).await?;
    self.commits.lock().unwrap().push(size);
    Ok(())
  }
}

pub struct Fixture {
  pub repository: Arc<IdeaRepository>,
  pub store: Arc<MemoryStore>,
  pub clock: Arc<ManualClock>,
  pub generator: Arc<ScriptedGenerator>,
}

pub fn start_time() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 6, 15, 6, 0, 0).unwrap()
}

pub fn fixture(generator: ScriptedGenerator) -> Fixture {
  let clock = Arc::new(ManualClock::new(start_time()));
  let store = Arc::new(MemoryStore::new(clock.clone()));
  let generator = Arc::new(generator);
  let repository = Arc::new(IdeaRepository::new(store.clone(), generator.clone(), clock.clone()));
  Fixture { repository, store, clock, generator }
}

/// Raw record fields with an explicit creation time
pub fn record_fields(category: Category, generated_at: DateTime<Utc>, starred: bool) -> Fields {
  let mut doc = Fields::new();
  doc.insert(fields::CATEGORY.into(), category.as_str().into());
  doc.insert(fields::PROMPT.into(), "seeded prompt".into());
  doc.insert(fields::IDEAS.into(), "seeded ideas".into());
  doc.insert(fields::GENERATED_AT.into(), FieldValue::Timestamp(generated_at));
  doc.insert(fields::STATUS.into(), "active".into());
  doc.insert(fields::STARRED.into(), starred.into());
  if starred {
    doc.insert(fields::STARRED_AT.into(), FieldValue::Timestamp(generated_at));
    doc.insert(fields::STARRED_BY.into(), "seed-user".into());
  }
  doc
}
