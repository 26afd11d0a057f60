mod support;

use brainstorm::endpoints::{self, CallerId, ListIdeasInput, RequestIdeasInput, SetStarredInput};
use brainstorm::models::category::CUSTOM_FALLBACK_PROMPT;
use brainstorm::models::{Category, IdeaOrigin};
use brainstorm::repository::{IdeaFilter, MAX_RETENTION_DAYS};
use brainstorm::clock::ManualClock;
use brainstorm::store::{DocumentStore, FieldValue, MemoryStore, MAX_BATCH_WRITES};
use brainstorm::{BrainstormError, ErrorCode, IdeaRepository};
use chrono::Duration;
use serde_json::json;
use std::sync::Arc;
use support::{fixture, record_fields, start_time, FlakyStore, ScriptedGenerator, COLLECTION};

fn caller() -> CallerId {
  CallerId::new("user-1")
}

fn flaky_repository() -> (IdeaRepository, Arc<FlakyStore>) {
  let clock = Arc::new(ManualClock::new(start_time()));
  let store = Arc::new(FlakyStore::new(MemoryStore::new(clock.clone())));
  let repository = IdeaRepository::new(store.clone(), Arc::new(ScriptedGenerator::new()), clock);
  (repository, store)
}

// Batch
// =====

#[tokio::test]
async fn test_batch_isolates_failing_category() {
  let failing = Category::Ui.scheduled_prompt().unwrap();
  let f = fixture(ScriptedGenerator::new().failing_for(failing));

  let result = f.repository.run_scheduled_batch(7).await;

  assert_eq!(result.succeeded, vec![Category::Features, Category::Optimization, Category::Integration]);
  assert_eq!(result.failed, vec![Category::Ui]);
  assert_eq!(f.store.count(COLLECTION).await, 3);
  assert_eq!(f.generator.calls().len(), 4);
}

#[tokio::test]
async fn test_batch_records_are_scheduled_and_unstarred() {
  let f = fixture(ScriptedGenerator::new());
  f.repository.run_scheduled_batch(7).await;

  let records = f.repository.list_ideas(&IdeaFilter::default()).await.unwrap();
  assert_eq!(records.len(), 4);
  for record in records {
    assert!(!record.is_starred());
    assert!(!record.is_on_demand());
    assert_eq!(record.generated_at, start_time());
    assert_eq!(Some(record.prompt.as_str()), record.category.scheduled_prompt());
  }
}

#[tokio::test]
async fn test_batch_commit_failure_marks_all_failed() {
  let clock = Arc::new(ManualClock::new(start_time()));
  let store = Arc::new(FlakyStore::new(MemoryStore::new(clock.clone())));
  let repository = IdeaRepository::new(store.clone(), Arc::new(ScriptedGenerator::new()), clock);
  store.set_failing(true);

  let result = repository.run_scheduled_batch(7).await;

  assert!(result.succeeded.is_empty());
  assert_eq!(result.failed, Category::SCHEDULED.to_vec());
  assert_eq!(result.cleaned_up, 0);
  assert_eq!(store.count(COLLECTION).await, 0);
}

#[tokio::test]
async fn test_batch_sweeps_stale_records() {
  let f = fixture(ScriptedGenerator::new());
  let old = start_time() - Duration::days(8);
  f.store.insert_raw(COLLECTION, "stale", record_fields(Category::Ui, old, false)).await;
  f.store.insert_raw(COLLECTION, "kept", record_fields(Category::Ui, old, true)).await;

  let result = f.repository.run_scheduled_batch(7).await;

  assert_eq!(result.cleaned_up, 1);
  assert_eq!(f.store.count(COLLECTION).await, 5);
}

// Cleanup
// =======

#[tokio::test]
async fn test_cleanup_deletes_only_old_unstarred() {
  let f = fixture(ScriptedGenerator::new());
  let now = start_time();
  f.store.insert_raw(COLLECTION, "old-unstarred", record_fields(Category::Features, now - Duration::days(10), false)).await;
  f.store.insert_raw(COLLECTION, "old-starred", record_fields(Category::Features, now - Duration::days(10), true)).await;
  f.store.insert_raw(COLLECTION, "recent", record_fields(Category::Features, now - Duration::days(6), false)).await;
  f.store.insert_raw(COLLECTION, "boundary", record_fields(Category::Features, now - Duration::days(7), false)).await;

  let deleted = f.repository.cleanup_stale(7).await.unwrap();
  assert_eq!(deleted, 1);

  assert!(f.store.get(COLLECTION, "old-unstarred").await.unwrap().is_none());
  assert!(f.store.get(COLLECTION, "old-starred").await.unwrap().is_some());
  assert!(f.store.get(COLLECTION, "recent").await.unwrap().is_some());
  assert!(f.store.get(COLLECTION, "boundary").await.unwrap().is_some());

  assert_eq!(f.repository.cleanup_stale(7).await.unwrap(), 0);
}

#[tokio::test]
async fn test_cleanup_splits_large_sweeps_into_bounded_commits() {
  let (repository, store) = flaky_repository();
  let old = start_time() - Duration::days(30);
  for i in 0..1203 {
    store.inner().insert_raw(COLLECTION, &format!("stale-{i:04}"), record_fields(Category::Ui, old, false)).await;
  }
  store.inner().insert_raw(COLLECTION, "starred", record_fields(Category::Ui, old, true)).await;

  assert_eq!(repository.cleanup_stale(7).await.unwrap(), 1203);

  assert_eq!(store.commit_sizes(), vec![MAX_BATCH_WRITES, MAX_BATCH_WRITES, 203]);
  assert_eq!(store.count(COLLECTION).await, 1);
}

#[tokio::test]
async fn test_cleanup_commit_failure_midway_is_reported() {
  let (repository, store) = flaky_repository();
  let old = start_time() - Duration::days(30);
  for i in 0..(MAX_BATCH_WRITES + 10) {
    store.inner().insert_raw(COLLECTION, &format!("stale-{i:04}"), record_fields(Category::Ui, old, false)).await;
  }
  store.fail_commits_after(1);

  let err = repository.cleanup_stale(7).await.unwrap_err();
  assert_eq!(err.code(), ErrorCode::Internal);
  assert_eq!(store.count(COLLECTION).await, 10);
}

#[tokio::test]
async fn test_cleanup_rejects_retention_beyond_clock_range() {
  let (repository, store) = flaky_repository();
  store.set_failing(true);

  for days in [MAX_RETENTION_DAYS + 1, 200_000_000, u32::MAX] {
    let err = repository.cleanup_stale(days).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidArgument);
  }

  let result = repository.run_scheduled_batch(200_000_000).await;
  assert_eq!(result.cleaned_up, 0);
}

#[tokio::test]
async fn test_starred_records_survive_as_clock_advances() {
  let f = fixture(ScriptedGenerator::new());
  let record = f
    .repository
    .generate_for_category(Category::Features, "prompt", IdeaOrigin::Scheduled)
    .await
    .unwrap();
  f.repository.toggle_star(&record.id, true, "user-1").await.unwrap();

  f.clock.advance(Duration::days(30));
  assert_eq!(f.repository.cleanup_stale(7).await.unwrap(), 0);
  assert!(f.repository.get_idea(&record.id).await.is_ok());
}

// Starring
// ========

#[tokio::test]
async fn test_star_then_unstar_clears_metadata() {
  let f = fixture(ScriptedGenerator::new());
  let record = f
    .repository
    .generate_for_category(Category::Ui, "prompt", IdeaOrigin::Scheduled)
    .await
    .unwrap();

  f.clock.advance(Duration::minutes(5));
  assert!(f.repository.toggle_star(&record.id, true, "user-1").await.unwrap());
  let starred = f.repository.get_idea(&record.id).await.unwrap();
  let mark = starred.star.clone().unwrap();
  assert_eq!(mark.starred_by, "user-1");
  assert_eq!(mark.starred_at, start_time() + Duration::minutes(5));

  assert!(!f.repository.toggle_star(&record.id, false, "user-1").await.unwrap());
  let doc = f.store.get(COLLECTION, &record.id).await.unwrap().unwrap();
  assert_eq!(doc.get("starred"), Some(&FieldValue::Bool(false)));
  assert_eq!(doc.get("starred_at"), Some(&FieldValue::Null));
  assert_eq!(doc.get("starred_by"), Some(&FieldValue::Null));
}

#[tokio::test]
async fn test_restar_keeps_original_mark() {
  let f = fixture(ScriptedGenerator::new());
  let record = f
    .repository
    .generate_for_category(Category::Ui, "prompt", IdeaOrigin::Scheduled)
    .await
    .unwrap();

  f.repository.toggle_star(&record.id, true, "user-1").await.unwrap();
  f.clock.advance(Duration::hours(1));
  f.repository.toggle_star(&record.id, true, "user-2").await.unwrap();

  let mark = f.repository.get_idea(&record.id).await.unwrap().star.unwrap();
  assert_eq!(mark.starred_by, "user-1");
  assert_eq!(mark.starred_at, start_time());
}

// Endpoints
// =========

#[tokio::test]
async fn test_unauthenticated_request_creates_nothing() {
  let f = fixture(ScriptedGenerator::new());

  for category in Category::ALL {
    let input = RequestIdeasInput { category: Some(category.as_str().to_string()), custom_prompt: None };
    let err = endpoints::request_ideas(&f.repository, None, input).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthenticated);
  }

  assert_eq!(f.store.count(COLLECTION).await, 0);
  assert!(f.generator.calls().is_empty());
}

#[tokio::test]
async fn test_request_ideas_records_caller() {
  let f = fixture(ScriptedGenerator::new());
  let input = RequestIdeasInput { category: Some("integration".to_string()), custom_prompt: None };

  let output = endpoints::request_ideas(&f.repository, Some(&caller()), input).await.unwrap();
  assert!(output.success);
  assert_eq!(output.category, Category::Integration);

  let record = f.repository.get_idea(&output.id).await.unwrap();
  assert_eq!(record.user_id(), Some("user-1"));
  assert_eq!(record.ideas, output.ideas);
}

#[tokio::test]
async fn test_request_ideas_category_fallbacks() {
  let f = fixture(ScriptedGenerator::new());

  let output = endpoints::request_ideas(&f.repository, Some(&caller()), RequestIdeasInput::default())
    .await
    .unwrap();
  assert_eq!(output.category, Category::Features);

  let input = RequestIdeasInput { category: Some("marketing".to_string()), custom_prompt: None };
  let output = endpoints::request_ideas(&f.repository, Some(&caller()), input).await.unwrap();
  assert_eq!(output.category, Category::Features);

  let input = RequestIdeasInput { category: Some("custom".to_string()), custom_prompt: Some("  ".to_string()) };
  endpoints::request_ideas(&f.repository, Some(&caller()), input).await.unwrap();
  assert_eq!(f.generator.calls().last().map(String::as_str), Some(CUSTOM_FALLBACK_PROMPT));
}

#[tokio::test]
async fn test_request_ideas_generation_failure_is_internal() {
  let prompt = Category::Optimization.on_demand_prompt(None);
  let f = fixture(ScriptedGenerator::new().failing_for(&prompt));
  let input = RequestIdeasInput { category: Some("optimization".to_string()), custom_prompt: None };

  let err = endpoints::request_ideas(&f.repository, Some(&caller()), input).await.unwrap_err();
  assert_eq!(err.code(), ErrorCode::Internal);
  assert!(err.to_string().contains("model overloaded"));
  assert_eq!(f.store.count(COLLECTION).await, 0);
}

#[tokio::test]
async fn test_set_starred_requires_idea_id_before_store_access() {
  let (repository, store) = flaky_repository();
  store.set_failing(true);

  for idea_id in [None, Some("".to_string()), Some("   ".to_string())] {
    let input = SetStarredInput { idea_id, starred: Some(json!(true)) };
    let err = endpoints::set_starred(&repository, Some(&caller()), input).await.unwrap_err();
    assert!(matches!(err, BrainstormError::InvalidArgument { .. }));
  }
}

#[tokio::test]
async fn test_set_starred_rejects_path_like_ids_before_store_access() {
  let (repository, store) = flaky_repository();
  store.set_failing(true);

  for idea_id in ["../users/alice", "a/b", "..", "__name__"] {
    let input = SetStarredInput { idea_id: Some(idea_id.to_string()), starred: Some(json!(true)) };
    let err = endpoints::set_starred(&repository, Some(&caller()), input).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidArgument, "{idea_id}");

    let err = repository.get_idea(idea_id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidArgument, "{idea_id}");
  }
}

#[tokio::test]
async fn test_set_starred_and_list_require_caller() {
  let (repository, store) = flaky_repository();
  store.set_failing(true);

  let input = SetStarredInput { idea_id: Some("abc".to_string()), starred: Some(json!(true)) };
  let err = endpoints::set_starred(&repository, None, input).await.unwrap_err();
  assert_eq!(err.code(), ErrorCode::Unauthenticated);

  let err = endpoints::list_ideas(&repository, None, ListIdeasInput::default()).await.unwrap_err();
  assert_eq!(err.code(), ErrorCode::Unauthenticated);
}

#[tokio::test]
async fn test_set_starred_only_literal_true_stars() {
  let f = fixture(ScriptedGenerator::new());
  let record = f
    .repository
    .generate_for_category(Category::Ui, "prompt", IdeaOrigin::Scheduled)
    .await
    .unwrap();

  for value in [json!("true"), json!(1), json!(null)] {
    let input = SetStarredInput { idea_id: Some(record.id.clone()), starred: Some(value) };
    let output = endpoints::set_starred(&f.repository, Some(&caller()), input).await.unwrap();
    assert!(!output.starred);
  }

  let input = SetStarredInput { idea_id: Some(record.id.clone()), starred: Some(json!(true)) };
  let output = endpoints::set_starred(&f.repository, Some(&caller()), input).await.unwrap();
  assert!(output.starred);
}

#[tokio::test]
async fn test_set_starred_missing_idea_is_not_found() {
  let f = fixture(ScriptedGenerator::new());
  let input = SetStarredInput { idea_id: Some("nope".to_string()), starred: Some(json!(true)) };

  let err = endpoints::set_starred(&f.repository, Some(&caller()), input).await.unwrap_err();
  assert_eq!(err.code(), ErrorCode::NotFound);
  assert_eq!(f.store.count(COLLECTION).await, 0);
}

#[tokio::test]
async fn test_list_ideas_filters_and_orders() {
  let f = fixture(ScriptedGenerator::new());
  let now = start_time();
  f.store.insert_raw(COLLECTION, "a", record_fields(Category::Ui, now - Duration::days(2), false)).await;
  f.store.insert_raw(COLLECTION, "b", record_fields(Category::Ui, now - Duration::days(1), true)).await;
  f.store.insert_raw(COLLECTION, "c", record_fields(Category::Features, now, false)).await;

  let all = endpoints::list_ideas(&f.repository, Some(&caller()), ListIdeasInput::default()).await.unwrap();
  let ids: Vec<_> = all.ideas.iter().map(|idea| idea.id.as_str()).collect();
  assert_eq!(ids, vec!["c", "b", "a"]);

  let input = ListIdeasInput { category: Some("ui".to_string()), starred_only: Some(true) };
  let starred = endpoints::list_ideas(&f.repository, Some(&caller()), input).await.unwrap();
  assert_eq!(starred.ideas.len(), 1);
  assert_eq!(starred.ideas[0].starred_by.as_deref(), Some("seed-user"));

  let input = ListIdeasInput { category: Some("bogus".to_string()), starred_only: None };
  let err = endpoints::list_ideas(&f.repository, Some(&caller()), input).await.unwrap_err();
  assert_eq!(err.code(), ErrorCode::InvalidArgument);
}
