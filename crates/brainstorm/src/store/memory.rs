//! In-process document store
//!
//! Keeps every collection in memory behind a single async mutex. Each commit
//! validates the whole batch before touching any data, so a failing write
//! leaves the store exactly as it was.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{Document, DocumentStore, FieldValue, Fields, Query, StoreError, Write, WriteBatch};
use crate::clock::Clock;

type Collection = BTreeMap<String, Fields>;

/// Memory-backed `DocumentStore` with clock-driven server timestamps
pub struct MemoryStore {
  collections: Mutex<BTreeMap<String, Collection>>,
  clock: Arc<dyn Clock>,
}

impl MemoryStore {
  pub fn new(clock: Arc<dyn Clock>) -> Self {
    Self { collections: Mutex::new(BTreeMap::new()), clock }
  }

  /// Number of documents currently in a collection
  pub async fn count(&self, collection: &str) -> usize {
    let collections = self.collections.lock().await;
    collections.get(collection).map(|docs| docs.len()).unwrap_or(0)
  }

  /// Insert a document verbatim, bypassing server timestamps.
  ///
  /// Used to seed fixtures with explicit creation times.
  pub async fn insert_raw(&self, collection: &str, id: &str, fields: Fields) {
    let mut collections = self.collections.lock().await;
    collections.entry(collection.to_string()).or_default().insert(id.to_string(), fields);
  }

  fn resolve_server_timestamps(&self, fields: Fields) -> Fields {
    let now = self.clock.now();
    fields
      .into_iter()
      .map(|(name, value)| match value {
        FieldValue::ServerTimestamp => (name, FieldValue::Timestamp(now)),
        other => (name, other),
      })
      .collect()
  }
}

/// Check that every write in the batch can be applied to the current state
fn validate_batch(
  collections: &BTreeMap<String, Collection>,
  writes: &[Write],
) -> Result<(), StoreError> {
  // Existence as changed by earlier writes in the same batch
  let mut pending: Vec<((&str, &str), bool)> = Vec::new();

  for write in writes {
    match write {
      Write::Create { collection, id, .. } => {
        let exists = pending_state(&pending, collection, id)
          .unwrap_or_else(|| document_exists(collections, collection, id));
        if exists {
          return Err(StoreError::AlreadyExists { collection: collection.clone(), id: id.clone() });
        }
        pending.push(((collection.as_str(), id.as_str()), true));
      }
      Write::Update { collection, id, .. } => {
        let exists = pending_state(&pending, collection, id)
          .unwrap_or_else(|| document_exists(collections, collection, id));
        if !exists {
          return Err(StoreError::NotFound { collection: collection.clone(), id: id.clone() });
        }
      }
      Write::Delete { collection, id } => pending.push(((collection.as_str(), id.as_str()), false)),
    }
  }

  Ok(())
}

/// Latest existence recorded for a document by earlier writes in the batch
fn pending_state(pending: &[((&str, &str), bool)], collection: &str, id: &str) -> Option<bool> {
  pending
    .iter()
    .rev()
    .find(|((c, i), _)| *c == collection && *i == id)
    .map(|(_, present)| *present)
}

fn document_exists(collections: &BTreeMap<String, Collection>, collection: &str, id: &str) -> bool {
  collections.get(collection).is_some_and(|docs| docs.contains_key(id))
}

#[async_trait]
impl DocumentStore for MemoryStore {
  async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
    let collections = self.collections.lock().await;
    Ok(
      collections
        .get(collection)
        .and_then(|docs| docs.get(id))
        .map(|fields| Document { id: id.to_string(), fields: fields.clone() }),
    )
  }

  async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
    let collections = self.collections.lock().await;
    let Some(docs) = collections.get(&query.collection) else {
      return Ok(Vec::new());
    };

    Ok(
      docs
        .iter()
        .filter(|(_, fields)| query.matches(fields))
        .map(|(id, fields)| Document { id: id.clone(), fields: fields.clone() })
        .collect(),
    )
  }

  async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
    let mut collections = self.collections.lock().await;
    validate_batch(&collections, batch.writes())?;

    for write in batch.into_writes() {
      match write {
        Write::Create { collection, id, fields } => {
          let fields = self.resolve_server_timestamps(fields);
          collections.entry(collection).or_default().insert(id, fields);
        }
        Write::Update { collection, id, fields } => {
          let fields = self.resolve_server_timestamps(fields);
          if let Some(existing) = collections.get_mut(&collection).and_then(|docs| docs.get_mut(&id)) {
            existing.extend(fields);
          }
        }
        Write::Delete { collection, id } => {
          if let Some(docs) = collections.get_mut(&collection) {
            docs.remove(&id);
          }
        }
      }
    }

    Ok(())
  }
}
