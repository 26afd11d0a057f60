//! Document store abstraction for idea records
//!
//! This module provides a small, schema-less document interface (named
//! collections, field filters, atomic write batches, server timestamps) so the
//! repository never depends on a particular backend. `MemoryStore` serves tests
//! and local runs; `FirestoreStore` talks to Firestore over its REST API.

pub mod firestore;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

// Values and Documents
// ====================

/// A single field value inside a document
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
  Null,
  Bool(bool),
  Integer(i64),
  String(String),
  Timestamp(DateTime<Utc>),
  /// Replaced by the store's own clock when the write commits
  ServerTimestamp,
}

impl FieldValue {
  pub fn as_str(&self) -> Option<&str> {
    match self {
      FieldValue::String(value) => Some(value),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      FieldValue::Bool(value) => Some(*value),
      _ => None,
    }
  }

  pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
    match self {
      FieldValue::Timestamp(value) => Some(*value),
      _ => None,
    }
  }

  pub fn is_null(&self) -> bool {
    matches!(self, FieldValue::Null)
  }

  /// Ordering between two concrete values of the same kind.
  ///
  /// Values of different kinds (and server-timestamp sentinels) are unordered,
  /// so range filters never match across kinds.
  pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
    match (self, other) {
      (FieldValue::Null, FieldValue::Null) => Some(Ordering::Equal),
      (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
      (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
      (FieldValue::String(a), FieldValue::String(b)) => Some(a.cmp(b)),
      (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Some(a.cmp(b)),
      _ => None,
    }
  }
}

impl From<bool> for FieldValue {
  fn from(value: bool) -> Self {
    FieldValue::Bool(value)
  }
}

impl From<i64> for FieldValue {
  fn from(value: i64) -> Self {
    FieldValue::Integer(value)
  }
}

impl From<&str> for FieldValue {
  fn from(value: &str) -> Self {
    FieldValue::String(value.to_string())
  }
}

impl From<String> for FieldValue {
  fn from(value: String) -> Self {
    FieldValue::String(value)
  }
}

impl From<DateTime<Utc>> for FieldValue {
  fn from(value: DateTime<Utc>) -> Self {
    FieldValue::Timestamp(value)
  }
}

/// Field map of a document, ordered for stable output
pub type Fields = BTreeMap<String, FieldValue>;

/// A stored document and its store-assigned id
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
  pub id: String,
  pub fields: Fields,
}

impl Document {
  pub fn get(&self, field: &str) -> Option<&FieldValue> {
    self.fields.get(field)
  }
}

// Queries
// =======

/// Comparison operators for field filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
  Equal,
  NotEqual,
  LessThan,
  LessThanOrEqual,
  GreaterThan,
  GreaterThanOrEqual,
}

impl Comparison {
  /// Whether `actual <op> expected` holds
  pub fn matches(self, actual: &FieldValue, expected: &FieldValue) -> bool {
    let Some(ordering) = actual.compare(expected) else {
      // Unordered kinds are only ever "not equal"
      return self == Comparison::NotEqual;
    };

    match self {
      Comparison::Equal => ordering == Ordering::Equal,
      Comparison::NotEqual => ordering != Ordering::Equal,
      Comparison::LessThan => ordering == Ordering::Less,
      Comparison::LessThanOrEqual => ordering != Ordering::Greater,
      Comparison::GreaterThan => ordering == Ordering::Greater,
      Comparison::GreaterThanOrEqual => ordering != Ordering::Less,
    }
  }
}

/// A single `field <op> value` condition
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
  pub field: String,
  pub op: Comparison,
  pub value: FieldValue,
}

/// Collection query; all filters are ANDed together
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
  pub collection: String,
  pub filters: Vec<FieldFilter>,
}

impl Query {
  pub fn new(collection: impl Into<String>) -> Self {
    Self { collection: collection.into(), filters: Vec::new() }
  }

  /// Add a filter (builder style)
  pub fn filter(mut self, field: &str, op: Comparison, value: impl Into<FieldValue>) -> Self {
    self.filters.push(FieldFilter { field: field.to_string(), op, value: value.into() });
    self
  }

  /// Whether a document satisfies every filter.
  ///
  /// A document missing a filtered field never matches, mirroring Firestore.
  pub fn matches(&self, fields: &Fields) -> bool {
    self.filters.iter().all(|filter| {
      fields.get(&filter.field).is_some_and(|actual| filter.op.matches(actual, &filter.value))
    })
  }
}

// Writes
// ======

/// One operation inside an atomic write batch
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
  /// Create a new document; fails if the id already exists
  Create { collection: String, id: String, fields: Fields },
  /// Merge fields into an existing document; fails if it does not exist
  Update { collection: String, id: String, fields: Fields },
  /// Delete a document; deleting a missing document is not an error
  Delete { collection: String, id: String },
}

/// Most writes a single Firestore commit accepts
pub const MAX_BATCH_WRITES: usize = 500;

/// Ordered set of writes that commit together or not at all
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
  writes: Vec<Write>,
}

impl WriteBatch {
  pub fn new() -> Self {
    Self::default()
  }

  /// Queue a document creation under a fresh id and return that id
  pub fn create(&mut self, collection: &str, fields: Fields) -> String {
    let id = new_document_id();
    self.writes.push(Write::Create { collection: collection.to_string(), id: id.clone(), fields });
    id
  }

  pub fn update(&mut self, collection: &str, id: &str, fields: Fields) {
    self.writes.push(Write::Update {
      collection: collection.to_string(),
      id: id.to_string(),
      fields,
    });
  }

  pub fn delete(&mut self, collection: &str, id: &str) {
    self.writes.push(Write::Delete { collection: collection.to_string(), id: id.to_string() });
  }

  pub fn len(&self) -> usize {
    self.writes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.writes.is_empty()
  }

  pub fn writes(&self) -> &[Write] {
    &self.writes
  }

  pub fn into_writes(self) -> Vec<Write> {
    self.writes
  }
}

/// Generate a store document id (20 alphanumeric characters, like Firestore's auto ids)
pub fn new_document_id() -> String {
  uuid::Uuid::new_v4().simple().to_string()[..20].to_string()
}

// Errors
// ======

/// Errors raised by document store backends
#[derive(Error, Debug)]
pub enum StoreError {
  #[error("document {collection}/{id} not found")]
  NotFound { collection: String, id: String },

  #[error("document {collection}/{id} already exists")]
  AlreadyExists { collection: String, id: String },

  #[error("malformed document {id}: {message}")]
  MalformedDocument { id: String, message: String },

  #[error("store request failed: {message}")]
  Backend { message: String },
}

impl StoreError {
  pub fn backend(message: impl Into<String>) -> Self {
    StoreError::Backend { message: message.into() }
  }

  pub fn malformed(id: &str, message: impl Into<String>) -> Self {
    StoreError::MalformedDocument { id: id.to_string(), message: message.into() }
  }
}

// Store Interface
// ===============

/// Document store interface used by the idea repository
#[async_trait]
pub trait DocumentStore: Send + Sync {
  /// Fetch a single document, `None` if it does not exist
  async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

  /// Run a filtered collection query
  async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

  /// Apply every write in the batch atomically
  async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

  /// Create a document under a fresh id and return it as stored
  async fn add(&self, collection: &str, fields: Fields) -> Result<Document, StoreError> {
    let mut batch = WriteBatch::new();
    let id = batch.create(collection, fields);
    self.commit(batch).await?;

    self.get(collection, &id).await?.ok_or_else(|| StoreError::NotFound {
      collection: collection.to_string(),
      id,
    })
  }

  /// Merge fields into an existing document
  async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
    let mut batch = WriteBatch::new();
    batch.update(collection, id, fields);
    self.commit(batch).await
  }
}
