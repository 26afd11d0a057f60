//! Firestore REST adapter
//!
//! Speaks the Firestore v1 REST API: single-document reads, structured queries
//! and atomic `:commit` batches. Server timestamps are expressed as
//! `REQUEST_TIME` field transforms so the backend, not the caller, stamps them.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::{
  Comparison, Document, DocumentStore, FieldFilter, FieldValue, Fields, Query, StoreError, Write,
  WriteBatch,
};

/// Connection settings for a Firestore database
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
  /// API root, e.g. "https://firestore.googleapis.com" or an emulator address
  pub base_url: String,
  pub project_id: String,
  pub database: String,
  /// OAuth access token; not needed against the emulator
  pub access_token: Option<String>,
  pub timeout: Duration,
}

/// `DocumentStore` backed by Firestore
#[derive(Debug, Clone)]
pub struct FirestoreStore {
  client: reqwest::Client,
  base_url: String,
  /// "projects/{project}/databases/{database}/documents"
  documents_path: String,
}

impl FirestoreStore {
  pub fn new(config: &FirestoreConfig) -> Result<Self, StoreError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(token) = &config.access_token {
      let auth_value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| StoreError::backend("invalid Firestore access token format"))?;
      headers.insert(AUTHORIZATION, auth_value);
    }

    let client = reqwest::Client::builder()
      .timeout(config.timeout)
      .default_headers(headers)
      .build()
      .map_err(|e| StoreError::backend(format!("failed to create HTTP client: {e}")))?;

    Ok(Self {
      client,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      documents_path: format!(
        "projects/{}/databases/{}/documents",
        config.project_id, config.database
      ),
    })
  }

  fn document_name(&self, collection: &str, id: &str) -> String {
    format!("{}/{collection}/{id}", self.documents_path)
  }

  /// Document URL with each path segment percent-encoded
  fn document_url(&self, collection: &str, id: &str) -> Result<Url, StoreError> {
    let mut url = Url::parse(&self.base_url)
      .map_err(|e| StoreError::backend(format!("invalid Firestore base URL: {e}")))?;
    url
      .path_segments_mut()
      .map_err(|_| StoreError::backend("Firestore base URL cannot carry a path"))?
      .pop_if_empty()
      .push("v1")
      .extend(self.documents_path.split('/'))
      .push(collection)
      .push(id);
    Ok(url)
  }

  fn documents_url(&self, action: &str) -> String {
    format!("{}/v1/{}:{action}", self.base_url, self.documents_path)
  }

  fn encode_write(&self, write: &Write) -> Value {
    match write {
      Write::Create { collection, id, fields } => {
        let mut encoded = encode_upsert(&self.document_name(collection, id), fields, false);
        encoded.insert("currentDocument".into(), json!({ "exists": false }));
        Value::Object(encoded)
      }
      Write::Update { collection, id, fields } => {
        let mut encoded = encode_upsert(&self.document_name(collection, id), fields, true);
        encoded.insert("currentDocument".into(), json!({ "exists": true }));
        Value::Object(encoded)
      }
      Write::Delete { collection, id } => json!({ "delete": self.document_name(collection, id) }),
    }
  }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
  async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
    let response = self
      .client
      .get(self.document_url(collection, id)?)
      .send()
      .await
      .map_err(|e| StoreError::backend(format!("failed to fetch document: {e}")))?;

    if response.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }

    let body = read_success_body(response).await?;
    decode_document(&body).map(Some)
  }

  async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
    let request = json!({ "structuredQuery": encode_structured_query(query) });

    let response = self
      .client
      .post(self.documents_url("runQuery"))
      .json(&request)
      .send()
      .await
      .map_err(|e| StoreError::backend(format!("failed to run query: {e}")))?;

    let body = read_success_body(response).await?;
    let rows = body
      .as_array()
      .ok_or_else(|| StoreError::backend("runQuery response was not an array"))?;

    // Rows without a document only carry read metadata
    rows.iter().filter_map(|row| row.get("document")).map(decode_document).collect()
  }

  async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
    if batch.is_empty() {
      return Ok(());
    }

    let writes: Vec<Value> = batch.writes().iter().map(|write| self.encode_write(write)).collect();

    let response = self
      .client
      .post(self.documents_url("commit"))
      .json(&json!({ "writes": writes }))
      .send()
      .await
      .map_err(|e| StoreError::backend(format!("failed to commit writes: {e}")))?;

    match response.status() {
      status if status.is_success() => Ok(()),
      StatusCode::NOT_FOUND => Err(first_precondition_failure(&batch, false)),
      StatusCode::CONFLICT => Err(first_precondition_failure(&batch, true)),
      _ => read_success_body(response).await.map(|_| ()),
    }
  }
}

/// Attribute a failed commit precondition to the first write that carries one
fn first_precondition_failure(batch: &WriteBatch, creating: bool) -> StoreError {
  let culprit = batch.writes().iter().find_map(|write| match (write, creating) {
    (Write::Create { collection, id, .. }, true) | (Write::Update { collection, id, .. }, false) => {
      Some((collection.clone(), id.clone()))
    }
    _ => None,
  });

  match (culprit, creating) {
    (Some((collection, id)), true) => StoreError::AlreadyExists { collection, id },
    (Some((collection, id)), false) => StoreError::NotFound { collection, id },
    (None, _) => StoreError::backend("commit precondition failed"),
  }
}

async fn read_success_body(response: reqwest::Response) -> Result<Value, StoreError> {
  let status = response.status();
  let text = response
    .text()
    .await
    .map_err(|e| StoreError::backend(format!("failed to read response body: {e}")))?;

  if !status.is_success() {
    let message = serde_json::from_str::<Value>(&text)
      .ok()
      .and_then(|body| body.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
      .unwrap_or(text);
    return Err(StoreError::backend(format!("Firestore returned {status}: {message}")));
  }

  serde_json::from_str(&text)
    .map_err(|e| StoreError::backend(format!("invalid JSON from Firestore: {e}")))
}

// Encoding
// ========

fn encode_upsert(name: &str, fields: &Fields, with_mask: bool) -> Map<String, Value> {
  let mut values = Map::new();
  let mut transforms = Vec::new();

  for (field, value) in fields {
    match value {
      FieldValue::ServerTimestamp => transforms.push(json!({
        "fieldPath": field,
        "setToServerValue": "REQUEST_TIME",
      })),
      concrete => {
        values.insert(field.clone(), encode_value(concrete));
      }
    }
  }

  let mut write = Map::new();
  if with_mask {
    let paths: Vec<&String> = values.keys().collect();
    write.insert("updateMask".into(), json!({ "fieldPaths": paths }));
  }
  write.insert("update".into(), json!({ "name": name, "fields": values }));
  if !transforms.is_empty() {
    write.insert("updateTransforms".into(), Value::Array(transforms));
  }
  write
}

/// Encode a concrete value in Firestore's typed JSON form
pub fn encode_value(value: &FieldValue) -> Value {
  match value {
    FieldValue::Null | FieldValue::ServerTimestamp => json!({ "nullValue": null }),
    FieldValue::Bool(b) => json!({ "booleanValue": b }),
    // int64 travels as a decimal string
    FieldValue::Integer(i) => json!({ "integerValue": i.to_string() }),
    FieldValue::String(s) => json!({ "stringValue": s }),
    FieldValue::Timestamp(t) => {
      json!({ "timestampValue": t.to_rfc3339_opts(SecondsFormat::Micros, true) })
    }
  }
}

fn encode_structured_query(query: &Query) -> Value {
  let mut structured = Map::new();
  structured.insert("from".into(), json!([{ "collectionId": query.collection }]));

  let mut filters: Vec<Value> = query.filters.iter().map(encode_filter).collect();
  match filters.len() {
    0 => {}
    1 => {
      structured.insert("where".into(), filters.remove(0));
    }
    _ => {
      structured.insert(
        "where".into(),
        json!({ "compositeFilter": { "op": "AND", "filters": filters } }),
      );
    }
  }

  Value::Object(structured)
}

fn encode_filter(filter: &FieldFilter) -> Value {
  let field = json!({ "fieldPath": filter.field });

  // Null equality is a unary filter in Firestore
  if filter.value.is_null() {
    match filter.op {
      Comparison::Equal => return json!({ "unaryFilter": { "op": "IS_NULL", "field": field } }),
      Comparison::NotEqual => {
        return json!({ "unaryFilter": { "op": "IS_NOT_NULL", "field": field } })
      }
      _ => {}
    }
  }

  let op = match filter.op {
    Comparison::Equal => "EQUAL",
    Comparison::NotEqual => "NOT_EQUAL",
    Comparison::LessThan => "LESS_THAN",
    Comparison::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
    Comparison::GreaterThan => "GREATER_THAN",
    Comparison::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
  };

  json!({ "fieldFilter": { "field": field, "op": op, "value": encode_value(&filter.value) } })
}

// Decoding
// ========

fn decode_document(raw: &Value) -> Result<Document, StoreError> {
  let name = raw
    .get("name")
    .and_then(Value::as_str)
    .ok_or_else(|| StoreError::backend("document without a name"))?;
  let id = name.rsplit('/').next().unwrap_or(name).to_string();

  let mut fields = Fields::new();
  if let Some(raw_fields) = raw.get("fields").and_then(Value::as_object) {
    for (field, value) in raw_fields {
      fields.insert(field.clone(), decode_value(&id, field, value)?);
    }
  }

  Ok(Document { id, fields })
}

fn decode_value(id: &str, field: &str, raw: &Value) -> Result<FieldValue, StoreError> {
  let malformed = |kind: &str| StoreError::malformed(id, format!("field '{field}' has {kind}"));

  if raw.get("nullValue").is_some() {
    return Ok(FieldValue::Null);
  }
  if let Some(b) = raw.get("booleanValue") {
    return b.as_bool().map(FieldValue::Bool).ok_or_else(|| malformed("a non-boolean booleanValue"));
  }
  if let Some(i) = raw.get("integerValue") {
    return i
      .as_str()
      .and_then(|s| s.parse().ok())
      .or_else(|| i.as_i64())
      .map(FieldValue::Integer)
      .ok_or_else(|| malformed("an unparseable integerValue"));
  }
  if let Some(s) = raw.get("stringValue") {
    return s
      .as_str()
      .map(|s| FieldValue::String(s.to_string()))
      .ok_or_else(|| malformed("a non-string stringValue"));
  }
  if let Some(t) = raw.get("timestampValue") {
    return t
      .as_str()
      .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
      .map(|t| FieldValue::Timestamp(t.with_timezone(&Utc)))
      .ok_or_else(|| malformed("an unparseable timestampValue"));
  }

  Err(malformed("an unsupported value type"))
}
