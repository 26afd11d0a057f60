//! Idea records as stored in the document store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::Category;
use crate::store::{Document, FieldValue, Fields, StoreError};

/// Stored field names
pub mod fields {
  pub const CATEGORY: &str = "category";
  pub const PROMPT: &str = "prompt";
  pub const IDEAS: &str = "ideas";
  pub const GENERATED_AT: &str = "generated_at";
  pub const STATUS: &str = "status";
  pub const STARRED: &str = "starred";
  pub const STARRED_AT: &str = "starred_at";
  pub const STARRED_BY: &str = "starred_by";
  pub const USER_ID: &str = "user_id";
  pub const ON_DEMAND: &str = "on_demand";
}

/// Record status; every record is currently active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdeaStatus {
  Active,
}

impl IdeaStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      IdeaStatus::Active => "active",
    }
  }
}

/// Who starred a record and when
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarMark {
  pub starred_at: DateTime<Utc>,
  pub starred_by: String,
}

/// How a record came to exist
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdeaOrigin {
  /// Created by the daily batch
  Scheduled,
  /// Requested by an authenticated caller
  OnDemand { user_id: String },
}

/// One generated batch of ideas
#[derive(Debug, Clone, PartialEq)]
pub struct IdeaRecord {
  pub id: String,
  pub category: Category,
  pub prompt: String,
  pub ideas: String,
  pub generated_at: DateTime<Utc>,
  pub status: IdeaStatus,
  /// Present exactly when the record is starred
  pub star: Option<StarMark>,
  pub origin: IdeaOrigin,
}

impl IdeaRecord {
  pub fn is_starred(&self) -> bool {
    self.star.is_some()
  }

  pub fn is_on_demand(&self) -> bool {
    matches!(self.origin, IdeaOrigin::OnDemand { .. })
  }

  pub fn user_id(&self) -> Option<&str> {
    match &self.origin {
      IdeaOrigin::OnDemand { user_id } => Some(user_id),
      IdeaOrigin::Scheduled => None,
    }
  }

  /// Fields for a freshly generated record; the store stamps `generated_at`
  pub fn new_fields(category: Category, prompt: &str, ideas: &str, origin: &IdeaOrigin) -> Fields {
    let mut doc = Fields::new();
    doc.insert(fields::CATEGORY.into(), category.as_str().into());
    doc.insert(fields::PROMPT.into(), prompt.into());
    doc.insert(fields::IDEAS.into(), ideas.into());
    doc.insert(fields::GENERATED_AT.into(), FieldValue::ServerTimestamp);
    doc.insert(fields::STATUS.into(), IdeaStatus::Active.as_str().into());
    doc.insert(fields::STARRED.into(), false.into());

    if let IdeaOrigin::OnDemand { user_id } = origin {
      doc.insert(fields::USER_ID.into(), user_id.as_str().into());
      doc.insert(fields::ON_DEMAND.into(), true.into());
    }

    doc
  }

  /// Fields that star (or unstar) a record, keeping the star pair consistent
  pub fn star_fields(starred: bool, caller: &str) -> Fields {
    let mut doc = Fields::new();
    doc.insert(fields::STARRED.into(), starred.into());
    if starred {
      doc.insert(fields::STARRED_AT.into(), FieldValue::ServerTimestamp);
      doc.insert(fields::STARRED_BY.into(), caller.into());
    } else {
      doc.insert(fields::STARRED_AT.into(), FieldValue::Null);
      doc.insert(fields::STARRED_BY.into(), FieldValue::Null);
    }
    doc
  }
}

impl TryFrom<Document> for IdeaRecord {
  type Error = StoreError;

  fn try_from(doc: Document) -> Result<Self, Self::Error> {
    let id = doc.id.as_str();

    let text = |field: &str| -> Result<String, StoreError> {
      doc
        .get(field)
        .and_then(FieldValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::malformed(id, format!("missing text field '{field}'")))
    };

    let category = text(fields::CATEGORY)?
      .parse::<Category>()
      .map_err(|e| StoreError::malformed(id, e.to_string()))?;

    let generated_at = doc
      .get(fields::GENERATED_AT)
      .and_then(FieldValue::as_timestamp)
      .ok_or_else(|| StoreError::malformed(id, "missing generated_at timestamp"))?;

    let status = match doc.get(fields::STATUS).and_then(FieldValue::as_str) {
      None | Some("active") => IdeaStatus::Active,
      Some(other) => return Err(StoreError::malformed(id, format!("unknown status '{other}'"))),
    };

    let starred = doc.get(fields::STARRED).and_then(FieldValue::as_bool).unwrap_or(false);
    let star = if starred {
      let starred_at = doc.get(fields::STARRED_AT).and_then(FieldValue::as_timestamp);
      let starred_by = doc.get(fields::STARRED_BY).and_then(FieldValue::as_str);
      match (starred_at, starred_by) {
        (Some(starred_at), Some(starred_by)) => {
          Some(StarMark { starred_at, starred_by: starred_by.to_string() })
        }
        _ => return Err(StoreError::malformed(id, "starred without starred_at/starred_by")),
      }
    } else {
      None
    };

    let on_demand = doc.get(fields::ON_DEMAND).and_then(FieldValue::as_bool).unwrap_or(false);
    let origin = match doc.get(fields::USER_ID).and_then(FieldValue::as_str) {
      Some(user_id) if on_demand => IdeaOrigin::OnDemand { user_id: user_id.to_string() },
      _ => IdeaOrigin::Scheduled,
    };

    Ok(IdeaRecord {
      id: doc.id.clone(),
      category,
      prompt: text(fields::PROMPT)?,
      ideas: text(fields::IDEAS)?,
      generated_at,
      status,
      star,
      origin,
    })
  }
}
