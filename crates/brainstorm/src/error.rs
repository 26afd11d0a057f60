//! Error taxonomy shared by the repository and the callable endpoints

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generation::GenerationError;
use crate::models::Category;
use crate::store::StoreError;

/// Wire-level error codes reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
  Unauthenticated,
  InvalidArgument,
  NotFound,
  Internal,
}

impl ErrorCode {
  pub fn as_str(&self) -> &'static str {
    match self {
      ErrorCode::Unauthenticated => "unauthenticated",
      ErrorCode::InvalidArgument => "invalid-argument",
      ErrorCode::NotFound => "not-found",
      ErrorCode::Internal => "internal",
    }
  }
}

#[derive(Error, Debug)]
pub enum BrainstormError {
  #[error("caller must be authenticated")]
  Unauthenticated,

  #[error("{message}")]
  InvalidArgument { message: String },

  #[error("failed to generate {category} ideas: {source}")]
  GenerationFailed {
    category: Category,
    #[source]
    source: GenerationError,
  },

  #[error("storage operation failed: {0}")]
  StorageFailed(#[source] StoreError),

  #[error("idea {id} not found")]
  NotFound { id: String },
}

impl BrainstormError {
  pub fn invalid_argument(message: impl Into<String>) -> Self {
    BrainstormError::InvalidArgument { message: message.into() }
  }

  /// Code surfaced to callers; generation and storage failures are internal
  pub fn code(&self) -> ErrorCode {
    match self {
      BrainstormError::Unauthenticated => ErrorCode::Unauthenticated,
      BrainstormError::InvalidArgument { .. } => ErrorCode::InvalidArgument,
      BrainstormError::NotFound { .. } => ErrorCode::NotFound,
      BrainstormError::GenerationFailed { .. } | BrainstormError::StorageFailed(_) => {
        ErrorCode::Internal
      }
    }
  }
}

impl From<StoreError> for BrainstormError {
  fn from(error: StoreError) -> Self {
    match error {
      StoreError::NotFound { id, .. } => BrainstormError::NotFound { id },
      other => BrainstormError::StorageFailed(other),
    }
  }
}

pub type Result<T, E = BrainstormError> = std::result::Result<T, E>;
