//! REST API types with schemars annotations

use axum::http::StatusCode;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::endpoints::CallableError;
use crate::error::ErrorCode;

// Callable Envelope
// =================

/// Request body of every callable endpoint
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CallableRequest<T> {
  #[serde(default)]
  pub data: T,
}

/// Successful callable response
#[derive(Debug, Serialize, Deserialize)]
pub struct CallableResponse<T> {
  pub result: T,
}

/// Failed callable response
#[derive(Debug, Serialize, Deserialize)]
pub struct CallableErrorBody {
  pub error: CallableError,
}

/// HTTP status for a callable error code
pub fn status_for(code: ErrorCode) -> StatusCode {
  match code {
    ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
    ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
    ErrorCode::NotFound => StatusCode::NOT_FOUND,
    ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

// Base Response Structure
// =======================

/// Wrapper for the status and version endpoints
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BaseResponse<T> {
  /// API versioning information
  pub versioning: VersionInfo,

  /// Transaction ID for logging correlation
  pub transaction_id: Uuid,

  /// Response data
  #[serde(flatten)]
  pub data: T,
}

/// API versioning information
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionInfo {
  pub latest: String,
  pub requested: String,
  pub resolved: String,
}

impl<T> BaseResponse<T> {
  pub fn success(data: T, transaction_id: Uuid) -> Self {
    let version = env!("CARGO_PKG_VERSION");
    Self {
      versioning: VersionInfo {
        latest: version.to_string(),
        requested: version.to_string(),
        resolved: version.to_string(),
      },
      transaction_id,
      data,
    }
  }
}

// Status/Version Endpoints
// ========================

/// Response for /status endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
  pub status: String,
  pub version: String,
  /// Collection holding idea records
  pub collection: String,
  pub scheduler_enabled: bool,
}

/// Response for /version endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionResponse {
  pub version: String,
}

/// Response for /api endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiInfoResponse {
  pub latest: String,
  pub versions: ApiVersions,
  /// Input schema of each callable, keyed by route
  pub callables: serde_json::Map<String, serde_json::Value>,
}

/// API version details
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiVersions {
  pub latest: String,
  pub active: Vec<String>,
}
