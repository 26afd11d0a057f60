//! Status and version endpoint handlers

use axum::{extract::State, response::Json};
use schemars::schema_for;
use uuid::Uuid;

use crate::endpoints::{ListIdeasInput, RequestIdeasInput, SetStarredInput};
use crate::server::types::{ApiInfoResponse, ApiVersions, BaseResponse, StatusResponse, VersionResponse};
use crate::server::AppState;

/// GET /status - Health check endpoint
pub async fn status(State(state): State<AppState>) -> Json<BaseResponse<StatusResponse>> {
  let response = StatusResponse {
    status: "healthy".to_string(),
    version: env!("CARGO_PKG_VERSION").to_string(),
    collection: state.repository.collection().to_string(),
    scheduler_enabled: state.scheduler_enabled,
  };

  Json(BaseResponse::success(response, Uuid::new_v4()))
}

/// GET /version - Returns current API version
pub async fn version() -> Json<BaseResponse<VersionResponse>> {
  let response = VersionResponse { version: env!("CARGO_PKG_VERSION").to_string() };
  Json(BaseResponse::success(response, Uuid::new_v4()))
}

/// GET /api - Returns API information and callable input schemas
pub async fn api_info() -> Json<BaseResponse<ApiInfoResponse>> {
  let version = env!("CARGO_PKG_VERSION");

  let mut callables = serde_json::Map::new();
  let schemas = [
    ("/requestIdeas", serde_json::to_value(schema_for!(RequestIdeasInput))),
    ("/setStarred", serde_json::to_value(schema_for!(SetStarredInput))),
    ("/listIdeas", serde_json::to_value(schema_for!(ListIdeasInput))),
  ];
  for (route, schema) in schemas {
    match schema {
      Ok(schema) => {
        callables.insert(route.to_string(), schema);
      }
      Err(e) => tracing::warn!(route, error = %e, "failed to serialize callable schema"),
    }
  }

  let response = ApiInfoResponse {
    latest: version.to_string(),
    versions: ApiVersions { latest: version.to_string(), active: vec![version.to_string()] },
    callables,
  };

  Json(BaseResponse::success(response, Uuid::new_v4()))
}
