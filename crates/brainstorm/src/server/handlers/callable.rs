//! Callable endpoint handlers
//!
//! Unwrap the `{"data"}` envelope, run the endpoint with the caller from the
//! request context, and wrap the outcome as `{"result"}` or `{"error"}`.

use axum::{
  extract::{rejection::JsonRejection, Extension, State},
  http::StatusCode,
  response::Json,
};
use serde::de::DeserializeOwned;

use crate::endpoints::{
  self, CallableError, CallerId, ListIdeasInput, ListIdeasOutput, RequestIdeasInput, RequestIdeasOutput,
  SetStarredInput, SetStarredOutput,
};
use crate::error::{BrainstormError, ErrorCode, Result};
use crate::server::middleware::RequestContext;
use crate::server::types::{status_for, CallableErrorBody, CallableRequest, CallableResponse};
use crate::server::AppState;

type CallableResult<T> = std::result::Result<Json<CallableResponse<T>>, (StatusCode, Json<CallableErrorBody>)>;

/// Require a caller, then extract the endpoint input. A malformed body is
/// invalid-argument, but only once the caller is known.
fn authenticated<T: DeserializeOwned>(
  context: &RequestContext,
  body: std::result::Result<Json<CallableRequest<T>>, JsonRejection>,
) -> Result<(&CallerId, T)> {
  let caller = context.caller().ok_or(BrainstormError::Unauthenticated)?;
  let Json(request) = body.map_err(|rejection| {
    BrainstormError::invalid_argument(format!("malformed request body: {}", rejection.body_text()))
  })?;
  Ok((caller, request.data))
}

fn reply<T>(context: &RequestContext, endpoint: &str, outcome: Result<T>) -> CallableResult<T> {
  match outcome {
    Ok(result) => Ok(Json(CallableResponse { result })),
    Err(e) => {
      let error = CallableError::from(&e);
      if error.code == ErrorCode::Internal {
        tracing::error!(request_id = %context.request_id, endpoint, error = %e, "callable failed");
      } else {
        tracing::info!(request_id = %context.request_id, endpoint, code = error.code.as_str(), "callable rejected");
      }
      Err((status_for(error.code), Json(CallableErrorBody { error })))
    }
  }
}

/// POST /requestIdeas - Generate ideas on demand
pub async fn request_ideas(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  body: std::result::Result<Json<CallableRequest<RequestIdeasInput>>, JsonRejection>,
) -> CallableResult<RequestIdeasOutput> {
  let outcome = match authenticated(&context, body) {
    Ok((caller, data)) => endpoints::request_ideas(&state.repository, Some(caller), data).await,
    Err(e) => Err(e),
  };
  reply(&context, "requestIdeas", outcome)
}

/// POST /setStarred - Star or unstar an idea
pub async fn set_starred(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  body: std::result::Result<Json<CallableRequest<SetStarredInput>>, JsonRejection>,
) -> CallableResult<SetStarredOutput> {
  let outcome = match authenticated(&context, body) {
    Ok((caller, data)) => endpoints::set_starred(&state.repository, Some(caller), data).await,
    Err(e) => Err(e),
  };
  reply(&context, "setStarred", outcome)
}

/// POST /listIdeas - List stored ideas
pub async fn list_ideas(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  body: std::result::Result<Json<CallableRequest<ListIdeasInput>>, JsonRejection>,
) -> CallableResult<ListIdeasOutput> {
  let outcome = match authenticated(&context, body) {
    Ok((caller, data)) => endpoints::list_ideas(&state.repository, Some(caller), data).await,
    Err(e) => Err(e),
  };
  reply(&context, "listIdeas", outcome)
}
