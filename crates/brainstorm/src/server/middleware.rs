//! Request context and middleware for the brainstorm REST API
//!
//! Every request gets a context holding its id and the caller id taken from
//! the trusted auth header, injected as a request extension.

use axum::{
  extract::{Request, State},
  http::{HeaderMap, HeaderName, Method, Uri},
  middleware::Next,
  response::Response,
};
use uuid::Uuid;

use crate::endpoints::CallerId;
use crate::server::AppState;

/// Request context and metadata
#[derive(Debug, Clone)]
pub struct RequestContext {
  /// Unique ID for this request
  pub request_id: Uuid,
  pub method: Method,
  pub uri: Uri,
  /// Verified caller, if the auth proxy supplied one
  pub caller: Option<CallerId>,
}

impl RequestContext {
  pub fn new(method: Method, uri: Uri, caller: Option<CallerId>) -> Self {
    Self { request_id: Uuid::new_v4(), method, uri, caller }
  }

  pub fn caller(&self) -> Option<&CallerId> {
    self.caller.as_ref()
  }
}

/// Read a non-blank caller id from the trusted header
pub fn caller_from_headers(headers: &HeaderMap, header: &HeaderName) -> Option<CallerId> {
  headers
    .get(header)
    .and_then(|value| value.to_str().ok())
    .map(str::trim)
    .filter(|value| !value.is_empty())
    .map(CallerId::new)
}

/// Middleware to inject RequestContext into all requests
pub async fn request_context_middleware(
  State(state): State<AppState>,
  mut request: Request,
  next: Next,
) -> Response {
  let caller = caller_from_headers(request.headers(), &state.caller_header);
  let context = RequestContext::new(request.method().clone(), request.uri().clone(), caller);

  let start_time = std::time::Instant::now();
  tracing::debug!(
    request_id = %context.request_id,
    method = %context.method,
    path = context.uri.path(),
    authenticated = context.caller.is_some(),
    "request started"
  );

  request.extensions_mut().insert(context.clone());
  let response = next.run(request).await;

  let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
  tracing::info!(
    request_id = %context.request_id,
    method = %context.method,
    path = context.uri.path(),
    status = response.status().as_u16(),
    duration_ms,
    "request completed"
  );

  response
}
