//! Axum router configuration for all endpoints

use axum::{
  middleware,
  routing::{get, post},
  Router,
};

use crate::server::handlers::{callable, status};
use crate::server::middleware::request_context_middleware;
use crate::server::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
  Router::new()
    // Status and version endpoints
    .route("/status", get(status::status))
    .route("/version", get(status::version))
    .route("/api", get(status::api_info))
    // Callable endpoints
    .route("/requestIdeas", post(callable::request_ideas))
    .route("/setStarred", post(callable::set_starred))
    .route("/listIdeas", post(callable::list_ideas))
    .layer(middleware::from_fn_with_state(state.clone(), request_context_middleware))
    .with_state(state)
}
