//! REST transport for the callable endpoints
//!
//! Exposes the callables over HTTP using the `{"data"}` / `{"result"}`
//! envelope, plus status and API description endpoints.

use axum::http::HeaderName;
use std::sync::Arc;

use crate::repository::IdeaRepository;

pub mod handlers;
pub mod middleware;
pub mod routing;
pub mod startup;
pub mod types;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
  pub repository: Arc<IdeaRepository>,
  /// Trusted header carrying the verified caller id
  pub caller_header: HeaderName,
  pub scheduler_enabled: bool,
}

impl AppState {
  pub fn new(repository: Arc<IdeaRepository>, caller_header: HeaderName) -> Self {
    Self { repository, caller_header, scheduler_enabled: false }
  }

  pub fn with_scheduler(mut self, enabled: bool) -> Self {
    self.scheduler_enabled = enabled;
    self
  }
}
