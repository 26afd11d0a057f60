//! Text generation abstraction
//!
//! The repository only needs "prompt in, text out"; `GeminiClient` is the
//! production implementation.

pub mod gemini;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::{GeminiClient, GeminiConfig};

/// Errors that can occur when calling the generation service
#[derive(Error, Debug)]
pub enum GenerationError {
  #[error("generation service is misconfigured: {message}")]
  Config { message: String },

  #[error("failed to reach generation service: {message}")]
  Transport { message: String },

  #[error("generation service returned {status}: {message}")]
  Http { status: u16, message: String },

  #[error("prompt was blocked: {reason}")]
  Blocked { reason: String },

  #[error("generation service returned no text")]
  EmptyResponse,

  #[error("unexpected response from generation service: {message}")]
  MalformedResponse { message: String },
}

/// Something that turns a prompt into generated text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
  async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
