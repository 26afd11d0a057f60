//! Brainstorm - Scheduled and On-Demand Idea Generation
//!
//! Generates batches of product ideas with a text-generation model, keeps them
//! in a document store, and sweeps unstarred batches once they fall outside the
//! retention window.

pub mod cli;
pub mod clock;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod generation;
pub mod models;
pub mod repository;
pub mod scheduler;
pub mod server;
pub mod store;

pub use error::{BrainstormError, ErrorCode};
pub use repository::{BatchResult, IdeaRepository};
