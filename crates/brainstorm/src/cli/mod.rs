//! Command-line client
//!
//! Talks to a running brainstorm server for the callables and drives the
//! repository directly for one-off batch and cleanup runs.

pub mod cache;
pub mod client;
pub mod commands;
pub mod display;
