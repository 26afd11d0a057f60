//! HTTP endpoint handlers

pub mod callable;
pub mod status;
