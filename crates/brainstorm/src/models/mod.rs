//! Domain models for idea records and their categories

pub mod category;
pub mod idea;

pub use category::{Category, UnknownCategory};
pub use idea::{fields, IdeaOrigin, IdeaRecord, IdeaStatus, StarMark};
