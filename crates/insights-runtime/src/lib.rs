//! Runtime layer for watch-insights.
//!
//! Owns the loaded dataset for the lifetime of the process and talks to the
//! language-model service that turns evidence packets into summaries.

pub mod openai;
pub mod session;
pub mod summarizer;

pub use insights_core as core;
pub use insights_data as data;
