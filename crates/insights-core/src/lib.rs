//! Shared foundation for watch-insights.
//!
//! Typed viewing records, the error type, CLI settings, date-window
//! arithmetic and the numeric / formatting helpers used by the data and
//! runtime layers.

pub mod calculations;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{InsightsError, Result};
