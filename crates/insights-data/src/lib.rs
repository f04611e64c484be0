//! Data layer for watch-insights.
//!
//! Loads the catalog and watch-history CSVs into a joined table, carves
//! filtered slices out of it and turns those slices into period
//! aggregates, driver deltas and the evidence packet handed to the
//! summarizer.

pub mod aggregator;
pub mod deltas;
pub mod evidence;
pub mod reader;
pub mod table;

#[cfg(test)]
mod testing;

pub use insights_core as core;
