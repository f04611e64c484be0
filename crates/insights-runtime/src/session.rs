//! Dashboard session: the loaded dataset plus filter resolution.
//!
//! The table is read once at startup and every evidence build borrows it,
//! so repeated filter changes never touch the disk again.

use std::path::Path;
use std::time::Instant;

use insights_core::error::Result;
use insights_core::settings::Settings;
use insights_data::evidence::{build_evidence, EvidencePacket};
use insights_data::reader::load_dataset;
use insights_data::table::{Filters, GenreFilter, TableSlice, WatchTable};
use tracing::info;

/// The immutable dataset behind one run of the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardSession {
    table: WatchTable,
}

impl DashboardSession {
    /// Load and join the catalog and watch-history files.
    pub fn load(content_path: &Path, events_path: &Path) -> Result<Self> {
        let started = Instant::now();
        let table = load_dataset(content_path, events_path)?;
        info!(
            rows = table.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dataset loaded"
        );
        Ok(Self::from_table(table))
    }

    /// Resolve `settings.content_file` / `settings.events_file` under the
    /// configured data directory and load them.
    pub fn load_from_settings(settings: &Settings) -> Result<Self> {
        let dir = settings.require_data_dir()?;
        Self::load(
            &dir.join(&settings.content_file),
            &dir.join(&settings.events_file),
        )
    }

    pub fn from_table(table: WatchTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &WatchTable {
        &self.table
    }

    /// Filters requested on the command line, with unset dates defaulting
    /// to the dataset's span.
    pub fn filters(&self, settings: &Settings) -> Result<Filters> {
        let range = settings.date_range(self.table.date_span())?;
        Ok(Filters::new(range, GenreFilter::parse(&settings.genre)))
    }

    pub fn select(&self, filters: &Filters) -> TableSlice<'_> {
        filters.select(&self.table)
    }

    /// Evidence packet for `filters`, built fresh on every call.
    pub fn evidence(&self, filters: &Filters) -> EvidencePacket {
        let filtered = self.select(filters);
        build_evidence(&self.table, &filtered, filters)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
