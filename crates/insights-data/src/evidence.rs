//! Evidence packet assembly.
//!
//! Combines the current selection, the equal-length window before it and
//! the per-dimension driver deltas into the numbers-only packet consumed
//! by the summarizer and the report.

use insights_core::calculations::{minutes_per_user, pct_change_rounded, round2};
use insights_core::models::Dimension;
use insights_core::time_utils::WindowSummary;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::aggregator::{aggregate, PeriodAggregate, DEFAULT_TOP_N};
use crate::deltas::{compute_deltas, DeltaOrder, DeltaRow, DRIVER_DELTA_ROWS};
use crate::table::{Filters, TableSlice, WatchTable};

pub const NOTE_NO_DATA: &str = "No data available for the selected filters.";
pub const NOTE_NO_PREVIOUS: &str =
    "Previous period comparison unavailable (no data in the prior time window).";

/// Driver-delta dimensions in packet order.
pub const DRIVER_DIMENSIONS: [Dimension; 4] = [
    Dimension::Device,
    Dimension::Country,
    Dimension::Title,
    Dimension::Genre,
];

// ── Packet types ──────────────────────────────────────────────────────────────

/// Filters as echoed back in the packet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiltersSummary {
    pub start_date: String,
    pub end_date: String,
    pub genre: String,
}

impl From<&Filters> for FiltersSummary {
    fn from(filters: &Filters) -> Self {
        Self {
            start_date: filters.range.start().to_string(),
            end_date: filters.range.end().to_string(),
            genre: filters.genre.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Engagement {
    pub minutes_per_user_current: f64,
    pub minutes_per_user_previous: Option<f64>,
    pub minutes_per_user_pct_change: Option<f64>,
}

/// Delta tables keyed by dimension, serialized as a JSON object in
/// insertion order. Empty when no comparison was possible.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DriverDeltas(pub Vec<(Dimension, Vec<DeltaRow>)>);

impl DriverDeltas {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, dimension: Dimension) -> Option<&[DeltaRow]> {
        self.0
            .iter()
            .find(|(d, _)| *d == dimension)
            .map(|(_, rows)| rows.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &[DeltaRow])> {
        self.0.iter().map(|(d, rows)| (*d, rows.as_slice()))
    }
}

impl Serialize for DriverDeltas {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (dimension, rows) in &self.0 {
            map.serialize_entry(dimension.column_name(), rows)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Changes {
    pub total_watch_minutes_pct_change: Option<f64>,
    pub active_users_pct_change: Option<f64>,
    pub titles_watched_pct_change: Option<f64>,
    pub previous_window: WindowSummary,
    pub engagement: Engagement,
    pub driver_deltas: DriverDeltas,
}

/// The full evidence packet. Missing blocks serialize as `{}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidencePacket {
    pub filters: FiltersSummary,
    #[serde(serialize_with = "object_or_empty")]
    pub current_period: Option<PeriodAggregate>,
    #[serde(serialize_with = "object_or_empty")]
    pub previous_period: Option<PeriodAggregate>,
    #[serde(serialize_with = "object_or_empty")]
    pub changes: Option<Changes>,
    pub note: String,
}

impl EvidencePacket {
    /// `true` when the selection had no rows at all.
    pub fn is_empty(&self) -> bool {
        self.current_period.is_none()
    }
}

fn object_or_empty<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match value {
        Some(v) => v.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

// ── build_evidence ────────────────────────────────────────────────────────────

/// Build the evidence packet for `filtered`, the rows of `full` selected
/// by `filters`.
///
/// 1. Empty selection: only filters and a note.
/// 2. Aggregate the current selection.
/// 3. Select the preceding window of equal length with the same genre.
/// 4. Empty previous window: null comparisons and a note.
/// 5. Otherwise top-line percent changes, engagement and driver deltas.
pub fn build_evidence(
    full: &WatchTable,
    filtered: &TableSlice<'_>,
    filters: &Filters,
) -> EvidencePacket {
    let mut packet = EvidencePacket {
        filters: FiltersSummary::from(filters),
        current_period: None,
        previous_period: None,
        changes: None,
        note: String::new(),
    };

    if filtered.is_empty() {
        info!(
            "No rows for {} .. {} ({}); evidence left empty",
            filters.range.start(),
            filters.range.end(),
            filters.genre
        );
        packet.note = NOTE_NO_DATA.to_string();
        return packet;
    }

    let current = aggregate(filtered, DEFAULT_TOP_N);

    let previous_range = filters.range.preceding();
    let previous_slice = filters.with_range(previous_range).select(full);
    debug!(
        "Evidence: {} current rows, {} previous rows ({} .. {})",
        filtered.len(),
        previous_slice.len(),
        previous_range.start(),
        previous_range.end()
    );

    let mpu_current = minutes_per_user(current.total_watch_minutes, current.active_users);

    if previous_slice.is_empty() {
        info!("No rows in the previous window; comparison skipped");
        packet.changes = Some(Changes {
            total_watch_minutes_pct_change: None,
            active_users_pct_change: None,
            titles_watched_pct_change: None,
            previous_window: previous_range.into(),
            engagement: Engagement {
                minutes_per_user_current: round2(mpu_current),
                minutes_per_user_previous: None,
                minutes_per_user_pct_change: None,
            },
            driver_deltas: DriverDeltas::default(),
        });
        packet.current_period = Some(current);
        packet.note = NOTE_NO_PREVIOUS.to_string();
        return packet;
    }

    let previous = aggregate(&previous_slice, DEFAULT_TOP_N);
    let mpu_previous = minutes_per_user(previous.total_watch_minutes, previous.active_users);

    let driver_deltas = DriverDeltas(
        DRIVER_DIMENSIONS
            .into_iter()
            .map(|dimension| {
                let rows = compute_deltas(
                    filtered,
                    &previous_slice,
                    dimension,
                    DRIVER_DELTA_ROWS,
                    DeltaOrder::AbsoluteDelta,
                );
                (dimension, rows)
            })
            .collect(),
    );

    packet.changes = Some(Changes {
        total_watch_minutes_pct_change: pct_change_rounded(
            current.total_watch_minutes,
            previous.total_watch_minutes,
        ),
        active_users_pct_change: pct_change_rounded(
            current.active_users as f64,
            previous.active_users as f64,
        ),
        titles_watched_pct_change: pct_change_rounded(
            current.titles_watched as f64,
            previous.titles_watched as f64,
        ),
        previous_window: previous_range.into(),
        engagement: Engagement {
            minutes_per_user_current: round2(mpu_current),
            minutes_per_user_previous: Some(round2(mpu_previous)),
            minutes_per_user_pct_change: pct_change_rounded(mpu_current, mpu_previous),
        },
        driver_deltas,
    });
    packet.current_period = Some(current);
    packet.previous_period = Some(previous);
    packet
}

// ── Tests ─────────────────────────────────────────────────────────────────────
