//! Period aggregation: scalar totals, distinct counts and top-N breakdowns
//! over a [`TableSlice`].

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use insights_core::calculations::round2;
use insights_core::models::{Dimension, JoinedRecord, VALUE_COLUMN};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::table::TableSlice;

/// Breakdown size used by the evidence packet.
pub const DEFAULT_TOP_N: usize = 5;

// ── GroupKey ──────────────────────────────────────────────────────────────────

/// Value of a dimension used as a grouping key.
///
/// Ordering puts named values first (ascending) and the null group last;
/// every ranked list falls back to this order for equal sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum GroupKey<'a> {
    Named(&'a str),
    Null,
}

impl<'a> GroupKey<'a> {
    fn of(record: &'a JoinedRecord, dimension: Dimension) -> Self {
        record
            .dimension_value(dimension)
            .map_or(GroupKey::Null, GroupKey::Named)
    }

    pub(crate) fn into_name(self) -> Option<String> {
        match self {
            GroupKey::Named(s) => Some(s.to_string()),
            GroupKey::Null => None,
        }
    }
}

/// Sum minutes per value of `dimension`, in key order.
///
/// `None` when the dimension column is absent from the slice's table.
pub(crate) fn group_sum<'a>(
    slice: &TableSlice<'a>,
    dimension: Dimension,
) -> Option<BTreeMap<GroupKey<'a>, f64>> {
    if !slice.columns().contains(dimension) {
        return None;
    }
    let mut sums: BTreeMap<GroupKey<'a>, f64> = BTreeMap::new();
    for record in slice.iter() {
        *sums.entry(GroupKey::of(record, dimension)).or_default() += record.minutes();
    }
    Some(sums)
}

// ── BreakdownRow ──────────────────────────────────────────────────────────────

/// Summed minutes for one value of a dimension.
///
/// Serializes as `{"<dimension column>": name|null, "watch_duration_minutes": sum}`.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownRow {
    pub dimension: Dimension,
    pub name: Option<String>,
    pub minutes: f64,
}

impl Serialize for BreakdownRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.dimension.column_name(), &self.name)?;
        map.serialize_entry(VALUE_COLUMN, &self.minutes)?;
        map.end()
    }
}

// ── PeriodAggregate ───────────────────────────────────────────────────────────

/// Everything the dashboard and the evidence packet report about one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodAggregate {
    pub total_watch_minutes: f64,
    pub active_users: usize,
    pub titles_watched: usize,
    pub top_genres: Vec<BreakdownRow>,
    pub top_titles: Vec<BreakdownRow>,
    pub watch_by_device: Vec<BreakdownRow>,
    pub watch_by_country: Vec<BreakdownRow>,
}

/// Aggregate `slice`, keeping at most `top_n` rows per breakdown.
///
/// Pure: the result depends only on the rows and `top_n`.
pub fn aggregate(slice: &TableSlice<'_>, top_n: usize) -> PeriodAggregate {
    let total: f64 = slice.iter().map(JoinedRecord::minutes).sum();

    let active_users: HashSet<&str> = slice
        .iter()
        .filter_map(|r| r.event.user_id.as_deref())
        .collect();
    let titles: HashSet<&str> = slice.iter().filter_map(JoinedRecord::title).collect();

    PeriodAggregate {
        total_watch_minutes: round2(total),
        active_users: active_users.len(),
        titles_watched: titles.len(),
        top_genres: ranked(slice, Dimension::Genre, top_n),
        top_titles: ranked(slice, Dimension::Title, top_n),
        watch_by_device: ranked(slice, Dimension::Device, top_n),
        watch_by_country: ranked(slice, Dimension::Country, top_n),
    }
}

/// Full breakdown of `dimension`, largest first. Empty when the column is
/// absent.
pub fn minutes_by(slice: &TableSlice<'_>, dimension: Dimension) -> Vec<BreakdownRow> {
    ranked(slice, dimension, usize::MAX)
}

/// Minutes watched per calendar day, ascending by day.
pub fn daily_minutes(slice: &TableSlice<'_>) -> Vec<(NaiveDate, f64)> {
    let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in slice.iter() {
        *days.entry(record.watch_day()).or_default() += record.minutes();
    }
    days.into_iter().map(|(d, m)| (d, round2(m))).collect()
}

fn ranked(slice: &TableSlice<'_>, dimension: Dimension, limit: usize) -> Vec<BreakdownRow> {
    let Some(sums) = group_sum(slice, dimension) else {
        return Vec::new();
    };

    let mut rows: Vec<(GroupKey<'_>, f64)> = sums.into_iter().collect();
    // Stable: equal sums keep key order.
    rows.sort_by(|a, b| b.1.total_cmp(&a.1));
    rows.truncate(limit);

    rows.into_iter()
        .map(|(key, minutes)| BreakdownRow {
            dimension,
            name: key.into_name(),
            minutes: round2(minutes),
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
