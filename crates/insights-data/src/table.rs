//! In-memory watch table, borrowed slices over it and the sidebar-style
//! filters (date range + genre) that carve slices out of it.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use insights_core::models::{Columns, JoinedRecord};
use insights_core::time_utils::DateRange;

/// Label of the genre option that disables genre filtering.
pub const ALL_GENRES: &str = "All";

// ── WatchTable ────────────────────────────────────────────────────────────────

/// The joined base table every aggregation reads from.
///
/// Built once per process by the loader and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct WatchTable {
    columns: Columns,
    records: Vec<JoinedRecord>,
}

impl WatchTable {
    pub fn new(columns: Columns, records: Vec<JoinedRecord>) -> Self {
        Self { columns, records }
    }

    /// Optional dimension columns present in the source files.
    pub fn columns(&self) -> Columns {
        self.columns
    }

    pub fn records(&self) -> &[JoinedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A slice covering every row.
    pub fn slice(&self) -> TableSlice<'_> {
        TableSlice {
            columns: self.columns,
            rows: self.records.iter().collect(),
        }
    }

    /// Earliest and latest watch day, or `None` for an empty table.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut days = self.records.iter().map(JoinedRecord::watch_day);
        let first = days.next()?;
        Some(days.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Genre selector options: [`ALL_GENRES`] followed by every distinct
    /// non-null genre in ascending order.
    pub fn genre_options(&self) -> Vec<String> {
        let genres: BTreeSet<&str> = self
            .records
            .iter()
            .filter_map(JoinedRecord::genre_primary)
            .collect();
        std::iter::once(ALL_GENRES.to_string())
            .chain(genres.into_iter().map(str::to_string))
            .collect()
    }
}

// ── TableSlice ────────────────────────────────────────────────────────────────

/// An ordered, read-only view of a subset of a [`WatchTable`]'s rows.
#[derive(Debug, Clone)]
pub struct TableSlice<'a> {
    columns: Columns,
    rows: Vec<&'a JoinedRecord>,
}

impl<'a> TableSlice<'a> {
    pub fn from_rows(columns: Columns, rows: Vec<&'a JoinedRecord>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> Columns {
        self.columns
    }

    pub fn rows(&self) -> &[&'a JoinedRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a JoinedRecord> + '_ {
        self.rows.iter().copied()
    }

    /// Keep the rows for which `keep` returns `true`, preserving order.
    pub fn filter(&self, keep: impl Fn(&JoinedRecord) -> bool) -> TableSlice<'a> {
        TableSlice {
            columns: self.columns,
            rows: self.rows.iter().copied().filter(|r| keep(*r)).collect(),
        }
    }

    /// Rows whose watch day lies inside `range` (both ends inclusive).
    pub fn within(&self, range: DateRange) -> TableSlice<'a> {
        self.filter(|r| range.contains(r.watch_day()))
    }

    pub fn matching(&self, genre: &GenreFilter) -> TableSlice<'a> {
        match genre {
            GenreFilter::All => self.clone(),
            GenreFilter::Only(_) => self.filter(|r| genre.matches(r)),
        }
    }
}

// ── GenreFilter ───────────────────────────────────────────────────────────────

/// Genre selector: everything, or exactly one primary genre.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GenreFilter {
    All,
    Only(String),
}

impl GenreFilter {
    /// `"All"` disables filtering; any other string selects that genre.
    pub fn parse(s: &str) -> Self {
        if s == ALL_GENRES {
            GenreFilter::All
        } else {
            GenreFilter::Only(s.to_string())
        }
    }

    /// Records with a null genre only pass [`GenreFilter::All`].
    pub fn matches(&self, record: &JoinedRecord) -> bool {
        match self {
            GenreFilter::All => true,
            GenreFilter::Only(g) => record.genre_primary() == Some(g.as_str()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            GenreFilter::All => ALL_GENRES,
            GenreFilter::Only(g) => g,
        }
    }
}

impl fmt::Display for GenreFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Filters ───────────────────────────────────────────────────────────────────

/// The user's current selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Filters {
    pub range: DateRange,
    pub genre: GenreFilter,
}

impl Filters {
    pub fn new(range: DateRange, genre: GenreFilter) -> Self {
        Self { range, genre }
    }

    /// Apply the date range and genre to the full table.
    pub fn select<'a>(&self, table: &'a WatchTable) -> TableSlice<'a> {
        table.slice().within(self.range).matching(&self.genre)
    }

    /// The same genre selection over `range` instead of the selected one.
    pub fn with_range(&self, range: DateRange) -> Filters {
        Filters {
            range,
            genre: self.genre.clone(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
