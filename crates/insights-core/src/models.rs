use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Column holding the per-session watch duration; the value every
/// breakdown sums.
pub const VALUE_COLUMN: &str = "watch_duration_minutes";

/// One viewing session read from the watch-history dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchEvent {
    /// Viewer identifier. `None` when the source cell was empty.
    pub user_id: Option<String>,
    /// Content identifier used as the catalog join key.
    pub movie_id: Option<String>,
    /// Full timestamp of the session; filtering uses its calendar day.
    pub watch_date: NaiveDateTime,
    /// Minutes watched. Missing source values are stored as `0.0`.
    pub watch_duration_minutes: f64,
    /// Device the session was played on.
    pub device_type: Option<String>,
    /// Country the session was played from.
    pub location_country: Option<String>,
}

impl WatchEvent {
    /// Calendar day of the session.
    pub fn watch_day(&self) -> NaiveDate {
        self.watch_date.date()
    }
}

/// One entry of the content catalog.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContentItem {
    pub movie_id: String,
    pub title: Option<String>,
    pub genre_primary: Option<String>,
    pub content_type: Option<String>,
    /// Nominal running time in minutes.
    pub duration_minutes: Option<f64>,
    pub release_year: Option<i32>,
    pub rating: Option<String>,
}

/// A watch event left-joined onto its catalog entry.
///
/// `content` is `None` when the event references an id that is not in the
/// catalog; every metadata accessor then yields `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRecord {
    pub event: WatchEvent,
    pub content: Option<Arc<ContentItem>>,
}

impl JoinedRecord {
    pub fn title(&self) -> Option<&str> {
        self.content.as_deref().and_then(|c| c.title.as_deref())
    }

    pub fn genre_primary(&self) -> Option<&str> {
        self.content.as_deref().and_then(|c| c.genre_primary.as_deref())
    }

    /// Raw value of `dimension` for this record (`None` is a real group).
    pub fn dimension_value(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Genre => self.genre_primary(),
            Dimension::Title => self.title(),
            Dimension::Device => self.event.device_type.as_deref(),
            Dimension::Country => self.event.location_country.as_deref(),
        }
    }

    pub fn minutes(&self) -> f64 {
        self.event.watch_duration_minutes
    }

    pub fn watch_day(&self) -> NaiveDate {
        self.event.watch_day()
    }
}

// ── Dimension ─────────────────────────────────────────────────────────────────

/// A categorical column the aggregator can group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dimension {
    #[serde(rename = "genre_primary")]
    Genre,
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "device_type")]
    Device,
    #[serde(rename = "location_country")]
    Country,
}

impl Dimension {
    /// Every dimension, in bit order.
    pub const ALL: [Dimension; 4] = [
        Dimension::Genre,
        Dimension::Title,
        Dimension::Device,
        Dimension::Country,
    ];

    /// Normalised column name in the source datasets.
    pub fn column_name(self) -> &'static str {
        match self {
            Dimension::Genre => "genre_primary",
            Dimension::Title => "title",
            Dimension::Device => "device_type",
            Dimension::Country => "location_country",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Dimension::Genre => 1,
            Dimension::Title => 1 << 1,
            Dimension::Device => 1 << 2,
            Dimension::Country => 1 << 3,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

// ── Columns ───────────────────────────────────────────────────────────────────

/// Set of optional dimension columns present in a loaded table.
///
/// A dimension that is absent degrades every breakdown over it to an
/// empty list instead of a single null group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Columns(u8);

impl Columns {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Dimension::ALL
            .into_iter()
            .fold(Self::empty(), |cols, d| cols.with(d))
    }

    #[must_use]
    pub fn with(self, dimension: Dimension) -> Self {
        Self(self.0 | dimension.bit())
    }

    #[must_use]
    pub fn without(self, dimension: Dimension) -> Self {
        Self(self.0 & !dimension.bit())
    }

    pub fn contains(self, dimension: Dimension) -> bool {
        self.0 & dimension.bit() != 0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
