use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::{InsightsError, Result};

// ── Timestamp parsing ─────────────────────────────────────────────────────────

/// Parse a watch-date cell into a naive date-time.
///
/// Handles:
/// * RFC 3339 with `Z` or an explicit offset. The wall-clock time is kept
///   and the offset dropped, so the calendar day is the one written.
/// * ISO-like date-times with `T` or a space separator, with or without
///   fractional seconds or seconds at all.
/// * Plain dates and a few slash-separated layouts; date-only values
///   become midnight.
///
/// Returns `None` for empty or unrecognised input.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive);
        }
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Parse a `YYYY-MM-DD` calendar date (CLI filters).
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| InsightsError::InvalidDate(format!("{s:?}: {e}")))
}

// ── DateRange ─────────────────────────────────────────────────────────────────

/// A contiguous, inclusive range of calendar days. `start <= end` always
/// holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(InsightsError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Single-day range.
    pub fn day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// The window of equal length ending the day before `start`.
    ///
    /// `prev_end = start - 1`, `prev_start = prev_end - (days - 1)`.
    pub fn preceding(&self) -> DateRange {
        let days = self.days();
        let end = self.start - Duration::days(1);
        let start = end - Duration::days(days - 1);
        DateRange { start, end }
    }
}

/// Serialized form of a previous-period window inside the evidence packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowSummary {
    pub start_date: String,
    pub end_date: String,
    pub days: i64,
}

impl From<DateRange> for WindowSummary {
    fn from(range: DateRange) -> Self {
        Self {
            start_date: range.start.to_string(),
            end_date: range.end.to_string(),
            days: range.days(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
