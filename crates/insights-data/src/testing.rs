//! Fixtures shared by this crate's unit tests.

use std::sync::Arc;

use chrono::NaiveDate;
use insights_core::models::{Columns, ContentItem, JoinedRecord, WatchEvent};

use crate::table::WatchTable;

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A joined record watched at 20:00 on `date`. A `None` title produces an
/// unmatched (catalog-less) record.
pub fn record(
    user: &str,
    title: Option<&str>,
    genre: Option<&str>,
    device: &str,
    country: &str,
    date: NaiveDate,
    minutes: f64,
) -> JoinedRecord {
    let content = title.map(|t| {
        Arc::new(ContentItem {
            movie_id: format!("m-{t}"),
            title: Some(t.to_string()),
            genre_primary: genre.map(str::to_string),
            ..Default::default()
        })
    });
    JoinedRecord {
        event: WatchEvent {
            user_id: Some(user.to_string()),
            movie_id: title.map(|t| format!("m-{t}")),
            watch_date: date.and_hms_opt(20, 0, 0).unwrap(),
            watch_duration_minutes: minutes,
            device_type: Some(device.to_string()),
            location_country: Some(country.to_string()),
        },
        content,
    }
}

/// A table with every optional column present.
pub fn table_of(records: Vec<JoinedRecord>) -> WatchTable {
    WatchTable::new(Columns::all(), records)
}
