//! CSV loading for the content catalog and the watch history.
//!
//! Both files are read with normalised headers (lower-case, trimmed), the
//! watch events are parsed into typed [`WatchEvent`]s and left-joined onto
//! the catalog by `movie_id` to produce the [`WatchTable`] every
//! aggregation runs over.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use insights_core::error::{InsightsError, Result};
use insights_core::models::{Columns, ContentItem, Dimension, JoinedRecord, WatchEvent};
use insights_core::time_utils::parse_timestamp;
use tracing::{debug, info, warn};

use crate::table::WatchTable;

// ── Public API ────────────────────────────────────────────────────────────────

/// Load the catalog at `content_path` and the watch history at
/// `events_path`, returning the joined table.
///
/// Fails when either file cannot be opened, a required column is missing,
/// a watch date does not parse or a duration is not a non-negative number.
pub fn load_dataset(content_path: &Path, events_path: &Path) -> Result<WatchTable> {
    let catalog_file = open(content_path)?;
    let events_file = open(events_path)?;

    load_dataset_from_readers(
        &content_path.display().to_string(),
        catalog_file,
        &events_path.display().to_string(),
        events_file,
    )
}

/// Same as [`load_dataset`] over arbitrary readers. `*_name` labels the
/// source in error messages.
pub fn load_dataset_from_readers<C: Read, E: Read>(
    catalog_name: &str,
    catalog: C,
    events_name: &str,
    events: E,
) -> Result<WatchTable> {
    let catalog = read_catalog(catalog_name, catalog)?;
    let events = read_events(events_name, events)?;

    let columns = catalog.columns.union(events.columns);
    let mut unmatched = 0usize;

    let records: Vec<JoinedRecord> = events
        .rows
        .into_iter()
        .map(|event| {
            let content = event
                .movie_id
                .as_deref()
                .and_then(|id| catalog.items.get(id))
                .cloned();
            if content.is_none() {
                unmatched += 1;
            }
            JoinedRecord { event, content }
        })
        .collect();

    if unmatched > 0 {
        info!(
            "{} of {} watch events have no catalog entry; metadata left empty",
            unmatched,
            records.len()
        );
    }

    Ok(WatchTable::new(columns, records))
}

// ── Internal types ────────────────────────────────────────────────────────────

/// Columns and catalog entries keyed by `movie_id`.
struct Catalog {
    columns: PartialColumns,
    items: HashMap<String, Arc<ContentItem>>,
}

struct Events {
    columns: PartialColumns,
    rows: Vec<WatchEvent>,
}

/// Dimension columns contributed by one of the two files.
#[derive(Clone, Copy, Default)]
struct PartialColumns(Columns);

impl PartialColumns {
    fn add_if(self, present: bool, dimension: Dimension) -> Self {
        if present {
            Self(self.0.with(dimension))
        } else {
            self
        }
    }

    fn union(self, other: PartialColumns) -> Columns {
        Dimension::ALL
            .into_iter()
            .filter(|d| self.0.contains(*d) || other.0.contains(*d))
            .fold(Columns::empty(), |cols, d| cols.with(d))
    }
}

/// Header name → column index, after normalisation.
struct HeaderIndex<'a> {
    source_name: &'a str,
    positions: HashMap<String, usize>,
}

impl<'a> HeaderIndex<'a> {
    fn new(source_name: &'a str, headers: &csv::StringRecord) -> Self {
        let mut positions = HashMap::new();
        for (idx, raw) in headers.iter().enumerate() {
            // First occurrence wins on duplicate names.
            positions.entry(normalise_header(raw)).or_insert(idx);
        }
        Self {
            source_name,
            positions,
        }
    }

    fn required(&self, column: &str) -> Result<usize> {
        self.positions
            .get(column)
            .copied()
            .ok_or_else(|| InsightsError::MissingColumn {
                source_name: self.source_name.to_string(),
                column: column.to_string(),
            })
    }

    fn optional(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn open(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).map_err(|source| InsightsError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Lower-case and strip surrounding whitespace (and a UTF-8 BOM).
fn normalise_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_lowercase()
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader)
}

fn csv_error(source_name: &str, source: csv::Error) -> InsightsError {
    InsightsError::Csv {
        source_name: source_name.to_string(),
        source,
    }
}

/// Cell value at `idx`, with empty cells reported as `None`.
fn cell(record: &csv::StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| record.get(i)).filter(|v| !v.trim().is_empty())
}

fn owned_cell(record: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    cell(record, idx).map(str::to_string)
}

/// 1-based line number of `record` in its file (header is line 1).
fn line_of(record: &csv::StringRecord, fallback_index: usize) -> usize {
    record
        .position()
        .map(|p| p.line() as usize)
        .unwrap_or(fallback_index + 2)
}

fn read_catalog<R: Read>(source_name: &str, reader: R) -> Result<Catalog> {
    let mut rdr = csv_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| csv_error(source_name, e))?
        .clone();
    let index = HeaderIndex::new(source_name, &headers);

    let id_col = index.required("movie_id")?;
    let title_col = index.optional("title");
    let genre_col = index.optional("genre_primary");
    let type_col = index.optional("content_type");
    let duration_col = index.optional("duration_minutes");
    let year_col = index.optional("release_year");
    let rating_col = index.optional("rating");

    let columns = PartialColumns::default()
        .add_if(title_col.is_some(), Dimension::Title)
        .add_if(genre_col.is_some(), Dimension::Genre);

    let mut items: HashMap<String, Arc<ContentItem>> = HashMap::new();
    let mut duplicates = 0usize;
    let mut rows_read = 0usize;

    for result in rdr.records() {
        let record = result.map_err(|e| csv_error(source_name, e))?;
        rows_read += 1;

        let Some(movie_id) = owned_cell(&record, Some(id_col)) else {
            debug!("{}: skipping catalog row without movie_id", source_name);
            continue;
        };

        let item = ContentItem {
            movie_id: movie_id.clone(),
            title: owned_cell(&record, title_col),
            genre_primary: owned_cell(&record, genre_col),
            content_type: owned_cell(&record, type_col),
            duration_minutes: cell(&record, duration_col).and_then(|v| v.trim().parse().ok()),
            release_year: cell(&record, year_col).and_then(parse_year),
            rating: owned_cell(&record, rating_col),
        };

        match items.entry(movie_id) {
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(item));
            }
            Entry::Occupied(_) => duplicates += 1,
        }
    }

    if duplicates > 0 {
        warn!(
            "{}: {} duplicate movie_id rows ignored (first entry kept)",
            source_name, duplicates
        );
    }
    debug!(
        "{}: {} catalog rows read, {} distinct items",
        source_name,
        rows_read,
        items.len()
    );

    Ok(Catalog { columns, items })
}

fn read_events<R: Read>(source_name: &str, reader: R) -> Result<Events> {
    let mut rdr = csv_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| csv_error(source_name, e))?
        .clone();
    let index = HeaderIndex::new(source_name, &headers);

    let user_col = index.required("user_id")?;
    let movie_col = index.required("movie_id")?;
    let date_col = index.required("watch_date")?;
    let duration_col = index.required("watch_duration_minutes")?;
    let device_col = index.optional("device_type");
    let country_col = index.optional("location_country");

    let columns = PartialColumns::default()
        .add_if(device_col.is_some(), Dimension::Device)
        .add_if(country_col.is_some(), Dimension::Country);

    let mut rows: Vec<WatchEvent> = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| csv_error(source_name, e))?;
        let line = line_of(&record, i);

        let raw_date = record.get(date_col).unwrap_or_default();
        let watch_date =
            parse_timestamp(raw_date).ok_or_else(|| InsightsError::InvalidTimestamp {
                source_name: source_name.to_string(),
                row: line,
                value: raw_date.to_string(),
            })?;

        let watch_duration_minutes = parse_duration(cell(&record, Some(duration_col)))
            .ok_or_else(|| InsightsError::InvalidNumber {
                source_name: source_name.to_string(),
                column: "watch_duration_minutes".to_string(),
                row: line,
                value: record.get(duration_col).unwrap_or_default().to_string(),
            })?;

        rows.push(WatchEvent {
            user_id: owned_cell(&record, Some(user_col)),
            movie_id: owned_cell(&record, Some(movie_col)),
            watch_date,
            watch_duration_minutes,
            device_type: owned_cell(&record, device_col),
            location_country: owned_cell(&record, country_col),
        });
    }

    debug!("{}: {} watch events read", source_name, rows.len());

    Ok(Events { columns, rows })
}

/// Missing durations count as zero; anything else must be a finite,
/// non-negative number.
fn parse_duration(raw: Option<&str>) -> Option<f64> {
    let Some(raw) = raw else {
        return Some(0.0);
    };
    let value: f64 = raw.trim().parse().ok()?;
    if value.is_nan() {
        return Some(0.0);
    }
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Accepts `2019` as well as the float-rendered `2019.0`.
fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    raw.parse::<i32>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().map(|y| y as i32))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    // ── Helpers ───────────────────────────────────────────────────────────────

    const CATALOG: &str = "\
movie_id,title,genre_primary,content_type,duration_minutes,release_year,rating
m1,Night Shift,Drama,Movie,112,2019,PG-13
m2,Laugh Track,Comedy,TV Series,25,2021.0,TV-14
";

    const EVENTS: &str = "\
user_id,movie_id,watch_date,watch_duration_minutes,device_type,location_country
u1,m1,2024-01-15,90.5,TV,US
u2,m2,2024-01-16 21:00:00,,Mobile,CA
u3,m9,2024-01-17,30,Laptop,US
";

    fn load(catalog: &str, events: &str) -> Result<WatchTable> {
        load_dataset_from_readers("movies.csv", catalog.as_bytes(), "watch.csv", events.as_bytes())
    }

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    // ── load_dataset ──────────────────────────────────────────────────────────

    #[test]
    fn test_load_dataset_from_files() {
        let dir = TempDir::new().unwrap();
        let catalog = write_file(dir.path(), "movies.csv", CATALOG);
        let events = write_file(dir.path(), "watch_history.csv", EVENTS);

        let table = load_dataset(&catalog, &events).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.columns(), Columns::all());
    }

    #[test]
    fn test_load_dataset_missing_file() {
        let dir = TempDir::new().unwrap();
        let events = write_file(dir.path(), "watch_history.csv", EVENTS);
        let err = load_dataset(&dir.path().join("nope.csv"), &events).unwrap_err();
        assert!(matches!(err, InsightsError::FileRead { .. }));
    }

    // ── join semantics ────────────────────────────────────────────────────────

    #[test]
    fn test_left_join_keeps_unmatched_events() {
        let table = load(CATALOG, EVENTS).unwrap();
        let records = table.records();

        assert_eq!(records[0].title(), Some("Night Shift"));
        assert_eq!(records[0].genre_primary(), Some("Drama"));
        assert_eq!(records[1].title(), Some("Laugh Track"));
        // m9 is not in the catalog but the minutes still count.
        assert!(records[2].content.is_none());
        assert_eq!(records[2].title(), None);
        assert_eq!(records[2].minutes(), 30.0);
    }

    #[test]
    fn test_catalog_metadata_parsed() {
        let table = load(CATALOG, EVENTS).unwrap();
        let item = table.records()[1].content.as_deref().unwrap();
        assert_eq!(item.content_type.as_deref(), Some("TV Series"));
        assert_eq!(item.duration_minutes, Some(25.0));
        assert_eq!(item.release_year, Some(2021));
        assert_eq!(item.rating.as_deref(), Some("TV-14"));
    }

    #[test]
    fn test_duplicate_catalog_ids_first_wins() {
        let catalog = "movie_id,title,genre_primary\nm1,First,Drama\nm1,Second,Comedy\n";
        let events = "user_id,movie_id,watch_date,watch_duration_minutes\nu1,m1,2024-01-01,10\n";
        let table = load(catalog, events).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].title(), Some("First"));
    }

    // ── normalisation ─────────────────────────────────────────────────────────

    #[test]
    fn test_headers_are_normalised() {
        let catalog = " Movie_ID , TITLE ,Genre_Primary\nm1,Night Shift,Drama\n";
        let events = "\u{feff}User_Id, movie_id ,WATCH_DATE,Watch_Duration_Minutes \nu1,m1,2024-01-15,12\n";
        let table = load(catalog, events).unwrap();
        assert_eq!(table.records()[0].title(), Some("Night Shift"));
        assert_eq!(table.records()[0].minutes(), 12.0);
    }

    #[test]
    fn test_missing_duration_defaults_to_zero() {
        let table = load(CATALOG, EVENTS).unwrap();
        assert_eq!(table.records()[1].minutes(), 0.0);
    }

    #[test]
    fn test_empty_cells_are_null() {
        let events = "user_id,movie_id,watch_date,watch_duration_minutes,device_type\n,m1,2024-01-15,5,\n";
        let table = load(CATALOG, events).unwrap();
        let event = &table.records()[0].event;
        assert_eq!(event.user_id, None);
        assert_eq!(event.device_type, None);
    }

    // ── optional columns ──────────────────────────────────────────────────────

    #[test]
    fn test_optional_columns_tracked() {
        let catalog = "movie_id,title\nm1,Night Shift\n";
        let events = "user_id,movie_id,watch_date,watch_duration_minutes,device_type\nu1,m1,2024-01-15,5,TV\n";
        let table = load(catalog, events).unwrap();
        let cols = table.columns();
        assert!(cols.contains(Dimension::Title));
        assert!(cols.contains(Dimension::Device));
        assert!(!cols.contains(Dimension::Genre));
        assert!(!cols.contains(Dimension::Country));
    }

    // ── failures ──────────────────────────────────────────────────────────────

    #[test]
    fn test_missing_required_event_column() {
        let events = "user_id,movie_id,watch_duration_minutes\nu1,m1,5\n";
        let err = load(CATALOG, events).unwrap_err();
        match err {
            InsightsError::MissingColumn { column, source_name } => {
                assert_eq!(column, "watch_date");
                assert_eq!(source_name, "watch.csv");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_catalog_id_column() {
        let catalog = "id,title\nm1,Night Shift\n";
        let err = load(catalog, EVENTS).unwrap_err();
        assert!(matches!(err, InsightsError::MissingColumn { .. }));
    }

    #[test]
    fn test_unparseable_watch_date_is_fatal() {
        let events = "user_id,movie_id,watch_date,watch_duration_minutes\nu1,m1,2024-01-15,5\nu2,m1,someday,5\n";
        let err = load(CATALOG, events).unwrap_err();
        match err {
            InsightsError::InvalidTimestamp { row, value, .. } => {
                assert_eq!(row, 3);
                assert_eq!(value, "someday");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_duration_is_fatal() {
        let events = "user_id,movie_id,watch_date,watch_duration_minutes\nu1,m1,2024-01-15,lots\n";
        assert!(matches!(
            load(CATALOG, events).unwrap_err(),
            InsightsError::InvalidNumber { .. }
        ));

        let events = "user_id,movie_id,watch_date,watch_duration_minutes\nu1,m1,2024-01-15,-4\n";
        assert!(matches!(
            load(CATALOG, events).unwrap_err(),
            InsightsError::InvalidNumber { .. }
        ));
    }

    // ── parse helpers ─────────────────────────────────────────────────────────

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration(None), Some(0.0));
        assert_eq!(parse_duration(Some(" 42.5 ")), Some(42.5));
        assert_eq!(parse_duration(Some("NaN")), Some(0.0));
        assert_eq!(parse_duration(Some("-1")), None);
        assert_eq!(parse_duration(Some("inf")), None);
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2019"), Some(2019));
        assert_eq!(parse_year("2019.0"), Some(2019));
        assert_eq!(parse_year("n/a"), None);
    }
}
