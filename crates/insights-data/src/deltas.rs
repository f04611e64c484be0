//! Current-vs-previous driver deltas for one dimension.

use std::collections::BTreeMap;

use insights_core::calculations::{pct_change_rounded, round2};
use insights_core::models::Dimension;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::aggregator::{group_sum, GroupKey};
use crate::table::TableSlice;

/// Rows kept per dimension in the evidence packet.
pub const DRIVER_DELTA_ROWS: usize = 6;

/// How delta rows are ranked before truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeltaOrder {
    /// Largest movement first, gains and drops alike.
    #[default]
    AbsoluteDelta,
    /// Largest gain first; drops sink to the bottom.
    SignedDelta,
}

/// Change in summed watch minutes for one dimension value.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaRow {
    pub dimension: Dimension,
    pub name: Option<String>,
    pub current: f64,
    pub previous: f64,
    pub delta: f64,
    /// `None` when `previous` is zero.
    pub pct_change: Option<f64>,
}

impl Serialize for DeltaRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry(self.dimension.column_name(), &self.name)?;
        map.serialize_entry("current", &self.current)?;
        map.serialize_entry("previous", &self.previous)?;
        map.serialize_entry("delta", &self.delta)?;
        map.serialize_entry("pct_change", &self.pct_change)?;
        map.end()
    }
}

/// Compare summed minutes per value of `dimension` across two slices.
///
/// Values present in only one period get `0.0` for the other. Rows are
/// ranked by `order` (equal deltas keep name order, null last) and cut to
/// `n`. Returns an empty list when either slice lacks the dimension column.
pub fn compute_deltas<'a>(
    current: &TableSlice<'a>,
    previous: &TableSlice<'a>,
    dimension: Dimension,
    n: usize,
    order: DeltaOrder,
) -> Vec<DeltaRow> {
    let (Some(cur), Some(prev)) = (group_sum(current, dimension), group_sum(previous, dimension))
    else {
        return Vec::new();
    };

    let mut combined: BTreeMap<GroupKey<'a>, (f64, f64)> = BTreeMap::new();
    for (key, minutes) in cur {
        combined.entry(key).or_default().0 = minutes;
    }
    for (key, minutes) in prev {
        combined.entry(key).or_default().1 = minutes;
    }

    let mut rows: Vec<(GroupKey<'a>, f64, f64, f64)> = combined
        .into_iter()
        .map(|(key, (c, p))| (key, c, p, c - p))
        .collect();

    match order {
        DeltaOrder::AbsoluteDelta => rows.sort_by(|a, b| b.3.abs().total_cmp(&a.3.abs())),
        DeltaOrder::SignedDelta => rows.sort_by(|a, b| b.3.total_cmp(&a.3)),
    }
    rows.truncate(n);

    rows.into_iter()
        .map(|(key, c, p, d)| DeltaRow {
            dimension,
            name: key.into_name(),
            current: round2(c),
            previous: round2(p),
            delta: round2(d),
            pct_change: pct_change_rounded(c, p),
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::WatchTable;
    use crate::testing::{day, record, table_of};
    use insights_core::models::Columns;
    use serde_json::json;

    fn title_row(title: &str, minutes: f64) -> insights_core::models::JoinedRecord {
        record("u1", Some(title), Some("Drama"), "TV", "US", day(2024, 1, 1), minutes)
    }

    fn titles(rows: &[DeltaRow]) -> Vec<&str> {
        rows.iter().filter_map(|r| r.name.as_deref()).collect()
    }

    // ── outer combine ─────────────────────────────────────────────────────────

    #[test]
    fn test_title_only_in_previous_shows_full_drop() {
        let current = table_of(vec![title_row("Alpha", 10.0)]);
        let previous = table_of(vec![title_row("Alpha", 10.0), title_row("Vanished", 50.0)]);

        let rows = compute_deltas(
            &current.slice(),
            &previous.slice(),
            Dimension::Title,
            DRIVER_DELTA_ROWS,
            DeltaOrder::AbsoluteDelta,
        );
        let vanished = &rows[0];
        assert_eq!(vanished.name.as_deref(), Some("Vanished"));
        assert_eq!(vanished.current, 0.0);
        assert_eq!(vanished.previous, 50.0);
        assert_eq!(vanished.delta, -50.0);
        assert_eq!(vanished.pct_change, Some(-100.0));
    }

    #[test]
    fn test_title_only_in_current_has_null_pct() {
        let current = table_of(vec![title_row("New", 40.0)]);
        let previous = table_of(vec![title_row("Old", 5.0)]);

        let rows = compute_deltas(
            &current.slice(),
            &previous.slice(),
            Dimension::Title,
            DRIVER_DELTA_ROWS,
            DeltaOrder::AbsoluteDelta,
        );
        let new = rows.iter().find(|r| r.name.as_deref() == Some("New")).unwrap();
        assert_eq!(new.previous, 0.0);
        assert_eq!(new.delta, 40.0);
        assert_eq!(new.pct_change, None);
    }

    #[test]
    fn test_zero_on_both_sides_has_null_pct() {
        let current = table_of(vec![title_row("Idle", 0.0)]);
        let previous = table_of(vec![title_row("Idle", 0.0)]);
        let rows = compute_deltas(
            &current.slice(),
            &previous.slice(),
            Dimension::Title,
            DRIVER_DELTA_ROWS,
            DeltaOrder::AbsoluteDelta,
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].delta, 0.0);
        assert_eq!(rows[0].pct_change, None);
    }

    // ── ordering ──────────────────────────────────────────────────────────────

    fn movers() -> (WatchTable, WatchTable) {
        let current = table_of(vec![
            title_row("Gainer", 30.0),
            title_row("Dropper", 5.0),
            title_row("Steady", 10.0),
        ]);
        let previous = table_of(vec![
            title_row("Gainer", 20.0),
            title_row("Dropper", 45.0),
            title_row("Steady", 10.0),
        ]);
        (current, previous)
    }

    #[test]
    fn test_absolute_order_surfaces_drops() {
        let (current, previous) = movers();
        let rows = compute_deltas(
            &current.slice(),
            &previous.slice(),
            Dimension::Title,
            DRIVER_DELTA_ROWS,
            DeltaOrder::AbsoluteDelta,
        );
        assert_eq!(titles(&rows), vec!["Dropper", "Gainer", "Steady"]);
    }

    #[test]
    fn test_signed_order_puts_gains_first() {
        let (current, previous) = movers();
        let rows = compute_deltas(
            &current.slice(),
            &previous.slice(),
            Dimension::Title,
            DRIVER_DELTA_ROWS,
            DeltaOrder::SignedDelta,
        );
        assert_eq!(titles(&rows), vec!["Gainer", "Steady", "Dropper"]);
    }

    #[test]
    fn test_equal_deltas_keep_name_order() {
        let current = table_of(vec![title_row("Beta", 10.0), title_row("Alpha", 10.0)]);
        let previous = table_of(Vec::new());
        let rows = compute_deltas(
            &current.slice(),
            &previous.slice(),
            Dimension::Title,
            DRIVER_DELTA_ROWS,
            DeltaOrder::AbsoluteDelta,
        );
        assert_eq!(titles(&rows), vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_truncates_to_n() {
        let (current, previous) = movers();
        let rows = compute_deltas(
            &current.slice(),
            &previous.slice(),
            Dimension::Title,
            2,
            DeltaOrder::AbsoluteDelta,
        );
        assert_eq!(rows.len(), 2);
    }

    // ── absent columns ────────────────────────────────────────────────────────

    #[test]
    fn test_absent_dimension_yields_empty() {
        let current = table_of(vec![title_row("Alpha", 10.0)]);
        let previous = WatchTable::new(
            Columns::all().without(Dimension::Country),
            vec![title_row("Alpha", 5.0)],
        );
        let rows = compute_deltas(
            &current.slice(),
            &previous.slice(),
            Dimension::Country,
            DRIVER_DELTA_ROWS,
            DeltaOrder::AbsoluteDelta,
        );
        assert!(rows.is_empty());
    }

    // ── serialization ─────────────────────────────────────────────────────────

    #[test]
    fn test_delta_row_json_shape() {
        let row = DeltaRow {
            dimension: Dimension::Device,
            name: Some("TV".into()),
            current: 12.5,
            previous: 0.0,
            delta: 12.5,
            pct_change: None,
        };
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!({
                "device_type": "TV",
                "current": 12.5,
                "previous": 0.0,
                "delta": 12.5,
                "pct_change": null
            })
        );
    }
}
