//! Plain-text rendering of the dashboard, the evidence-derived KPIs and the
//! generated insights.

use std::fmt::Write as _;

use insights_core::formatting::{
    format_count, format_number, format_pct_change, format_signed, format_time, truncate,
};
use insights_core::models::Dimension;
use insights_data::aggregator::{daily_minutes, minutes_by, BreakdownRow};
use insights_data::deltas::DeltaRow;
use insights_data::evidence::EvidencePacket;
use insights_data::table::TableSlice;
use insights_runtime::summarizer::{ChangeExplanation, DashboardSummary, Insight};

/// Titles listed in the "top titles" section.
const TOP_TITLES: usize = 10;
/// Width of the name column in tables.
const NAME_WIDTH: usize = 28;
/// Rendering of a null dimension value.
const NULL_LABEL: &str = "(unknown)";

fn rule(title: &str) -> String {
    let fill = 60usize.saturating_sub(title.chars().count() + 4);
    format!("── {title} {}\n", "─".repeat(fill))
}

fn label(name: Option<&str>) -> String {
    truncate(name.unwrap_or(NULL_LABEL), NAME_WIDTH)
}

// ── Dashboard ──────────────────────────────────────────────────────────────────

/// KPI header, previous-window chip, breakdowns and driver deltas.
///
/// `top_n` caps the genre breakdown; titles always show the top ten.
pub fn render_dashboard(
    filtered: &TableSlice<'_>,
    packet: &EvidencePacket,
    top_n: usize,
) -> String {
    let mut out = String::new();
    let f = &packet.filters;
    let _ = writeln!(
        out,
        "Watch insights  {} .. {}  genre: {}",
        f.start_date, f.end_date, f.genre
    );

    let Some(current) = &packet.current_period else {
        out.push('\n');
        let _ = writeln!(out, "{}", packet.note);
        return out;
    };
    let changes = packet.changes.as_ref();

    out.push('\n');
    out.push_str(&rule("Key metrics"));
    let kpis = [
        (
            "Total watch minutes",
            format_number(current.total_watch_minutes, 2),
            changes.and_then(|c| c.total_watch_minutes_pct_change),
        ),
        (
            "Active users",
            format_count(current.active_users),
            changes.and_then(|c| c.active_users_pct_change),
        ),
        (
            "Titles watched",
            format_count(current.titles_watched),
            changes.and_then(|c| c.titles_watched_pct_change),
        ),
    ];
    for (name, value, pct) in kpis {
        let _ = writeln!(out, "  {name:<22}{value:>16}  {:>9}", format_pct_change(pct));
    }

    if let Some(c) = changes {
        let e = &c.engagement;
        let _ = writeln!(
            out,
            "  {:<22}{:>16}  {:>9}",
            "Minutes per user",
            format_number(e.minutes_per_user_current, 2),
            format_pct_change(e.minutes_per_user_pct_change)
        );
        let w = &c.previous_window;
        let _ = writeln!(
            out,
            "\n  vs previous {} days: {} .. {}",
            w.days, w.start_date, w.end_date
        );
    }
    if !packet.note.is_empty() {
        let _ = writeln!(out, "  note: {}", packet.note);
    }

    out.push('\n');
    out.push_str(&rule("Watch minutes per day"));
    for (day, minutes) in daily_minutes(filtered) {
        let _ = writeln!(
            out,
            "  {day}  {:>14}  {}",
            format_number(minutes, 2),
            format_time(minutes)
        );
    }

    out.push('\n');
    out.push_str(&rule("Watch minutes by genre"));
    let mut genres = minutes_by(filtered, Dimension::Genre);
    genres.truncate(top_n);
    push_breakdown(&mut out, &genres);

    out.push('\n');
    out.push_str(&rule("Top titles"));
    let mut titles = minutes_by(filtered, Dimension::Title);
    titles.truncate(TOP_TITLES);
    push_breakdown(&mut out, &titles);

    if let Some(c) = changes.filter(|c| !c.driver_deltas.is_empty()) {
        for (dimension, rows) in c.driver_deltas.iter() {
            out.push('\n');
            out.push_str(&rule(&format!("Drivers: {dimension}")));
            push_deltas(&mut out, rows);
        }
    }

    out
}

fn push_breakdown(out: &mut String, rows: &[BreakdownRow]) {
    if rows.is_empty() {
        out.push_str("  (no data)\n");
        return;
    }
    for row in rows {
        let _ = writeln!(
            out,
            "  {:<width$}{:>14}",
            label(row.name.as_deref()),
            format_number(row.minutes, 2),
            width = NAME_WIDTH + 2
        );
    }
}

fn push_deltas(out: &mut String, rows: &[DeltaRow]) {
    if rows.is_empty() {
        out.push_str("  (no data)\n");
        return;
    }
    let _ = writeln!(
        out,
        "  {:<width$}{:>12}{:>12}{:>12}{:>10}",
        "",
        "current",
        "previous",
        "delta",
        "change",
        width = NAME_WIDTH + 2
    );
    for row in rows {
        let _ = writeln!(
            out,
            "  {:<width$}{:>12}{:>12}{:>12}{:>10}",
            label(row.name.as_deref()),
            format_number(row.current, 2),
            format_number(row.previous, 2),
            format_signed(row.delta, 2),
            format_pct_change(row.pct_change),
            width = NAME_WIDTH + 2
        );
    }
}

// ── Insights ───────────────────────────────────────────────────────────────────

fn push_section(out: &mut String, title: &str, bullets: &[String]) {
    if bullets.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}");
    for bullet in bullets {
        let _ = writeln!(out, "  • {bullet}");
    }
}

pub fn render_summary(insight: &Insight<DashboardSummary>) -> String {
    let body = &insight.body;
    let mut out = rule("AI summary");
    let _ = writeln!(out, "{}\n", body.headline);
    push_section(&mut out, "Summary", &body.summary_bullets);
    push_section(&mut out, "Key changes", &body.key_changes);
    push_section(&mut out, "Next checks", &body.next_checks);
    let _ = writeln!(out, "\nModel used: {}", insight.model_used);
    out
}

pub fn render_explanation(insight: &Insight<ChangeExplanation>, metric: &str) -> String {
    let body = &insight.body;
    let mut out = rule(&format!("Why did {metric} change?"));
    let _ = writeln!(out, "{}\n", body.headline);
    push_section(&mut out, "What changed", &body.what_changed);
    push_section(&mut out, "Likely drivers", &body.likely_drivers);
    push_section(&mut out, "Next checks", &body.next_checks);
    let _ = writeln!(out, "\nModel used: {}", insight.model_used);
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use insights_core::models::Columns;
    use insights_core::time_utils::DateRange;
    use insights_data::evidence::build_evidence;
    use insights_data::reader::load_dataset_from_readers;
    use insights_data::table::{Filters, GenreFilter, WatchTable};

    const MOVIES: &str = "movie_id,title,genre_primary\nm1,Night Shift,Drama\nm2,Laugh Track,Comedy\n";
    const HISTORY: &str = "\
user_id,movie_id,watch_date,watch_duration_minutes,device_type,location_country
u1,m1,2024-01-01,30,TV,US
u2,m2,2024-01-02,20,Mobile,CA
u1,m1,2024-01-03,45,TV,US
u3,m9,2024-01-04,10,Web,US
";

    fn table() -> WatchTable {
        load_dataset_from_readers("movies", MOVIES.as_bytes(), "history", HISTORY.as_bytes())
            .unwrap()
    }

    fn filters(start: (u32, u32), end: (u32, u32)) -> Filters {
        let d = |(m, day): (u32, u32)| chrono::NaiveDate::from_ymd_opt(2024, m, day).unwrap();
        Filters::new(DateRange::new(d(start), d(end)).unwrap(), GenreFilter::All)
    }

    #[test]
    fn test_dashboard_with_comparison() {
        let table = table();
        let filters = filters((1, 3), (1, 4));
        let filtered = filters.select(&table);
        let packet = build_evidence(&table, &filtered, &filters);

        let text = render_dashboard(&filtered, &packet, 5);
        assert!(text.contains("Watch insights  2024-01-03 .. 2024-01-04  genre: All"));
        // 55 minutes now vs 50 before.
        assert!(text.contains("+10.00%"));
        assert!(text.contains("vs previous 2 days: 2024-01-01 .. 2024-01-02"));
        assert!(text.contains("Night Shift"));
        assert!(text.contains(NULL_LABEL));
        assert!(text.contains("Drivers: device_type"));
        assert!(text.contains("Drivers: genre_primary"));
    }

    #[test]
    fn test_dashboard_without_previous_window() {
        let table = table();
        let filters = filters((1, 1), (1, 2));
        let filtered = filters.select(&table);
        let packet = build_evidence(&table, &filtered, &filters);

        let text = render_dashboard(&filtered, &packet, 5);
        assert!(text.contains("n/a"));
        assert!(text.contains("note: Previous period comparison unavailable"));
        assert!(!text.contains("Drivers:"));
    }

    #[test]
    fn test_dashboard_empty_selection_shows_note_only() {
        let table = WatchTable::new(Columns::all(), Vec::new());
        let filters = filters((1, 1), (1, 2));
        let filtered = filters.select(&table);
        let packet = build_evidence(&table, &filtered, &filters);

        let text = render_dashboard(&filtered, &packet, 5);
        assert!(text.contains("No data available for the selected filters."));
        assert!(!text.contains("Key metrics"));
    }

    #[test]
    fn test_render_summary_lists_sections_and_model() {
        let insight = Insight {
            body: DashboardSummary {
                headline: "Watch time up".into(),
                summary_bullets: vec!["Total +10%".into()],
                key_changes: Vec::new(),
                next_checks: vec!["Split by device".into()],
            },
            model_used: "gpt-5.2-mini".into(),
        };
        let text = render_summary(&insight);
        assert!(text.contains("Watch time up"));
        assert!(text.contains("  • Total +10%"));
        assert!(!text.contains("Key changes"));
        assert!(text.contains("Model used: gpt-5.2-mini"));
    }

    #[test]
    fn test_render_explanation_names_metric() {
        let insight = Insight {
            body: ChangeExplanation::default(),
            model_used: "m".into(),
        };
        let text = render_explanation(&insight, "active_users");
        assert!(text.contains("Why did active_users change?"));
    }
}
