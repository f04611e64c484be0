/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use insights_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let factor = 10_f64.powi(decimals as i32);
    let scaled = (value.abs() * factor).round();

    let integer_part = (scaled / factor).trunc() as u64;
    let frac_digits = (scaled % factor) as u64;

    let grouped = group_thousands(&integer_part.to_string());
    let body = if decimals == 0 {
        grouped
    } else {
        format!(
            "{}.{:0width$}",
            grouped,
            frac_digits,
            width = decimals as usize
        )
    };

    if negative && scaled != 0.0 {
        format!("-{}", body)
    } else {
        body
    }
}

/// Format an integer count with thousands separators.
///
/// ```
/// use insights_core::formatting::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(1_234_567), "1,234,567");
/// ```
pub fn format_count(value: usize) -> String {
    group_thousands(&value.to_string())
}

/// Format an optional percent change as a signed figure.
///
/// `None` (no baseline) renders as `"n/a"`.
///
/// ```
/// use insights_core::formatting::format_pct_change;
///
/// assert_eq!(format_pct_change(Some(25.0)), "+25.00%");
/// assert_eq!(format_pct_change(Some(-3.5)), "-3.50%");
/// assert_eq!(format_pct_change(Some(0.0)), "0.00%");
/// assert_eq!(format_pct_change(None), "n/a");
/// ```
pub fn format_pct_change(pct: Option<f64>) -> String {
    match pct {
        None => "n/a".to_string(),
        Some(p) if p > 0.0 => format!("+{}%", format_number(p, 2)),
        Some(p) => format!("{}%", format_number(p, 2)),
    }
}

/// Format a signed minute delta, e.g. `"+1,200.00"` / `"-50.00"`.
pub fn format_signed(value: f64, decimals: u32) -> String {
    if value > 0.0 {
        format!("+{}", format_number(value, decimals))
    } else {
        format_number(value, decimals)
    }
}

/// Format a duration in minutes as a human-readable string.
///
/// ```
/// use insights_core::formatting::format_time;
///
/// assert_eq!(format_time(45.0), "45m");
/// assert_eq!(format_time(60.0), "1h");
/// assert_eq!(format_time(225.0), "3h 45m");
/// assert_eq!(format_time(0.0), "0m");
/// ```
pub fn format_time(minutes: f64) -> String {
    let total_mins = minutes.round() as i64;
    if total_mins < 60 {
        format!("{}m", total_mins)
    } else {
        let hours = total_mins / 60;
        let mins = total_mins % 60;
        if mins == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, mins)
        }
    }
}

/// Truncate `s` to at most `max` characters, appending `…` when cut.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

// ── Private helpers ────────────────────────────────────────────────────────────

/// Insert a comma every three digits from the right of a digit string.
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_rounding_carries() {
        assert_eq!(format_number(999.999, 2), "1,000.00");
        assert_eq!(format_number(0.125, 1), "0.1");
        assert_eq!(format_number(-0.001, 2), "0.00");
    }

    #[test]
    fn test_format_number_small_fraction_padding() {
        assert_eq!(format_number(3.05, 2), "3.05");
        assert_eq!(format_number(12.0, 3), "12.000");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1"), "1");
        assert_eq!(group_thousands("1000"), "1,000");
        assert_eq!(group_thousands("100000"), "100,000");
    }

    #[test]
    fn test_format_signed() {
        assert_eq!(format_signed(1200.0, 2), "+1,200.00");
        assert_eq!(format_signed(-50.0, 2), "-50.00");
        assert_eq!(format_signed(0.0, 1), "0.0");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("The Long Goodbye", 8), "The Lon…");
    }
}
