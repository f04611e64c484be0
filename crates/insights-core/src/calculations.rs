//! Numeric helpers shared by the aggregator, the delta engine and the
//! evidence assembler.

/// Round `value` to two decimal places.
///
/// ```
/// use insights_core::calculations::round2;
///
/// assert_eq!(round2(12.345_6), 12.35);
/// assert_eq!(round2(-0.004), 0.0);
/// ```
pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // Avoid emitting `-0.0` into JSON.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Percent change from `previous` to `current`.
///
/// Returns `None` when `previous` is exactly zero: a change against an
/// empty baseline is undefined, not zero and not infinite.
///
/// ```
/// use insights_core::calculations::pct_change;
///
/// assert_eq!(pct_change(125.0, 100.0), Some(25.0));
/// assert_eq!(pct_change(10.0, 0.0), None);
/// ```
pub fn pct_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

/// [`pct_change`] rounded to two decimal places when defined.
pub fn pct_change_rounded(current: f64, previous: f64) -> Option<f64> {
    pct_change(current, previous).map(round2)
}

/// Engagement intensity: minutes per active user.
///
/// The divisor is clamped to at least one so an empty user set yields the
/// raw minute total instead of a division by zero.
pub fn minutes_per_user(total_minutes: f64, active_users: usize) -> f64 {
    total_minutes / active_users.max(1) as f64
}

// ── Tests ──────────────────────────────────────────────────────────────────────
