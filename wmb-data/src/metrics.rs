//! Pure derivations over [`MetricValue`]s.
//!
//! Every function here propagates `Missing` and `Null` from its operands and
//! never substitutes zero for an unavailable input.

use wmb_model::metric::MetricValue;

/// Default magnitude, in feet, above which a daily elevation change alerts.
pub const ELEVATION_CHANGE_ALERT: f64 = 1.0;

/// `cur - prev` when both are defined.
///
/// Either operand `Missing` gives `Missing`; a `Null` operand gives `Null`.
pub fn elevation_change(cur: MetricValue, prev: MetricValue) -> MetricValue {
    cur.combine(prev, |c, p| c - p)
}

/// True when a defined change exceeds `threshold` in magnitude.
pub fn exceeds_alert(change: MetricValue, threshold: f64) -> bool {
    change.as_f64().is_some_and(|v| v.abs() > threshold)
}

/// `occupied / capacity * 100`, clamped to `[0, 100]`.
///
/// A capacity of zero or less cannot be divided by and gives `Missing`.
pub fn occupied_percent(occupied: MetricValue, capacity: MetricValue) -> MetricValue {
    match (occupied, capacity) {
        (MetricValue::Value(_), MetricValue::Value(cap)) if cap <= 0.0 => MetricValue::Missing,
        _ => occupied.combine(capacity, |occ, cap| (occ / cap * 100.0).clamp(0.0, 100.0)),
    }
}

/// Storage above the base zone: `max(0, storage - base)`.
pub fn flood_control_occupied(storage: MetricValue, base: MetricValue) -> MetricValue {
    storage.combine(base, |s, b| (s - b).max(0.0))
}

/// `minuend - subtrahend`.
pub fn difference(minuend: MetricValue, subtrahend: MetricValue) -> MetricValue {
    minuend.combine(subtrahend, |a, b| a - b)
}
