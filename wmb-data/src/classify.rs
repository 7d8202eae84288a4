use wmb_model::band::{BandThresholds, StatusBand};
use wmb_model::metric::MetricValue;

/// Classify a percentage against the yellow/red cutoffs.
///
/// A value at or above `red` is a warning, at or above `yellow` a caution,
/// anything lower normal. `Missing` and `Null` are left unclassified.
pub fn classify(percent: MetricValue, thresholds: &BandThresholds) -> Option<StatusBand> {
    let value = percent.as_f64()?;
    let band = if value >= thresholds.red {
        StatusBand::Warning
    } else if value >= thresholds.yellow {
        StatusBand::Caution
    } else {
        StatusBand::Normal
    };
    Some(band)
}
