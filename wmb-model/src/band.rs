use serde::{Deserialize, Serialize};

/// Presentation band for a percentage-occupancy metric.
///
/// Bands only drive cell highlighting. An unclassified cell (no band) is
/// rendered with normal styling.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusBand {
    Normal,
    Caution,
    Warning,
}

/// Yellow/red cutoffs, in percent, shared by every project of a bulletin.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct BandThresholds {
    pub yellow: f64,
    pub red: f64,
}

impl Default for BandThresholds {
    fn default() -> Self {
        BandThresholds {
            yellow: 70.0,
            red: 90.0,
        }
    }
}
