/// A single (independent, dependent) rating table point, e.g.
/// (elevation in feet, storage in acre-feet).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingPoint {
    pub independent: f64,
    pub dependent: f64,
}

/// A monotonic rating table evaluated by linear interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingTable {
    points: Vec<RatingPoint>,
}

impl RatingTable {
    /// Build a table from unordered points. Non-finite points are dropped.
    pub fn new(mut points: Vec<RatingPoint>) -> Self {
        points.retain(|p| p.independent.is_finite() && p.dependent.is_finite());
        points.sort_by(|a, b| a.independent.total_cmp(&b.independent));
        points.dedup_by(|a, b| a.independent == b.independent);
        RatingTable { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Evaluate the table at `x`.
    ///
    /// Returns `None` when `x` is outside the table's independent range; the
    /// table is never extrapolated.
    pub fn rate(&self, x: f64) -> Option<f64> {
        if !x.is_finite() {
            return None;
        }
        let first = self.points.first()?;
        let last = self.points.last()?;
        if x < first.independent || x > last.independent {
            return None;
        }

        // index of the first point with independent >= x
        let idx = self.points.partition_point(|p| p.independent < x);
        let hi = self.points[idx];
        if hi.independent == x || idx == 0 {
            return Some(hi.dependent);
        }
        let lo = self.points[idx - 1];
        let slope = (hi.dependent - lo.dependent) / (hi.independent - lo.independent);
        Some(lo.dependent + slope * (x - lo.independent))
    }
}
