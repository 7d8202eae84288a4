use crate::gateway::UNDEFINED;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The state of a derived quantity for one project in one period.
///
/// - `Value(f64)`: a defined number
/// - `Missing`: expected but unavailable this period (database gap, failed
///   lookup, undefined sentinel)
/// - `Null`: structurally not applicable to this project
///
/// `Missing` and `Null` are never interchangeable: sums skip `Null` but are
/// poisoned by `Missing`.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    Value(f64),
    Missing,
    Null,
}

impl MetricValue {
    /// Build a value from a raw reading, treating the undefined sentinel and
    /// non-finite numbers as `Missing`.
    pub fn from_reading(reading: Option<f64>) -> Self {
        match reading {
            Some(v) if v.is_finite() && v != UNDEFINED => MetricValue::Value(v),
            _ => MetricValue::Missing,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Value(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, MetricValue::Missing)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MetricValue::Null)
    }

    /// Apply `f` to a defined value. A non-finite result becomes `Missing`.
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            MetricValue::Value(v) => MetricValue::from_reading(Some(f(v))),
            other => other,
        }
    }

    /// Combine two operands. `Null` wins over `Missing` (a quantity that does
    /// not apply cannot be missing), and `Missing` wins over a value.
    pub fn combine(self, other: MetricValue, f: impl FnOnce(f64, f64) -> f64) -> Self {
        match (self, other) {
            (MetricValue::Null, _) | (_, MetricValue::Null) => MetricValue::Null,
            (MetricValue::Missing, _) | (_, MetricValue::Missing) => MetricValue::Missing,
            (MetricValue::Value(a), MetricValue::Value(b)) => {
                MetricValue::from_reading(Some(f(a, b)))
            }
        }
    }
}

/// Measurement unit of a metric, before any per-bulletin display scaling.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Feet,
    AcreFeet,
    Percent,
    Cfs,
    Inches,
    DegreesF,
    None,
}

impl Unit {
    /// Storage quantities are subject to the bulletin's storage scale.
    pub fn is_storage(&self) -> bool {
        matches!(self, Unit::AcreFeet)
    }
}

/// Arithmetic combinations the engine knows how to derive.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Derivation {
    ElevationChange,
    OccupiedPercent,
    FloodControlOccupied,
    Difference,
}

/// Where a metric's value came from.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Raw series read, by resolved series identifier
    Series(String),
    /// Location level lookup, by the level name that was tried last or succeeded
    Level(String),
    /// Rating-curve evaluation, by curve identifier
    Rating(String),
    /// Arithmetic combination of other metrics of the same project
    Derived(Derivation),
    /// Sum over system member projects
    SystemSum(Vec<String>),
    /// Configured as not applicable to the project
    NotApplicable,
}

/// A named derived quantity for one project in one reporting period.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub value: MetricValue,
    pub unit: Unit,
    pub provenance: Provenance,
    /// Set when the value crossed an alert threshold at derivation time
    /// (e.g. a daily elevation change larger than one foot).
    pub alert: bool,
}

impl Metric {
    pub fn new(value: MetricValue, unit: Unit, provenance: Provenance) -> Self {
        Metric {
            value,
            unit,
            provenance,
            alert: false,
        }
    }

    pub fn not_applicable(unit: Unit) -> Self {
        Metric::new(MetricValue::Null, unit, Provenance::NotApplicable)
    }

    pub fn with_alert(mut self, alert: bool) -> Self {
        self.alert = alert;
        self
    }
}

/// Per-project scratch record, filled field by field in declared order.
///
/// Later fields read earlier ones through [`MetricRecord::value`]; nothing
/// is shared between projects.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricRecord {
    project: String,
    order: Vec<String>,
    metrics: HashMap<String, Metric>,
}

impl MetricRecord {
    pub fn new(project: &str) -> Self {
        MetricRecord {
            project: project.to_string(),
            ..Default::default()
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Insert a metric. Re-inserting a key replaces the value but keeps its
    /// original position.
    pub fn insert(&mut self, key: &str, metric: Metric) {
        if self.metrics.insert(key.to_string(), metric).is_none() {
            self.order.push(key.to_string());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Metric> {
        self.metrics.get(key)
    }

    pub fn value(&self, key: &str) -> Option<MetricValue> {
        self.metrics.get(key).map(|m| m.value)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Metrics in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Metric)> {
        self.order
            .iter()
            .filter_map(|k| self.metrics.get(k).map(|m| (k.as_str(), m)))
    }
}
