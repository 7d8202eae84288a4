//! The per-project derivation engine.
//!
//! For one project and one reporting period, [`MetricEngine::derive_project`]
//! walks the bulletin's field list in declared order and fills a
//! [`MetricRecord`]. Data problems (gaps, failed lookups, curve domain
//! errors) become `Missing` on the single metric concerned; only a lost
//! connection or a configuration error is returned as `Err`.

use crate::metrics::{
    difference, elevation_change, exceeds_alert, flood_control_occupied, occupied_percent,
};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::HashMap;
use wmb_model::config::{BulletinConfig, FieldDef, FieldKind, SampleOffset};
use wmb_model::error::{BulletinError, Result};
use wmb_model::gateway::{GatewayError, HydroGateway, Sample};
use wmb_model::metric::{Derivation, Metric, MetricRecord, MetricValue, Provenance};
use wmb_model::period::ReportingPeriod;
use wmb_model::project::Project;
use wmb_model::zone::ZoneDef;

/// The current sample of a series plus the samples one and two periods earlier.
#[derive(Debug, Clone, PartialEq)]
pub struct InstantReading {
    pub series_id: String,
    pub current: MetricValue,
    pub prior: MetricValue,
    pub two_back: MetricValue,
}

impl InstantReading {
    fn missing(series_id: String) -> Self {
        InstantReading {
            series_id,
            current: MetricValue::Missing,
            prior: MetricValue::Missing,
            two_back: MetricValue::Missing,
        }
    }

    pub fn at(&self, offset: SampleOffset) -> MetricValue {
        match offset {
            SampleOffset::Current => self.current,
            SampleOffset::Prior => self.prior,
            SampleOffset::TwoBack => self.two_back,
        }
    }
}

/// Result of walking a zone's fallback chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneReading {
    pub value: MetricValue,
    /// Level name that produced the value, if any did
    pub source: Option<String>,
    /// Level names tried, in order
    pub attempted: Vec<String>,
}

/// Escalate a connection failure, downgrade everything else.
fn soft<T>(result: std::result::Result<T, GatewayError>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(GatewayError::Connection(msg)) => Err(BulletinError::Connection(msg)),
        Err(_) => Ok(None),
    }
}

/// Derivation engine bound to one gateway, layout and reporting period.
pub struct MetricEngine<'a, G: HydroGateway + ?Sized> {
    gateway: &'a G,
    config: &'a BulletinConfig,
    period: ReportingPeriod,
}

impl<'a, G: HydroGateway + ?Sized> MetricEngine<'a, G> {
    pub fn new(gateway: &'a G, config: &'a BulletinConfig, period: ReportingPeriod) -> Self {
        MetricEngine {
            gateway,
            config,
            period,
        }
    }

    pub fn period(&self) -> &ReportingPeriod {
        &self.period
    }

    pub fn config(&self) -> &'a BulletinConfig {
        self.config
    }

    /// Read the most recent sample of `series_pattern` in the project's
    /// window, plus the samples exactly one and two periods before it.
    ///
    /// The comparison samples are anchored on the current sample's time, or
    /// on the window end when there is no current sample.
    pub fn read_instant(&self, series_pattern: &str, project: &Project) -> Result<InstantReading> {
        let series_id = project.substitute(series_pattern);
        let window = self.period.window(project.convention)?;
        let length = self.period.length()?;
        let span = window.extended_back(length, 2)?;

        let samples = match self.gateway.read(&series_id, &span) {
            Ok(samples) => samples,
            Err(GatewayError::Connection(msg)) => return Err(BulletinError::Connection(msg)),
            Err(e) => {
                warn!("{}: read of {} failed, marking missing: {}", project.code, series_id, e);
                return Ok(InstantReading::missing(series_id));
            }
        };

        let latest = samples
            .iter()
            .filter(|s| window.contains(&s.time))
            .max_by_key(|s| s.time);
        let anchor = latest.map(|s| s.time).unwrap_or(window.end);
        let periods_back = |n: i32| -> MetricValue {
            let t = length
                .checked_mul(n)
                .and_then(|back| anchor.checked_sub_signed(back));
            sample_value(t.and_then(|t| samples.iter().find(|s| s.time == t)))
        };

        let reading = InstantReading {
            current: sample_value(latest),
            prior: periods_back(1),
            two_back: periods_back(2),
            series_id,
        };
        if reading.current.is_missing() {
            debug!("{}: no current sample for {}", project.code, reading.series_id);
        }
        Ok(reading)
    }

    /// Resolve a zone elevation through its fallback chain, stopping at the
    /// first candidate that yields a defined value.
    pub fn read_zone(&self, zone: &ZoneDef, project: &Project) -> Result<ZoneReading> {
        let as_of = self.period.sample_instant(project.convention)?;
        let mut attempted = Vec::new();
        for candidate in zone.candidates(project) {
            let result = soft(self.gateway.level_value(&candidate, as_of))?;
            attempted.push(candidate.clone());
            if let Some(value) = result {
                let value = MetricValue::from_reading(Some(value));
                if !value.is_missing() {
                    if attempted.len() > 1 {
                        debug!("{}: zone {} resolved by fallback {}", project.code, zone.key, candidate);
                    }
                    return Ok(ZoneReading {
                        value,
                        source: Some(candidate),
                        attempted,
                    });
                }
            }
        }
        warn!(
            "{}: zone {} not found under any of {} level names",
            project.code,
            zone.key,
            attempted.len()
        );
        Ok(ZoneReading {
            value: MetricValue::Missing,
            source: None,
            attempted,
        })
    }

    /// Rate an elevation through `curve_id`.
    ///
    /// `Missing` and `Null` inputs are returned without evaluating the curve,
    /// a project without a curve gives `Null`, and a failed evaluation gives
    /// `Missing`.
    pub fn rate_zone(
        &self,
        curve_id: Option<&str>,
        elevation: MetricValue,
        as_of: DateTime<Utc>,
    ) -> Result<MetricValue> {
        let Some(curve_id) = curve_id else {
            return Ok(MetricValue::Null);
        };
        let MetricValue::Value(elev) = elevation else {
            return Ok(elevation);
        };
        match self.gateway.rate(curve_id, elev, as_of) {
            Ok(v) => Ok(MetricValue::from_reading(Some(v))),
            Err(GatewayError::Connection(msg)) => Err(BulletinError::Connection(msg)),
            Err(e) => {
                warn!("rating {} at {} failed, marking missing: {}", curve_id, elev, e);
                Ok(MetricValue::Missing)
            }
        }
    }

    /// Compute every field of the layout for `project`, in declared order.
    pub fn derive_project(&self, project: &Project) -> Result<MetricRecord> {
        let mut record = MetricRecord::new(&project.code);
        let mut readings: HashMap<String, InstantReading> = HashMap::new();
        let as_of = self.period.sample_instant(project.convention)?;

        for field in &self.config.fields {
            if !project.is_applicable(&field.key) {
                record.insert(&field.key, Metric::not_applicable(field.unit));
                continue;
            }
            let metric = match &field.kind {
                FieldKind::Instant { series, sample } => {
                    let series_id = project.substitute(series);
                    let reading = match readings.get(&series_id) {
                        Some(r) => r.clone(),
                        None => {
                            let r = self.read_instant(series, project)?;
                            readings.insert(series_id.clone(), r.clone());
                            r
                        }
                    };
                    Metric::new(reading.at(*sample), field.unit, Provenance::Series(series_id))
                }
                FieldKind::Zone { zone } => {
                    if !project.is_applicable(zone) {
                        Metric::not_applicable(field.unit)
                    } else {
                        let def = self.config.zone(zone).ok_or_else(|| BulletinError::UnknownZone {
                            field: field.key.clone(),
                            zone: zone.clone(),
                        })?;
                        let reading = self.read_zone(def, project)?;
                        let level = reading
                            .source
                            .or_else(|| reading.attempted.last().cloned())
                            .unwrap_or_default();
                        Metric::new(reading.value, field.unit, Provenance::Level(level))
                    }
                }
                // A project without a curve never rates, whatever pattern the field names
                FieldKind::Rate { input, curve } => match &project.rating_curve {
                    None => Metric::not_applicable(field.unit),
                    Some(own_curve) => {
                        let curve_id = match curve {
                            Some(pattern) => project.substitute(pattern),
                            None => own_curve.clone(),
                        };
                        let elevation = operand(&record, &field.key, input)?;
                        let value = self.rate_zone(Some(curve_id.as_str()), elevation, as_of)?;
                        Metric::new(value, field.unit, Provenance::Rating(curve_id))
                    }
                },
                _ => apply_derived(field, &record)?,
            };
            record.insert(&field.key, metric);
        }
        Ok(record)
    }
}

fn sample_value(sample: Option<&Sample>) -> MetricValue {
    MetricValue::from_reading(sample.map(|s| s.value))
}

/// Look up an earlier field of the same record.
fn operand(record: &MetricRecord, field: &str, reference: &str) -> Result<MetricValue> {
    record
        .value(reference)
        .ok_or_else(|| BulletinError::FieldOrder {
            field: field.to_string(),
            depends_on: reference.to_string(),
        })
}

/// Evaluate an arithmetic field against a record holding its operands.
///
/// Used for real projects and for the system row alike.
pub fn apply_derived(field: &FieldDef, record: &MetricRecord) -> Result<Metric> {
    let (value, derivation, alert) = match &field.kind {
        FieldKind::Delta {
            current,
            prior,
            alert_threshold,
        } => {
            let change = elevation_change(
                operand(record, &field.key, current)?,
                operand(record, &field.key, prior)?,
            );
            (change, Derivation::ElevationChange, exceeds_alert(change, *alert_threshold))
        }
        FieldKind::Percent { occupied, capacity } => (
            occupied_percent(
                operand(record, &field.key, occupied)?,
                operand(record, &field.key, capacity)?,
            ),
            Derivation::OccupiedPercent,
            false,
        ),
        FieldKind::FloodOccupied { storage, base } => (
            flood_control_occupied(
                operand(record, &field.key, storage)?,
                operand(record, &field.key, base)?,
            ),
            Derivation::FloodControlOccupied,
            false,
        ),
        FieldKind::Difference {
            minuend,
            subtrahend,
        } => (
            difference(
                operand(record, &field.key, minuend)?,
                operand(record, &field.key, subtrahend)?,
            ),
            Derivation::Difference,
            false,
        ),
        FieldKind::Instant { .. } | FieldKind::Zone { .. } | FieldKind::Rate { .. } => {
            return Err(BulletinError::Config(format!(
                "field '{}' is not an arithmetic field",
                field.key
            )))
        }
    };
    Ok(Metric::new(value, field.unit, Provenance::Derived(derivation)).with_alert(alert))
}
