//! System (mainstem) aggregation.
//!
//! The system pseudo-project has no series of its own. Each field is either
//! summed over the configured members, re-derived from the summed record,
//! or not applicable.

use crate::derive::apply_derived;
use log::warn;
use wmb_model::config::{BulletinConfig, SystemDef, SystemRule};
use wmb_model::error::{BulletinError, Result};
use wmb_model::metric::{Metric, MetricRecord, MetricValue, Provenance};

/// Sum of member values.
///
/// Any `Missing` member makes the whole sum `Missing`: a partial sum would
/// understate the system total. `Null` members are skipped, and a sum with
/// no defined contributors at all is `Null`.
pub fn system_sum<I>(values: I) -> MetricValue
where
    I: IntoIterator<Item = MetricValue>,
{
    let mut total: Option<f64> = None;
    for value in values {
        match value {
            MetricValue::Missing => return MetricValue::Missing,
            MetricValue::Null => {}
            MetricValue::Value(v) => *total.get_or_insert(0.0) += v,
        }
    }
    match total {
        Some(t) => MetricValue::Value(t),
        None => MetricValue::Null,
    }
}

/// Build the system record from member records that were derived with the
/// same layout.
///
/// `members` must hold one record per `system.members` entry, in any order.
pub fn system_record(
    config: &BulletinConfig,
    system: &SystemDef,
    members: &[&MetricRecord],
) -> Result<MetricRecord> {
    let ordered: Vec<&MetricRecord> = system
        .members
        .iter()
        .map(|code| {
            members
                .iter()
                .find(|r| r.project() == code)
                .copied()
                .ok_or_else(|| BulletinError::UnknownProject(code.clone()))
        })
        .collect::<Result<_>>()?;

    let mut record = MetricRecord::new(&system.code);
    for field in &config.fields {
        let metric = match field.system {
            SystemRule::NotApplicable => Metric::not_applicable(field.unit),
            SystemRule::Sum => {
                let values = ordered
                    .iter()
                    .map(|r| r.value(&field.key).unwrap_or(MetricValue::Missing));
                let value = system_sum(values);
                if value.is_missing() {
                    let missing: Vec<&str> = ordered
                        .iter()
                        .filter(|r| r.value(&field.key).map_or(true, |v| v.is_missing()))
                        .map(|r| r.project())
                        .collect();
                    warn!(
                        "{}: {} is missing because member(s) {} are missing",
                        system.code,
                        field.key,
                        missing.join(", ")
                    );
                }
                Metric::new(
                    value,
                    field.unit,
                    Provenance::SystemSum(system.members.clone()),
                )
            }
            SystemRule::Derive => apply_derived(field, &record)?,
        };
        record.insert(&field.key, metric);
    }
    Ok(record)
}
