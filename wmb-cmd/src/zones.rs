//! Zone fallback inspection: which level name satisfied each zone.

use crate::session::Session;
use chrono::NaiveDate;
use std::path::Path;
use wmb_data::derive::MetricEngine;
use wmb_model::metric::MetricValue;
use wmb_utils::dates::parse_date;

/// One zone lookup of one project.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneResolution {
    pub project: String,
    pub zone: String,
    pub value: MetricValue,
    /// Level name that supplied the value
    pub source: Option<String>,
    /// Level names tried, in order
    pub attempted: Vec<String>,
}

impl Session {
    /// Resolve every configured zone for every project.
    pub fn resolve_zones(&self, date: NaiveDate) -> wmb_model::error::Result<Vec<ZoneResolution>> {
        let engine = MetricEngine::new(self.database(), &self.config, self.config.period(date));
        let mut out = Vec::new();
        for project in self.projects.iter() {
            for zone in &self.config.zones {
                let resolution = if project.is_applicable(&zone.key) {
                    let reading = engine.read_zone(zone, project)?;
                    ZoneResolution {
                        project: project.code.clone(),
                        zone: zone.key.clone(),
                        value: reading.value,
                        source: reading.source,
                        attempted: reading.attempted,
                    }
                } else {
                    ZoneResolution {
                        project: project.code.clone(),
                        zone: zone.key.clone(),
                        value: MetricValue::Null,
                        source: None,
                        attempted: Vec::new(),
                    }
                };
                out.push(resolution);
            }
        }
        Ok(out)
    }
}

pub fn run_zones(
    config_path: &Path,
    projects_path: &Path,
    data_dir: &Path,
    date: &str,
) -> anyhow::Result<()> {
    let date = parse_date(date)?;
    let session = Session::open(config_path, projects_path, data_dir)?;
    for r in session.resolve_zones(date)? {
        let value = match r.value {
            MetricValue::Value(v) => format!("{:.2}", v),
            MetricValue::Missing => session.config.markers.missing.clone(),
            MetricValue::Null => session.config.markers.null.clone(),
        };
        let source = match (&r.source, r.attempted.len()) {
            (Some(name), 1) => name.clone(),
            (Some(name), n) => format!("{} (fallback {})", name, n - 1),
            (None, 0) => "not applicable".to_string(),
            (None, n) => format!("none of {} candidates", n),
        };
        println!("{:<6} {:<8} {:>10}  {}", r.project, r.zone, value, source);
    }
    Ok(())
}
