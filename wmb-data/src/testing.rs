//! In-memory gateway double and a small layout shared by this crate's tests.

use crate::rating::{RatingPoint, RatingTable};
use chrono::{DateTime, NaiveDate, Utc};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use wmb_model::gateway::{GatewayError, LevelService, RatingService, Sample, TimeSeriesGateway};
use wmb_model::period::TimeWindow;
use wmb_model::project::Project;
use wmb_utils::dates::parse_timestamp;

pub const LAYOUT: &str = r#"{
    "name": "test",
    "title": "Test Bulletin",
    "utc_offset_hours": -6,
    "storage": { "scale": 0.001, "label": "KAF" },
    "thresholds": { "yellow": 70.0, "red": 90.0 },
    "system": { "name": "System", "members": ["ALPH", "BRVO"] },
    "zones": [
        { "key": "cons", "project_level": "{location}.Cons-{code}", "generic_level": "{location}.Cons" }
    ],
    "fields": [
        { "key": "elev", "header": "Elev", "unit": "feet", "decimals": 2,
          "type": "instant", "series": "{location}.Elev" },
        { "key": "elev_prev", "unit": "feet", "show": false,
          "type": "instant", "series": "{location}.Elev", "sample": "prior" },
        { "key": "change", "header": "Change", "unit": "feet", "decimals": 1,
          "type": "delta", "current": "elev", "prior": "elev_prev" },
        { "key": "storage", "header": "Storage ({storage_unit})", "unit": "acre_feet", "decimals": 1,
          "system": "sum", "type": "rate", "input": "elev" },
        { "key": "cons_elev", "unit": "feet", "show": false, "type": "zone", "zone": "cons" },
        { "key": "cons_storage", "unit": "acre_feet", "show": false, "system": "sum",
          "type": "rate", "input": "cons_elev" },
        { "key": "pct", "header": "% Cons", "unit": "percent", "band": true, "system": "derive",
          "type": "percent", "occupied": "storage", "capacity": "cons_storage" },
        { "key": "flood_occupied", "header": "Flood Occ", "unit": "acre_feet", "decimals": 1,
          "system": "sum", "type": "flood_occupied", "storage": "storage", "base": "cons_storage" }
    ],
    "blocks": [
        { "heading": "Mainstem", "projects": ["ALPH", "BRVO", "SYS"], "spacer": true },
        { "heading": "Tributaries", "projects": ["CHRL", "DLTA"],
          "overrides": [ { "project": "DLTA", "from_field": "storage", "text": "See note *" } ] }
    ]
}"#;

const PROJECTS_CSV: &str = "\
CODE,NAME,LOCATION,RATING_CURVE,CONVENTION,NON_CORPS,NOT_APPLICABLE
ALPH,Alpha Dam,ALPH,ALPH.Stor,local,,
BRVO,Bravo Lake,BRVO,BRVO.Stor,local,,
CHRL,Charlie Gage,CHRL,,gmt,,
DLTA,Delta Lake,DLTA,,local,yes,flood_occupied
";

pub fn project_csv() -> &'static str {
    PROJECTS_CSV
}

pub fn project(code: &str) -> Project {
    Project::parse_project_csv(PROJECTS_CSV)
        .unwrap()
        .into_iter()
        .find(|p| p.code == code)
        .unwrap()
}

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

pub fn ts(s: &str) -> DateTime<Utc> {
    parse_timestamp(s).unwrap()
}

#[derive(Default)]
pub struct FakeGateway {
    pub series: HashMap<String, Vec<Sample>>,
    pub levels: HashMap<String, f64>,
    pub failing_levels: HashSet<String>,
    pub curves: HashMap<String, RatingTable>,
    pub disconnected: bool,
    pub level_log: RefCell<Vec<String>>,
    pub rate_log: RefCell<Vec<String>>,
}

impl FakeGateway {
    pub fn series(&mut self, id: &str, samples: &[(&str, f64)]) {
        let samples = samples
            .iter()
            .map(|(t, v)| Sample { time: ts(t), value: *v })
            .collect();
        self.series.insert(id.to_string(), samples);
    }

    pub fn level(&mut self, id: &str, value: f64) {
        self.levels.insert(id.to_string(), value);
    }

    pub fn fail_level(&mut self, id: &str) {
        self.failing_levels.insert(id.to_string());
    }

    pub fn curve(&mut self, id: &str, points: &[(f64, f64)]) {
        let points = points
            .iter()
            .map(|(i, d)| RatingPoint { independent: *i, dependent: *d })
            .collect();
        self.curves.insert(id.to_string(), RatingTable::new(points));
    }

    pub fn level_calls(&self) -> Vec<String> {
        self.level_log.borrow().clone()
    }

    pub fn rate_calls(&self) -> Vec<String> {
        self.rate_log.borrow().clone()
    }
}

impl TimeSeriesGateway for FakeGateway {
    fn read(&self, series_id: &str, window: &TimeWindow) -> Result<Vec<Sample>, GatewayError> {
        if self.disconnected {
            return Err(GatewayError::Connection("fake gateway offline".into()));
        }
        let samples = self
            .series
            .get(series_id)
            .ok_or_else(|| GatewayError::NotFound(series_id.to_string()))?;
        Ok(samples
            .iter()
            .filter(|s| window.contains(&s.time))
            .copied()
            .collect())
    }
}

impl LevelService for FakeGateway {
    fn level_value(&self, level_id: &str, _as_of: DateTime<Utc>) -> Result<f64, GatewayError> {
        self.level_log.borrow_mut().push(level_id.to_string());
        if self.disconnected {
            return Err(GatewayError::Connection("fake gateway offline".into()));
        }
        if self.failing_levels.contains(level_id) {
            return Err(GatewayError::Query(format!("lookup of {} failed", level_id)));
        }
        self.levels
            .get(level_id)
            .copied()
            .ok_or_else(|| GatewayError::NotFound(level_id.to_string()))
    }
}

impl RatingService for FakeGateway {
    fn rate(&self, curve_id: &str, value: f64, _as_of: DateTime<Utc>) -> Result<f64, GatewayError> {
        self.rate_log.borrow_mut().push(curve_id.to_string());
        if self.disconnected {
            return Err(GatewayError::Connection("fake gateway offline".into()));
        }
        let table = self
            .curves
            .get(curve_id)
            .ok_or_else(|| GatewayError::NotFound(curve_id.to_string()))?;
        table.rate(value).ok_or_else(|| GatewayError::OutOfDomain {
            curve: curve_id.to_string(),
            value,
        })
    }
}

/// ALPH at 75% of conservation with a 1.5 ft rise, BRVO at 50%, CHRL and
/// DLTA with elevations only. Sample instant is 2024-03-01T12:00 UTC
/// (0600 CST); CHRL reads at midnight GMT.
pub fn alpha_bravo_gateway() -> FakeGateway {
    let mut gw = FakeGateway::default();
    gw.series("ALPH.Elev", &[("2024-02-29T12:00", 1148.5), ("2024-03-01T12:00", 1150.0)]);
    gw.curve("ALPH.Stor", &[(1000.0, 0.0), (1200.0, 20000.0)]);
    gw.level("ALPH.Cons-ALPH", 1200.0);

    gw.series("BRVO.Elev", &[("2024-02-29T12:00", 609.8), ("2024-03-01T12:00", 610.0)]);
    gw.curve("BRVO.Stor", &[(600.0, 0.0), (620.0, 4000.0)]);
    gw.level("BRVO.Cons", 620.0);

    gw.series("CHRL.Elev", &[("2024-02-29T00:00", 88.0), ("2024-03-01T00:00", 87.5)]);
    gw.series("DLTA.Elev", &[("2024-02-29T12:00", 301.0), ("2024-03-01T12:00", 301.2)]);
    gw
}
