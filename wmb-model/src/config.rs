//! Bulletin layout configuration.
//!
//! One JSON document describes a whole bulletin: reporting convention,
//! thresholds, zones, the ordered field list and the data blocks. The same
//! pipeline runs every bulletin; only this document changes.
//!
//! Field order is significant. A field may only reference fields declared
//! before it, and [`BulletinConfig::validate`] rejects layouts that break
//! this rule instead of reordering them.

use crate::band::BandThresholds;
use crate::error::{BulletinError, Result};
use crate::metric::Unit;
use crate::period::ReportingPeriod;
use crate::project::{ProjectTable, SYSTEM_CODE};
use crate::zone::ZoneDef;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

fn default_sample_hour() -> u32 {
    6
}
/// One leap year of hours.
pub const MAX_PERIOD_HOURS: i64 = 8784;
/// Largest whole-hour distance from UTC a layout may declare.
pub const MAX_UTC_OFFSET_HOURS: i32 = 23;

fn default_period_hours() -> i64 {
    24
}
fn default_alert_threshold() -> f64 {
    1.0
}
fn default_true() -> bool {
    true
}
fn default_name_header() -> String {
    "Project".to_string()
}
fn default_system_code() -> String {
    SYSTEM_CODE.to_string()
}

/// Display scaling for storage quantities (acre-feet vs thousands of acre-feet).
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct StorageUnits {
    /// Multiplier applied to acre-feet before display, e.g. 0.001 for KAF
    pub scale: f64,
    /// Label substituted for `{storage_unit}` in column headers
    pub label: String,
}

impl Default for StorageUnits {
    fn default() -> Self {
        StorageUnits {
            scale: 1.0,
            label: "AF".to_string(),
        }
    }
}

/// Cell text for values that are not numbers.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Markers {
    pub missing: String,
    pub null: String,
    /// Appended to the display name of non-Corps projects
    pub non_corps: String,
}

impl Default for Markers {
    fn default() -> Self {
        Markers {
            missing: "M".to_string(),
            null: "--".to_string(),
            non_corps: "*".to_string(),
        }
    }
}

/// The summed mainstem pseudo-project.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SystemDef {
    #[serde(default = "default_system_code")]
    pub code: String,
    pub name: String,
    /// Real projects whose metrics are summed, in summation order
    pub members: Vec<String>,
}

/// Which instantaneous sample of a series a field reads.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleOffset {
    #[default]
    Current,
    /// Exactly one period before the current sample
    Prior,
    /// Exactly two periods before the current sample
    TwoBack,
}

/// How the system pseudo-project obtains a field.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRule {
    /// The field does not apply to the system row
    #[default]
    NotApplicable,
    /// Sum over system members
    Sum,
    /// Apply the field's own derivation to the system record
    Derive,
}

/// How a field is obtained for a real project.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Instantaneous series read; `series` is a pattern
    Instant {
        series: String,
        #[serde(default)]
        sample: SampleOffset,
    },
    /// Zone elevation via the zone's fallback chain
    Zone { zone: String },
    /// Rating-curve lookup of an earlier field; defaults to the project's curve
    Rate {
        input: String,
        #[serde(default)]
        curve: Option<String>,
    },
    /// `current - prior`, alerting when the magnitude exceeds the threshold
    Delta {
        current: String,
        prior: String,
        #[serde(default = "default_alert_threshold")]
        alert_threshold: f64,
    },
    /// `occupied / capacity * 100`, clamped to [0, 100]
    Percent { occupied: String, capacity: String },
    /// `max(0, storage - base)`
    FloodOccupied { storage: String, base: String },
    /// `minuend - subtrahend`
    Difference { minuend: String, subtrahend: String },
}

impl FieldKind {
    /// Keys of the fields this one reads from the per-project record.
    pub fn dependencies(&self) -> Vec<&str> {
        match self {
            FieldKind::Instant { .. } | FieldKind::Zone { .. } => vec![],
            FieldKind::Rate { input, .. } => vec![input.as_str()],
            FieldKind::Delta { current, prior, .. } => vec![current.as_str(), prior.as_str()],
            FieldKind::Percent { occupied, capacity } => {
                vec![occupied.as_str(), capacity.as_str()]
            }
            FieldKind::FloodOccupied { storage, base } => vec![storage.as_str(), base.as_str()],
            FieldKind::Difference {
                minuend,
                subtrahend,
            } => vec![minuend.as_str(), subtrahend.as_str()],
        }
    }

    /// Pure arithmetic over other fields, with no database access.
    pub fn is_derived(&self) -> bool {
        !matches!(
            self,
            FieldKind::Instant { .. } | FieldKind::Zone { .. } | FieldKind::Rate { .. }
        )
    }
}

/// One column (or hidden helper) of the bulletin.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub key: String,
    #[serde(default)]
    pub header: String,
    pub unit: Unit,
    #[serde(default)]
    pub decimals: usize,
    /// Hidden fields are computed but produce no column
    #[serde(default = "default_true")]
    pub show: bool,
    /// Classify this percentage into a status band
    #[serde(default)]
    pub band: bool,
    #[serde(default)]
    pub system: SystemRule,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Replaces a project's cells from `from_field` onward with one spanning
/// note cell. With no `from_field` the note follows the name column.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct RowOverride {
    pub project: String,
    #[serde(default)]
    pub from_field: Option<String>,
    pub text: String,
}

/// A labeled section of the bulletin table.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BlockDef {
    pub heading: String,
    pub projects: Vec<String>,
    #[serde(default)]
    pub overrides: Vec<RowOverride>,
    /// Emit a blank spacer row after the block
    #[serde(default)]
    pub spacer: bool,
}

impl BlockDef {
    pub fn override_for(&self, project: &str) -> Option<&RowOverride> {
        self.overrides.iter().find(|o| o.project == project)
    }
}

/// The full layout of one bulletin.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BulletinConfig {
    pub name: String,
    pub title: String,
    #[serde(default = "default_sample_hour")]
    pub sample_hour: u32,
    #[serde(default)]
    pub utc_offset_hours: i32,
    #[serde(default = "default_period_hours")]
    pub period_hours: i64,
    #[serde(default = "default_name_header")]
    pub name_header: String,
    #[serde(default)]
    pub storage: StorageUnits,
    #[serde(default)]
    pub thresholds: BandThresholds,
    #[serde(default)]
    pub markers: Markers,
    #[serde(default)]
    pub system: Option<SystemDef>,
    #[serde(default)]
    pub zones: Vec<ZoneDef>,
    pub fields: Vec<FieldDef>,
    pub blocks: Vec<BlockDef>,
}

impl BulletinConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = BulletinConfig::from_json(&json)?;
        log::info!(
            "[WMB] config: loaded bulletin '{}' ({} fields, {} blocks) from {}",
            config.name,
            config.fields.len(),
            config.blocks.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn period(&self, date: NaiveDate) -> ReportingPeriod {
        ReportingPeriod {
            date,
            sample_hour: self.sample_hour,
            utc_offset_hours: self.utc_offset_hours,
            length_hours: self.period_hours,
        }
    }

    pub fn field(&self, key: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn zone(&self, key: &str) -> Option<&ZoneDef> {
        self.zones.iter().find(|z| z.key == key)
    }

    pub fn visible_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.show)
    }

    /// Name column plus one column per visible field.
    pub fn column_count(&self) -> usize {
        1 + self.visible_fields().count()
    }

    pub fn is_system(&self, code: &str) -> bool {
        self.system.as_ref().is_some_and(|s| s.code == code)
    }

    /// Check every cross-reference in the layout against itself and the
    /// project table. Any failure is fatal to the run.
    pub fn validate(&self, projects: &ProjectTable) -> Result<()> {
        if self.sample_hour > 23 {
            return Err(BulletinError::Config(format!(
                "sample_hour {} is not an hour of day",
                self.sample_hour
            )));
        }
        if !(1..=MAX_PERIOD_HOURS).contains(&self.period_hours) {
            return Err(BulletinError::Config(format!(
                "period_hours must be between 1 and {}, got {}",
                MAX_PERIOD_HOURS, self.period_hours
            )));
        }
        if self.utc_offset_hours.abs() > MAX_UTC_OFFSET_HOURS {
            return Err(BulletinError::Config(format!(
                "utc_offset_hours must be within +/-{}, got {}",
                MAX_UTC_OFFSET_HOURS, self.utc_offset_hours
            )));
        }
        if self.thresholds.yellow > self.thresholds.red {
            return Err(BulletinError::Config(format!(
                "yellow cutoff {} is above red cutoff {}",
                self.thresholds.yellow, self.thresholds.red
            )));
        }

        let mut zone_keys = HashSet::new();
        for zone in &self.zones {
            if !zone_keys.insert(zone.key.as_str()) {
                return Err(BulletinError::Config(format!(
                    "duplicate zone key '{}'",
                    zone.key
                )));
            }
            for code in &zone.inactive_projects {
                projects.get(code)?;
            }
        }

        self.validate_fields()?;

        if let Some(system) = &self.system {
            if projects.contains(&system.code) {
                return Err(BulletinError::Config(format!(
                    "system code '{}' collides with a real project",
                    system.code
                )));
            }
            if system.members.is_empty() {
                return Err(BulletinError::Config(
                    "system has no member projects".to_string(),
                ));
            }
            for code in &system.members {
                projects.get(code)?;
            }
        }

        for block in &self.blocks {
            for code in &block.projects {
                if !self.is_system(code) {
                    projects.get(code)?;
                }
            }
            for ov in &block.overrides {
                if !block.projects.contains(&ov.project) {
                    return Err(BulletinError::Config(format!(
                        "override for '{}' in block '{}' names a project not in the block",
                        ov.project, block.heading
                    )));
                }
                if let Some(from) = &ov.from_field {
                    if !self.visible_fields().any(|f| &f.key == from) {
                        return Err(BulletinError::UnknownField {
                            field: format!("override {}", ov.project),
                            reference: from.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_fields(&self) -> Result<()> {
        let all_keys: HashSet<&str> = self.fields.iter().map(|f| f.key.as_str()).collect();
        let mut declared: HashSet<&str> = HashSet::new();
        for field in &self.fields {
            if declared.contains(field.key.as_str()) {
                return Err(BulletinError::Config(format!(
                    "duplicate field key '{}'",
                    field.key
                )));
            }
            for dep in field.kind.dependencies() {
                if !all_keys.contains(dep) {
                    return Err(BulletinError::UnknownField {
                        field: field.key.clone(),
                        reference: dep.to_string(),
                    });
                }
                if !declared.contains(dep) {
                    return Err(BulletinError::FieldOrder {
                        field: field.key.clone(),
                        depends_on: dep.to_string(),
                    });
                }
            }
            if let FieldKind::Zone { zone } = &field.kind {
                if self.zone(zone).is_none() {
                    return Err(BulletinError::UnknownZone {
                        field: field.key.clone(),
                        zone: zone.clone(),
                    });
                }
            }
            if field.system == SystemRule::Derive && !field.kind.is_derived() {
                return Err(BulletinError::Config(format!(
                    "field '{}' reads the database and cannot be derived for the system row",
                    field.key
                )));
            }
            if field.band && field.unit != Unit::Percent {
                log::warn!(
                    "[WMB] config: field '{}' is banded but its unit is {:?}",
                    field.key,
                    field.unit
                );
            }
            declared.insert(field.key.as_str());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECTS_CSV: &str = "\
CODE,NAME,LOCATION,RATING_CURVE,CONVENTION,NON_CORPS,NOT_APPLICABLE
ALPH,Alpha Dam,ALPH,ALPH.Stor,local,,
BRVO,Bravo Lake,BRVO,BRVO.Stor,local,,
";

    const LAYOUT: &str = r#"{
        "name": "daily",
        "title": "Daily Reservoir Bulletin",
        "storage": { "scale": 0.001, "label": "KAF" },
        "system": { "name": "System Total", "members": ["ALPH", "BRVO"] },
        "zones": [
            { "key": "cons", "project_level": "{location}.Elev.Cons-{code}", "generic_level": "{location}.Elev.Cons" }
        ],
        "fields": [
            { "key": "elev", "header": "Elev (ft)", "unit": "feet", "decimals": 2,
              "type": "instant", "series": "{location}.Elev.Inst.1Hour.0.Best" },
            { "key": "elev_prev", "unit": "feet", "show": false,
              "type": "instant", "series": "{location}.Elev.Inst.1Hour.0.Best", "sample": "prior" },
            { "key": "change", "header": "Change", "unit": "feet", "decimals": 1,
              "type": "delta", "current": "elev", "prior": "elev_prev" },
            { "key": "storage", "header": "Storage ({storage_unit})", "unit": "acre_feet", "system": "sum",
              "type": "rate", "input": "elev" },
            { "key": "cons_elev", "unit": "feet", "show": false, "type": "zone", "zone": "cons" },
            { "key": "cons_storage", "unit": "acre_feet", "show": false, "system": "sum",
              "type": "rate", "input": "cons_elev" },
            { "key": "pct", "header": "% Cons", "unit": "percent", "band": true, "system": "derive",
              "type": "percent", "occupied": "storage", "capacity": "cons_storage" }
        ],
        "blocks": [
            { "heading": "Mainstem", "projects": ["ALPH", "BRVO", "SYS"], "spacer": true,
              "overrides": [ { "project": "BRVO", "from_field": "storage", "text": "See note *" } ] }
        ]
    }"#;

    fn table() -> ProjectTable {
        ProjectTable::from_csv(PROJECTS_CSV).unwrap()
    }

    #[test]
    fn parses_layout_with_defaults() {
        let config = BulletinConfig::from_json(LAYOUT).unwrap();
        assert_eq!(config.sample_hour, 6);
        assert_eq!(config.period_hours, 24);
        assert_eq!(config.markers.missing, "M");
        assert_eq!(config.system.as_ref().unwrap().code, "SYS");
        assert_eq!(config.column_count(), 5);
        let change = config.field("change").unwrap();
        assert!(matches!(
            change.kind,
            FieldKind::Delta { alert_threshold, .. } if alert_threshold == 1.0
        ));
        assert!(config.is_system("SYS"));
        config.validate(&table()).unwrap();
    }

    #[test]
    fn rejects_forward_reference() {
        let mut config = BulletinConfig::from_json(LAYOUT).unwrap();
        config.fields.swap(0, 2);
        let err = config.validate(&table()).unwrap_err();
        assert!(matches!(err, BulletinError::FieldOrder { ref field, .. } if field == "change"));
    }

    #[test]
    fn rejects_unknown_field_reference() {
        let mut config = BulletinConfig::from_json(LAYOUT).unwrap();
        config.fields[2].kind = FieldKind::Delta {
            current: "elev".into(),
            prior: "nonexistent".into(),
            alert_threshold: 1.0,
        };
        let err = config.validate(&table()).unwrap_err();
        assert!(matches!(err, BulletinError::UnknownField { ref reference, .. } if reference == "nonexistent"));
    }

    #[test]
    fn rejects_unknown_project_and_zone() {
        let mut config = BulletinConfig::from_json(LAYOUT).unwrap();
        config.blocks[0].projects.push("ZULU".into());
        assert!(matches!(
            config.validate(&table()),
            Err(BulletinError::UnknownProject(_))
        ));

        let mut config = BulletinConfig::from_json(LAYOUT).unwrap();
        config.fields[4].kind = FieldKind::Zone { zone: "flood".into() };
        assert!(matches!(
            config.validate(&table()),
            Err(BulletinError::UnknownZone { .. })
        ));
    }

    #[test]
    fn rejects_system_derive_of_database_field() {
        let mut config = BulletinConfig::from_json(LAYOUT).unwrap();
        config.fields[0].system = SystemRule::Derive;
        assert!(matches!(config.validate(&table()), Err(BulletinError::Config(_))));
    }

    #[test]
    fn rejects_out_of_range_period_and_offset() {
        let mut config = BulletinConfig::from_json(LAYOUT).unwrap();
        config.period_hours = i64::MAX / 2;
        let err = config.validate(&table()).unwrap_err();
        assert!(matches!(err, BulletinError::Config(ref msg) if msg.contains("period_hours")));

        config.period_hours = 0;
        assert!(matches!(config.validate(&table()), Err(BulletinError::Config(_))));

        config.period_hours = MAX_PERIOD_HOURS;
        config.validate(&table()).unwrap();

        config.utc_offset_hours = -24;
        let err = config.validate(&table()).unwrap_err();
        assert!(matches!(err, BulletinError::Config(ref msg) if msg.contains("utc_offset_hours")));
    }

    #[test]
    fn project_named_like_system_row_passes_table_but_fails_layout() {
        let csv = format!("{}SYS,Sys Lake,SYS,,local,,\n", PROJECTS_CSV);
        let projects = ProjectTable::from_csv(&csv).unwrap();
        let config = BulletinConfig::from_json(LAYOUT).unwrap();
        assert!(matches!(config.validate(&projects), Err(BulletinError::Config(_))));
    }

    #[test]
    fn rejects_override_outside_block() {
        let mut config = BulletinConfig::from_json(LAYOUT).unwrap();
        config.blocks[0].overrides[0].project = "ZULU".into();
        assert!(matches!(config.validate(&table()), Err(BulletinError::Config(_))));
    }
}
