use crate::error::{BulletinError, Result};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default code of the summed mainstem pseudo-project.
pub const SYSTEM_CODE: &str = "SYS";

/// Hour-of-day convention of a project's instantaneous samples.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeConvention {
    /// Sampled at the bulletin's local sample hour (e.g. 0600)
    #[default]
    Local,
    /// Sampled at midnight GMT
    GmtMidnight,
}

/// A reservoir or gauge row of the bulletin with its database metadata.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Short code, e.g. "ALPH"
    pub code: String,
    pub name: String,
    /// Database location key substituted into series and level patterns
    pub location: String,
    /// Elevation-storage rating curve; `None` for projects without one
    pub rating_curve: Option<String>,
    pub convention: TimeConvention,
    /// Operated by another agency; rendered with a marker
    pub non_corps: bool,
    /// Field and zone keys that structurally do not apply to this project
    pub not_applicable: BTreeSet<String>,
}

impl Project {
    pub fn has_rating(&self) -> bool {
        self.rating_curve.is_some()
    }

    /// False when `key` (a field or zone key) is configured as not applicable.
    pub fn is_applicable(&self, key: &str) -> bool {
        !self.not_applicable.contains(key)
    }

    /// Substitute `{location}` and `{code}` into a series or level pattern.
    pub fn substitute(&self, pattern: &str) -> String {
        pattern
            .replace("{location}", &self.location)
            .replace("{code}", &self.code)
    }

    fn parse_bool(ess: &str) -> bool {
        matches!(
            ess.trim().to_lowercase().as_str(),
            "y" | "yes" | "true" | "1" | "x"
        )
    }

    fn parse_convention(ess: &str) -> Result<TimeConvention> {
        match ess.trim().to_lowercase().as_str() {
            "" | "local" => Ok(TimeConvention::Local),
            "gmt" | "midnight" | "gmt_midnight" => Ok(TimeConvention::GmtMidnight),
            other => Err(BulletinError::Config(format!(
                "unknown time convention '{}'",
                other
            ))),
        }
    }

    /// Parse a CSV string of projects.
    ///
    /// Expected CSV columns (with headers):
    /// `CODE,NAME,LOCATION,RATING_CURVE,CONVENTION,NON_CORPS,NOT_APPLICABLE`
    ///
    /// `RATING_CURVE` may be empty (no rating), `CONVENTION` is `local` or
    /// `gmt`, and `NOT_APPLICABLE` is a `;`-separated list of keys.
    pub fn parse_project_csv(csv_object: &str) -> Result<Vec<Project>> {
        let mut project_list: Vec<Project> = Vec::new();
        let mut rdr = ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_object.as_bytes());
        for (line, row) in rdr.records().enumerate() {
            let rho = row?;
            let field = |i: usize| rho.get(i).unwrap_or("").trim();
            let code = field(0);
            if code.is_empty() {
                return Err(BulletinError::Config(format!(
                    "project row {} has no code",
                    line + 1
                )));
            }
            let rating_curve = match field(3) {
                "" => None,
                curve => Some(curve.to_string()),
            };
            let not_applicable = field(6)
                .split(';')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect();
            project_list.push(Project {
                code: code.to_string(),
                name: field(1).to_string(),
                location: field(2).to_string(),
                rating_curve,
                convention: Project::parse_convention(field(4))?,
                non_corps: Project::parse_bool(field(5)),
                not_applicable,
            });
        }
        Ok(project_list)
    }
}

/// The static project table of a run, in file order.
#[derive(Debug, Clone, Default)]
pub struct ProjectTable {
    projects: Vec<Project>,
}

impl ProjectTable {
    /// Build a table, rejecting duplicate codes. A collision with the system
    /// row's code is caught by `BulletinConfig::validate`.
    pub fn new(projects: Vec<Project>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for p in &projects {
            if !seen.insert(p.code.as_str()) {
                return Err(BulletinError::Config(format!(
                    "duplicate project code '{}'",
                    p.code
                )));
            }
        }
        log::info!("[WMB] project table: {} projects", projects.len());
        Ok(ProjectTable { projects })
    }

    pub fn from_csv(csv_object: &str) -> Result<Self> {
        ProjectTable::new(Project::parse_project_csv(csv_object)?)
    }

    pub fn get(&self, code: &str) -> Result<&Project> {
        self.find(code)
            .ok_or_else(|| BulletinError::UnknownProject(code.to_string()))
    }

    pub fn find(&self, code: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.code == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.find(code).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
