use crate::project::Project;
use serde::{Deserialize, Serialize};

/// A named reservoir operating threshold (e.g. top of conservation pool)
/// and the location-level names it may be stored under.
///
/// Patterns accept the `{location}` and `{code}` placeholders.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ZoneDef {
    pub key: String,
    #[serde(default)]
    pub name: String,
    /// Project-specific level name, tried first
    pub project_level: String,
    /// Generic level name, tried second
    pub generic_level: String,
    /// Alternate inactive-pool level name, tried last
    #[serde(default)]
    pub inactive_level: Option<String>,
    /// Projects allowed to fall back to `inactive_level`
    #[serde(default)]
    pub inactive_projects: Vec<String>,
}

impl ZoneDef {
    /// Level names to try for `project`, in order.
    pub fn candidates(&self, project: &Project) -> Vec<String> {
        let mut names = vec![
            project.substitute(&self.project_level),
            project.substitute(&self.generic_level),
        ];
        if let Some(inactive) = &self.inactive_level {
            if self.inactive_projects.iter().any(|c| c == &project.code) {
                names.push(project.substitute(inactive));
            }
        }
        names.dedup();
        names
    }
}
