//! Cell text for headers, project names and metric values.

use wmb_model::config::{BulletinConfig, FieldDef};
use wmb_model::metric::MetricValue;
use wmb_model::project::Project;
use wmb_utils::numbers::format_grouped;

/// Placeholder in field headers replaced by the storage unit label.
pub const STORAGE_UNIT_PLACEHOLDER: &str = "{storage_unit}";

/// Column header text for a field.
pub fn header_text(field: &FieldDef, config: &BulletinConfig) -> String {
    let header = if field.header.is_empty() {
        field.key.as_str()
    } else {
        field.header.as_str()
    };
    header.replace(STORAGE_UNIT_PLACEHOLDER, &config.storage.label)
}

/// Name cell text; non-Corps projects carry the configured marker.
pub fn project_label(project: &Project, config: &BulletinConfig) -> String {
    if project.non_corps {
        format!("{}{}", project.name, config.markers.non_corps)
    } else {
        project.name.clone()
    }
}

/// Display text of a value: scaled and grouped numbers, or a marker.
pub fn value_text(value: MetricValue, field: &FieldDef, config: &BulletinConfig) -> String {
    match value {
        MetricValue::Value(v) => {
            let scaled = if field.unit.is_storage() {
                v * config.storage.scale
            } else {
                v
            };
            format_grouped(scaled, field.decimals)
        }
        MetricValue::Missing => config.markers.missing.clone(),
        MetricValue::Null => config.markers.null.clone(),
    }
}
