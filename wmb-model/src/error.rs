/// Error types for bulletin generation
use thiserror::Error;

/// Fatal errors for a bulletin run.
///
/// Data gaps never appear here: they are downgraded to
/// [`MetricValue::Missing`](crate::metric::MetricValue::Missing) where they
/// occur. Only configuration and connectivity problems stop a run.
#[derive(Error, Debug)]
pub enum BulletinError {
    /// Generic configuration problem in the layout or project table
    #[error("Configuration error: {0}")]
    Config(String),

    /// Layout references a project code with no project table entry
    #[error("Unknown project referenced in layout: {0}")]
    UnknownProject(String),

    /// Field references a zone with no zone definition
    #[error("Field '{field}' references unknown zone '{zone}'")]
    UnknownZone { field: String, zone: String },

    /// Field or override references a field key that does not exist
    #[error("'{field}' references unknown field '{reference}'")]
    UnknownField { field: String, reference: String },

    /// Field depends on a field declared at or after its own position
    #[error("Field '{field}' depends on '{depends_on}', which is not declared before it")]
    FieldOrder { field: String, depends_on: String },

    /// Database or rating service became unreachable
    #[error("Database connection lost: {0}")]
    Connection(String),

    /// Failed to parse CSV data
    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),

    /// Failed to parse JSON layout
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Failed to read a configuration file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Date or time could not be constructed
    #[error("Failed to build date/time: {0}")]
    DateTime(String),
}

/// Type alias for Results using BulletinError
pub type Result<T> = std::result::Result<T, BulletinError>;
