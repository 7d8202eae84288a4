//! SQL schema definitions for the bulletin database.
//!
//! All timestamps are TEXT in `YYYY-MM-DDTHH:MM` UTC form, so lexical and
//! chronological order agree.

/// Returns the full SQL schema as a single batch string.
///
/// - `series_values` - (series_id, ts, value); value may be NULL for an
///   undefined sample
/// - `location_levels` - (level_id, effective, value)
/// - `rating_points` - (curve_id, effective, independent, dependent)
pub fn create_schema() -> &'static str {
    r#"
    CREATE TABLE IF NOT EXISTS series_values (
        series_id TEXT NOT NULL,
        ts TEXT NOT NULL,
        value REAL,
        PRIMARY KEY (series_id, ts)
    );

    CREATE TABLE IF NOT EXISTS location_levels (
        level_id TEXT NOT NULL,
        effective TEXT NOT NULL,
        value REAL NOT NULL,
        PRIMARY KEY (level_id, effective)
    );

    CREATE TABLE IF NOT EXISTS rating_points (
        curve_id TEXT NOT NULL,
        effective TEXT NOT NULL,
        independent REAL NOT NULL,
        dependent REAL NOT NULL,
        PRIMARY KEY (curve_id, effective, independent)
    );
    CREATE INDEX IF NOT EXISTS idx_rating_curve ON rating_points(curve_id, effective);
    "#
}
