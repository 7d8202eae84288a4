//! CSV data loading functions for populating the bulletin database.
//!
//! Each loader parses CSV data from a string slice and inserts rows into the
//! corresponding table. None of the formats carry a header row; lines
//! starting with `#` are comments.
//!
//! # CSV Formats
//!
//! - **Series samples**: `series_id,timestamp,value`
//! - **Location levels**: `level_id,effective,value`
//! - **Rating points**: `curve_id,effective,independent,dependent`
//!
//! Timestamps are UTC, `YYYY-MM-DDTHH:MM` (a space instead of `T` is accepted).

use crate::Database;
use rusqlite::params;
use wmb_utils::dates::{format_timestamp, parse_timestamp};

fn reader(csv_data: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes())
}

/// Normalize a timestamp to the stored form so text comparison is ordering.
fn stored_timestamp(raw: &str) -> anyhow::Result<String> {
    let ts = parse_timestamp(raw)
        .map_err(|e| anyhow::anyhow!("bad timestamp '{}': {}", raw, e))?;
    Ok(format_timestamp(&ts))
}

impl Database {
    /// Load time series samples from CSV string.
    ///
    /// Expected format (no headers): `series_id,timestamp,value`
    ///
    /// A value that is empty or non-numeric (e.g. `M`, `---`) is stored as
    /// NULL and reads back as the undefined sentinel, so the gap stays
    /// visible to the instant reader instead of silently vanishing.
    ///
    /// # Example CSV
    /// ```text
    /// ALPH.Elev.Inst.1Hour.0.Best,2024-03-01T12:00,1150.2
    /// ALPH.Elev.Inst.1Hour.0.Best,2024-02-29T12:00,M
    /// ```
    pub fn load_series(&self, csv_data: &str) -> anyhow::Result<()> {
        let conn = self.conn.borrow();
        let mut rdr = reader(csv_data);

        let mut count = 0u32;
        let mut undefined = 0u32;
        for result in rdr.records() {
            let r = result?;
            let series_id = r.get(0).unwrap_or("");
            let ts = r.get(1).unwrap_or("");
            if series_id.is_empty() || ts.is_empty() {
                anyhow::bail!("series row {} is missing its id or timestamp", count + 1);
            }
            let value: Option<f64> = r.get(2).and_then(|v| v.parse().ok());
            if value.is_none() {
                undefined += 1;
            }

            conn.execute(
                "INSERT OR REPLACE INTO series_values (series_id, ts, value)
                 VALUES (?1, ?2, ?3)",
                params![series_id, stored_timestamp(ts)?, value],
            )?;
            count += 1;
        }
        log::info!(
            "[WMB] loader: Loaded {} series samples ({} undefined)",
            count,
            undefined
        );
        Ok(())
    }

    /// Load location level values from CSV string.
    ///
    /// Expected format (no headers): `level_id,effective,value`
    ///
    /// # Example CSV
    /// ```text
    /// ALPH.Elev.Inst.0.Top of Conservation,2000-01-01T00:00,1200.0
    /// ```
    pub fn load_levels(&self, csv_data: &str) -> anyhow::Result<()> {
        let conn = self.conn.borrow();
        let mut rdr = reader(csv_data);

        let mut count = 0u32;
        for result in rdr.records() {
            let r = result?;
            let level_id = r.get(0).unwrap_or("");
            let effective = stored_timestamp(r.get(1).unwrap_or(""))?;
            let value: f64 = r.get(2).unwrap_or("").parse().map_err(|_| {
                anyhow::anyhow!("level '{}' has a non-numeric value", level_id)
            })?;

            conn.execute(
                "INSERT OR REPLACE INTO location_levels (level_id, effective, value)
                 VALUES (?1, ?2, ?3)",
                params![level_id, effective, value],
            )?;
            count += 1;
        }
        log::info!("[WMB] loader: Loaded {} location levels", count);
        Ok(())
    }

    /// Load rating table points from CSV string.
    ///
    /// Expected format (no headers): `curve_id,effective,independent,dependent`
    ///
    /// Each distinct `effective` instant of a curve is one version of its
    /// table.
    ///
    /// # Example CSV
    /// ```text
    /// ALPH.Elev;Stor.Linear.Step,2000-01-01T00:00,1000.0,0.0
    /// ALPH.Elev;Stor.Linear.Step,2000-01-01T00:00,1200.0,20000.0
    /// ```
    pub fn load_ratings(&self, csv_data: &str) -> anyhow::Result<()> {
        let conn = self.conn.borrow();
        let mut rdr = reader(csv_data);

        let mut count = 0u32;
        for result in rdr.records() {
            let r = result?;
            let curve_id = r.get(0).unwrap_or("");
            let effective = stored_timestamp(r.get(1).unwrap_or(""))?;
            let independent: f64 = r.get(2).unwrap_or("").parse()?;
            let dependent: f64 = r.get(3).unwrap_or("").parse()?;

            conn.execute(
                "INSERT OR REPLACE INTO rating_points (curve_id, effective, independent, dependent)
                 VALUES (?1, ?2, ?3, ?4)",
                params![curve_id, effective, independent, dependent],
            )?;
            count += 1;
        }
        log::info!("[WMB] loader: Loaded {} rating points", count);
        Ok(())
    }
}
