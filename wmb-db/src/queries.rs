//! Gateway implementations over the SQLite tables.
//!
//! Lookups never fail on a data gap with anything but a soft
//! [`GatewayError`]; the derivation engine turns those into missing values.
//! SQLite failures that mean the handle itself is unusable are reported as
//! [`GatewayError::Connection`] so the run aborts.

use crate::Database;
use chrono::{DateTime, Utc};
use rusqlite::{params, ErrorCode, OptionalExtension};
use wmb_data::rating::{RatingPoint, RatingTable};
use wmb_model::gateway::{
    GatewayError, LevelService, RatingService, Sample, TimeSeriesGateway, UNDEFINED,
};
use wmb_model::period::TimeWindow;
use wmb_utils::dates::{format_timestamp, parse_timestamp};

fn gateway_error(e: rusqlite::Error) -> GatewayError {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::CannotOpen
            | ErrorCode::NotADatabase
            | ErrorCode::DatabaseCorrupt
            | ErrorCode::SystemIoFailure => GatewayError::Connection(e.to_string()),
            _ => GatewayError::Query(e.to_string()),
        },
        _ => GatewayError::Query(e.to_string()),
    }
}

/// Row counts of each table, for run logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inventory {
    pub samples: i64,
    pub levels: i64,
    pub rating_points: i64,
}

impl Database {
    /// Number of stored series samples, undefined ones included.
    pub fn sample_count(&self) -> anyhow::Result<i64> {
        let conn = self.conn.borrow();
        let count = conn.query_row("SELECT COUNT(*) FROM series_values", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Row counts of all three tables.
    pub fn inventory(&self) -> anyhow::Result<Inventory> {
        let conn = self.conn.borrow();
        let inventory = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM series_values),
                    (SELECT COUNT(*) FROM location_levels),
                    (SELECT COUNT(*) FROM rating_points)",
            [],
            |row| {
                Ok(Inventory {
                    samples: row.get(0)?,
                    levels: row.get(1)?,
                    rating_points: row.get(2)?,
                })
            },
        )?;
        log::info!(
            "[WMB] query: inventory {} samples, {} levels, {} rating points",
            inventory.samples,
            inventory.levels,
            inventory.rating_points
        );
        Ok(inventory)
    }
}

impl TimeSeriesGateway for Database {
    fn read(&self, series_id: &str, window: &TimeWindow) -> Result<Vec<Sample>, GatewayError> {
        let conn = self.conn.borrow();
        let mut stmt = conn
            .prepare(
                "SELECT ts, value FROM series_values
                 WHERE series_id = ?1 AND ts >= ?2 AND ts <= ?3
                 ORDER BY ts",
            )
            .map_err(gateway_error)?;
        let rows = stmt
            .query_map(
                params![
                    series_id,
                    format_timestamp(&window.start),
                    format_timestamp(&window.end)
                ],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<f64>>(1)?)),
            )
            .map_err(gateway_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(gateway_error)?;

        if rows.is_empty() {
            let known: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM series_values WHERE series_id = ?1)",
                    [series_id],
                    |row| row.get(0),
                )
                .map_err(gateway_error)?;
            if !known {
                return Err(GatewayError::NotFound(format!("series {}", series_id)));
            }
        }

        let samples = rows
            .into_iter()
            .map(|(ts, value)| {
                let time = parse_timestamp(&ts)
                    .map_err(|e| GatewayError::Query(format!("stored timestamp '{}': {}", ts, e)))?;
                Ok(Sample {
                    time,
                    value: value.unwrap_or(UNDEFINED),
                })
            })
            .collect::<Result<Vec<_>, GatewayError>>()?;
        log::debug!(
            "[WMB] query: read {} returned {} samples",
            series_id,
            samples.len()
        );
        Ok(samples)
    }
}

impl LevelService for Database {
    fn level_value(&self, level_id: &str, as_of: DateTime<Utc>) -> Result<f64, GatewayError> {
        let conn = self.conn.borrow();
        conn.query_row(
            "SELECT value FROM location_levels
             WHERE level_id = ?1 AND effective <= ?2
             ORDER BY effective DESC LIMIT 1",
            params![level_id, format_timestamp(&as_of)],
            |row| row.get(0),
        )
        .optional()
        .map_err(gateway_error)?
        .ok_or_else(|| {
            GatewayError::NotFound(format!("level {} at {}", level_id, format_timestamp(&as_of)))
        })
    }
}

impl RatingService for Database {
    fn rate(&self, curve_id: &str, value: f64, as_of: DateTime<Utc>) -> Result<f64, GatewayError> {
        let conn = self.conn.borrow();
        let effective: Option<String> = conn
            .query_row(
                "SELECT MAX(effective) FROM rating_points
                 WHERE curve_id = ?1 AND effective <= ?2",
                params![curve_id, format_timestamp(&as_of)],
                |row| row.get(0),
            )
            .map_err(gateway_error)?;
        let effective = effective.ok_or_else(|| {
            GatewayError::NotFound(format!("rating {} at {}", curve_id, format_timestamp(&as_of)))
        })?;

        let mut stmt = conn
            .prepare(
                "SELECT independent, dependent FROM rating_points
                 WHERE curve_id = ?1 AND effective = ?2",
            )
            .map_err(gateway_error)?;
        let points = stmt
            .query_map(params![curve_id, effective], |row| {
                Ok(RatingPoint {
                    independent: row.get(0)?,
                    dependent: row.get(1)?,
                })
            })
            .map_err(gateway_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(gateway_error)?;

        RatingTable::new(points)
            .rate(value)
            .ok_or_else(|| GatewayError::OutOfDomain {
                curve: curve_id.to_string(),
                value,
            })
    }
}
