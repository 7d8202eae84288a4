//! Interfaces to the hydrologic database: time series reads, location level
//! lookups and rating-curve evaluation.
//!
//! The engine only ever talks to these traits. `wmb-db` provides the SQLite
//! implementation; tests provide in-memory doubles.

use crate::period::TimeWindow;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Sentinel the database uses for an undefined sample value.
pub const UNDEFINED: f64 = -3.402_823_466_385_288_6e38;

/// A single timestamped series value. `value` may be [`UNDEFINED`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn is_defined(&self) -> bool {
        self.value.is_finite() && self.value != UNDEFINED
    }
}

/// Failures reported by a gateway.
///
/// Only [`GatewayError::Connection`] is fatal to a run; every other variant
/// is downgraded to a missing value by the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// Series, level or curve does not exist, or has no value at the instant
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rating input lies outside the curve's table
    #[error("Value {value} is outside the domain of rating curve {curve}")]
    OutOfDomain { curve: String, value: f64 },

    /// Query failed for a reason other than connectivity
    #[error("Query failed: {0}")]
    Query(String),

    /// The underlying database handle is unusable
    #[error("Connection failure: {0}")]
    Connection(String),
}

impl GatewayError {
    pub fn is_connection(&self) -> bool {
        matches!(self, GatewayError::Connection(_))
    }
}

/// Ordered series reads over a closed time window.
pub trait TimeSeriesGateway {
    /// Return all samples of `series_id` with `window.start <= time <= window.end`,
    /// ordered by time ascending.
    fn read(&self, series_id: &str, window: &TimeWindow) -> Result<Vec<Sample>, GatewayError>;
}

/// Location level (zone elevation) lookups.
pub trait LevelService {
    /// Value of `level_id` in effect at `as_of`.
    fn level_value(&self, level_id: &str, as_of: DateTime<Utc>) -> Result<f64, GatewayError>;
}

/// Rating-curve evaluation.
pub trait RatingService {
    /// Dependent value of `curve_id` at independent value `value`, using the
    /// curve version in effect at `as_of`.
    fn rate(&self, curve_id: &str, value: f64, as_of: DateTime<Utc>) -> Result<f64, GatewayError>;
}

/// Everything the derivation engine needs from the database.
pub trait HydroGateway: TimeSeriesGateway + LevelService + RatingService {}

impl<T: TimeSeriesGateway + LevelService + RatingService + ?Sized> HydroGateway for T {}
