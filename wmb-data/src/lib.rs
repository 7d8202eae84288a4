//! Metric derivation, aggregation and classification for water management
//! bulletins.
//!
//! This crate turns raw series, zone levels and rating lookups into the
//! per-project metric records a bulletin table is built from:
//!
//! - [`rating`]: rating table interpolation used by database back-ends
//! - [`metrics`]: pure arithmetic on [`MetricValue`](wmb_model::metric::MetricValue)s
//! - [`derive`]: the per-project derivation engine
//! - [`aggregate`]: system sums over mainstem members
//! - [`classify`]: status bands for percentage metrics
//! - [`pipeline`]: one data block, start to finish

pub mod aggregate;
pub mod classify;
pub mod derive;
pub mod metrics;
pub mod pipeline;
pub mod rating;

#[cfg(test)]
pub(crate) mod testing;
