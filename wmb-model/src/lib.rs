pub mod band;
pub mod config;
pub mod error;
pub mod gateway;
pub mod metric;
pub mod period;
pub mod project;
pub mod zone;
