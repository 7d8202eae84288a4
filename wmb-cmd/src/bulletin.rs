//! Generate a bulletin: derive, aggregate, build the table, render, write.

use crate::session::Session;
use chrono::NaiveDate;
use log::info;
use std::fs;
use std::path::Path;
use wmb_data::derive::MetricEngine;
use wmb_data::pipeline::compute_bulletin;
use wmb_table::{build_table, render, Format, TableModel};
use wmb_utils::dates::parse_date;

impl Session {
    /// Derive every block for `date` and assemble the table.
    ///
    /// Fails only on configuration errors and lost connectivity; data gaps
    /// show up as missing markers in the table.
    pub fn generate(&self, date: NaiveDate) -> wmb_model::error::Result<TableModel> {
        let engine = MetricEngine::new(self.database(), &self.config, self.config.period(date));
        let blocks = compute_bulletin(&engine, &self.projects)?;
        Ok(build_table(&self.config, &self.projects, date, &blocks))
    }
}

pub fn run_bulletin(
    config_path: &Path,
    projects_path: &Path,
    data_dir: &Path,
    date: &str,
    output: &str,
    format: &str,
) -> anyhow::Result<()> {
    let date = parse_date(date)?;
    let format: Format = format.parse()?;
    let session = Session::open(config_path, projects_path, data_dir)?;

    info!("Generating '{}' for {}", session.config.title, date);
    let table = session.generate(date)?;
    let rendered = render(&table, format)?;

    if output == "-" {
        print!("{}", rendered);
    } else {
        fs::write(output, rendered)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", output, e))?;
        info!("Bulletin complete. Output: {}", output);
    }
    Ok(())
}
