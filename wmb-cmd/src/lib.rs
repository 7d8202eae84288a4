//! Command implementations for the WMB CLI.
//!
//! Provides subcommands for generating a bulletin, validating a layout and
//! inspecting zone fallback resolution.

use clap::Subcommand;
use std::path::PathBuf;

pub mod bulletin;
pub mod session;
pub mod zones;

#[derive(Subcommand)]
pub enum Command {
    /// Generate a bulletin for one reporting date
    Bulletin {
        /// Bulletin layout (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Project table (CSV)
        #[arg(short, long)]
        projects: PathBuf,

        /// Directory holding bulletin.sqlite, or series.csv / levels.csv / ratings.csv
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Reporting date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Output path, or `-` for stdout
        #[arg(short, long)]
        output: String,

        /// Output format: csv, json or text
        #[arg(short, long, default_value = "csv")]
        format: String,
    },

    /// Load and validate a layout against a project table
    Validate {
        /// Bulletin layout (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Project table (CSV)
        #[arg(short, long)]
        projects: PathBuf,
    },

    /// Show which level name satisfied each zone, per project
    Zones {
        /// Bulletin layout (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Project table (CSV)
        #[arg(short, long)]
        projects: PathBuf,

        /// Directory holding bulletin.sqlite, or series.csv / levels.csv / ratings.csv
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Reporting date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
    },
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Bulletin {
            config,
            projects,
            data_dir,
            date,
            output,
            format,
        } => bulletin::run_bulletin(&config, &projects, &data_dir, &date, &output, &format),
        Command::Validate { config, projects } => session::run_validate(&config, &projects),
        Command::Zones {
            config,
            projects,
            data_dir,
            date,
        } => zones::run_zones(&config, &projects, &data_dir, &date),
    }
}
