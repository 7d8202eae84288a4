//! One bulletin run's loaded inputs and its database handle.
//!
//! The handle is released when the session drops, on success and on every
//! error path alike.

use log::{info, warn};
use std::fs;
use std::path::Path;
use wmb_db::Database;
use wmb_model::config::BulletinConfig;
use wmb_model::project::ProjectTable;

/// File name of a prepared database inside a data directory.
pub const DATABASE_FILE: &str = "bulletin.sqlite";

pub struct Session {
    pub config: BulletinConfig,
    pub projects: ProjectTable,
    db: Database,
}

/// Load a layout and a project table and check them against each other.
pub fn load_layout(config_path: &Path, projects_path: &Path) -> anyhow::Result<(BulletinConfig, ProjectTable)> {
    let config = BulletinConfig::load(config_path)?;
    let projects_csv = fs::read_to_string(projects_path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", projects_path.display(), e))?;
    let projects = ProjectTable::from_csv(&projects_csv)?;
    config.validate(&projects)?;
    Ok((config, projects))
}

/// Open the data behind a run: a prepared SQLite file when the directory has
/// one, otherwise the CSV exports loaded into memory.
///
/// `series.csv` is required; `levels.csv` and `ratings.csv` may be absent, in
/// which case every zone or rating lookup comes back missing.
pub fn open_data_dir(data_dir: &Path) -> anyhow::Result<Database> {
    let db_file = data_dir.join(DATABASE_FILE);
    if db_file.exists() {
        return Database::open(&db_file);
    }

    let db = Database::new()?;
    let series_path = data_dir.join("series.csv");
    let series = fs::read_to_string(&series_path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", series_path.display(), e))?;
    db.load_series(&series)?;

    for (name, load) in [
        ("levels.csv", Database::load_levels as fn(&Database, &str) -> anyhow::Result<()>),
        ("ratings.csv", Database::load_ratings),
    ] {
        let path = data_dir.join(name);
        if path.exists() {
            load(&db, &fs::read_to_string(&path)?)?;
        } else {
            warn!("[WMB] session: {} not found, lookups will be missing", path.display());
        }
    }
    db.inventory()?;
    Ok(db)
}

impl Session {
    pub fn new(config: BulletinConfig, projects: ProjectTable, db: Database) -> Self {
        info!(
            "[WMB] session: opened '{}' with {} projects",
            config.name,
            projects.len()
        );
        Session { config, projects, db }
    }

    pub fn open(config_path: &Path, projects_path: &Path, data_dir: &Path) -> anyhow::Result<Self> {
        let (config, projects) = load_layout(config_path, projects_path)?;
        let db = open_data_dir(data_dir)?;
        Ok(Session::new(config, projects, db))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        info!("[WMB] session: released database for '{}'", self.config.name);
    }
}

/// Load and validate only.
pub fn run_validate(config_path: &Path, projects_path: &Path) -> anyhow::Result<()> {
    let (config, projects) = load_layout(config_path, projects_path)?;
    println!(
        "{}: {} fields ({} shown), {} zones, {} blocks, {} projects: OK",
        config.name,
        config.fields.len(),
        config.visible_fields().count(),
        config.zones.len(),
        config.blocks.len(),
        projects.len()
    );
    Ok(())
}
