//! SQLite database layer serving bulletin time series, location levels and
//! rating tables.
//!
//! # Architecture
//!
//! - `Rc<RefCell<Connection>>` wrapper: the bulletin pipeline is
//!   single-threaded and opens one handle per run
//! - In-memory SQLite (loaded from CSV exports) or an existing database file
//! - Implements the [`wmb_model::gateway`] traits so the derivation engine
//!   never sees SQL
//!
//! # Usage
//!
//! ```rust
//! use wmb_db::Database;
//!
//! let db = Database::new().unwrap();
//! db.load_series("ALPH.Elev.Inst.1Hour.0.Best,2024-03-01T12:00,1150.2\n").unwrap();
//! db.load_levels("ALPH.Elev.Inst.0.Top of Conservation,2000-01-01T00:00,1200.0\n").unwrap();
//! db.load_ratings("ALPH.Elev;Stor.Linear.Step,2000-01-01T00:00,1000.0,0.0\nALPH.Elev;Stor.Linear.Step,2000-01-01T00:00,1200.0,20000.0\n").unwrap();
//! ```
//!
//! # Tables
//!
//! See [`schema::create_schema`] for the full SQL schema.
//!
//! - `series_values` - timestamped samples (UTC); `NULL` values read back as
//!   the undefined sentinel
//! - `location_levels` - level values with the instant they take effect
//! - `rating_points` - rating table points, versioned by effective instant

pub mod schema;
mod loader;
mod queries;

pub use queries::Inventory;

use rusqlite::{Connection, OpenFlags};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// SQLite database backing one bulletin run.
///
/// Cheaply cloneable (via `Rc`); the connection closes when the last clone
/// is dropped.
#[derive(Clone)]
pub struct Database {
    conn: Rc<RefCell<Connection>>,
}

impl Database {
    /// Create a new in-memory database with the full schema applied.
    ///
    /// The database is empty after creation; use the `load_*` methods
    /// to populate it with CSV data.
    pub fn new() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::create_schema())?;
        Ok(Self {
            conn: Rc::new(RefCell::new(conn)),
        })
    }

    /// Open an existing database file read-only.
    ///
    /// The file must already carry the schema; it is checked on open so a
    /// wrong or corrupt file fails here rather than mid-run.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let tables: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table'
             AND name IN ('series_values', 'location_levels', 'rating_points')",
            [],
            |row| row.get(0),
        )?;
        if tables != 3 {
            anyhow::bail!(
                "{} is missing bulletin tables ({} of 3 present)",
                path.display(),
                tables
            );
        }
        log::info!("[WMB] db: opened {}", path.display());
        Ok(Self {
            conn: Rc::new(RefCell::new(conn)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_creates_successfully() {
        let db = Database::new();
        assert!(db.is_ok(), "Database should create without errors");
    }

    #[test]
    fn database_is_cloneable() {
        let db = Database::new().unwrap();
        let db2 = db.clone();
        db.load_series("ALPH.Elev,2024-03-01T12:00,1150.0\n").unwrap();
        assert_eq!(db2.sample_count().unwrap(), 1, "Clone should see same data via shared Rc");
    }

    #[test]
    fn open_missing_file_fails() {
        let result = Database::open(Path::new("/nonexistent/dir/bulletin.sqlite"));
        assert!(result.is_err());
    }
}
