//! Derive every record a data block needs, in block order.

use crate::aggregate::system_record;
use crate::derive::MetricEngine;
use log::info;
use wmb_model::config::BlockDef;
use wmb_model::error::{BulletinError, Result};
use wmb_model::gateway::HydroGateway;
use wmb_model::metric::MetricRecord;
use wmb_model::project::ProjectTable;

/// Records of one data block, one per configured row, in block order.
#[derive(Debug)]
pub struct BlockMetrics<'c> {
    pub block: &'c BlockDef,
    pub records: Vec<MetricRecord>,
}

impl BlockMetrics<'_> {
    pub fn record(&self, code: &str) -> Option<&MetricRecord> {
        self.records.iter().find(|r| r.project() == code)
    }
}

/// Compute a block.
///
/// Real projects are derived first, in block order. When the block shows the
/// system row, members that are not rows of the block are derived as well
/// (but not returned), and the system record is built last from all members.
pub fn compute_block<'c, G: HydroGateway + ?Sized>(
    engine: &MetricEngine<'c, G>,
    projects: &ProjectTable,
    block: &'c BlockDef,
) -> Result<BlockMetrics<'c>> {
    let config = engine.config();
    let mut derived: Vec<MetricRecord> = Vec::new();

    for code in block.projects.iter().filter(|c| !config.is_system(c)) {
        derived.push(engine.derive_project(projects.get(code)?)?);
    }

    let mut system = None;
    if let Some(def) = config.system.as_ref().filter(|s| block.projects.contains(&s.code)) {
        for code in &def.members {
            if !derived.iter().any(|r| r.project() == code) {
                derived.push(engine.derive_project(projects.get(code)?)?);
            }
        }
        let members: Vec<&MetricRecord> = derived
            .iter()
            .filter(|r| def.members.iter().any(|m| m == r.project()))
            .collect();
        system = Some(system_record(config, def, &members)?);
    }

    let mut records = Vec::with_capacity(block.projects.len());
    for code in &block.projects {
        let record = if config.is_system(code) {
            system.clone()
        } else {
            derived.iter().find(|r| r.project() == code).cloned()
        };
        records.push(record.ok_or_else(|| BulletinError::UnknownProject(code.clone()))?);
    }

    info!(
        "block '{}': {} rows derived ({} records computed)",
        block.heading,
        records.len(),
        derived.len() + usize::from(system.is_some())
    );
    Ok(BlockMetrics { block, records })
}

/// Compute every block of the engine's layout, in layout order.
pub fn compute_bulletin<'c, G: HydroGateway + ?Sized>(
    engine: &MetricEngine<'c, G>,
    projects: &ProjectTable,
) -> Result<Vec<BlockMetrics<'c>>> {
    engine
        .config()
        .blocks
        .iter()
        .map(|block| compute_block(engine, projects, block))
        .collect()
}
