//! Assemble derived records into a [`TableModel`].
//!
//! Each data block is walked by a [`BlockBuilder`]:
//! `Heading -> Rows(0..N) -> Spacer (optional) -> Done`. A project without a
//! record degrades to a row of missing markers; the block is never aborted.

use crate::format::{header_text, project_label, value_text};
use crate::model::{Cell, HAlign, Row, RowGroup, RowKind, TableModel};
use chrono::NaiveDate;
use log::{debug, warn};
use wmb_data::classify::classify;
use wmb_data::pipeline::BlockMetrics;
use wmb_model::band::StatusBand;
use wmb_model::config::{BlockDef, BulletinConfig, FieldDef};
use wmb_model::metric::{MetricRecord, MetricValue};
use wmb_model::project::ProjectTable;

/// Where a block builder is in its walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Heading,
    Rows(usize),
    Spacer,
    Done,
}

pub struct BlockBuilder<'a> {
    config: &'a BulletinConfig,
    projects: &'a ProjectTable,
    block: &'a BlockDef,
    state: BlockState,
    heading: Option<Row>,
    rows: Vec<Row>,
}

impl<'a> BlockBuilder<'a> {
    pub fn new(config: &'a BulletinConfig, projects: &'a ProjectTable, block: &'a BlockDef) -> Self {
        BlockBuilder {
            config,
            projects,
            block,
            state: BlockState::Heading,
            heading: None,
            rows: Vec::new(),
        }
    }

    pub fn state(&self) -> BlockState {
        self.state
    }

    fn emit_heading(&mut self) {
        if self.state != BlockState::Heading {
            return;
        }
        let cell = Cell::new(self.block.heading.clone())
            .spanning(self.config.column_count())
            .bold();
        self.heading = Some(Row::new(RowKind::Heading, vec![cell]));
        self.state = BlockState::Rows(0);
    }

    /// Emit the row of `code`. `None` renders every field as missing.
    pub fn push_project(&mut self, code: &str, record: Option<&MetricRecord>) {
        self.emit_heading();
        let BlockState::Rows(n) = self.state else {
            return;
        };
        if record.is_none() {
            warn!(
                "block '{}': no record for {}, rendering as missing",
                self.block.heading, code
            );
        }
        let row = self.project_row(code, record);
        debug!("block '{}': row {} {:?} ({})", self.block.heading, n, row.kind, code);
        self.rows.push(row);
        self.state = BlockState::Rows(n + 1);
    }

    /// Close the row section: mark the last row and append the spacer if
    /// configured. Leaves the builder in `Spacer` after pushing one, else
    /// `Done`; later `push_project` calls are ignored.
    pub fn close(&mut self) {
        self.emit_heading();
        if !matches!(self.state, BlockState::Rows(_)) {
            return;
        }

        let last = match self.rows.last_mut() {
            Some(row) => Some(row),
            None => self.heading.as_mut(),
        };
        if let Some(row) = last {
            for cell in row.cells.iter_mut() {
                cell.last_row = true;
            }
        }

        if self.block.spacer {
            let cell = Cell::new("").spanning(self.config.column_count());
            self.rows.push(Row::new(RowKind::Spacer, vec![cell]));
            self.state = BlockState::Spacer;
        } else {
            self.state = BlockState::Done;
        }
    }

    /// Close the block if still open and hand over its rows.
    pub fn finish(mut self) -> RowGroup {
        self.close();
        self.state = BlockState::Done;

        RowGroup {
            heading: self.heading.unwrap_or_else(|| Row::new(RowKind::Heading, Vec::new())),
            rows: self.rows,
        }
    }

    fn display_name(&self, code: &str) -> String {
        match &self.config.system {
            Some(system) if system.code == code => system.name.clone(),
            _ => self
                .projects
                .find(code)
                .map(|p| project_label(p, self.config))
                .unwrap_or_else(|| code.to_string()),
        }
    }

    fn project_row(&self, code: &str, record: Option<&MetricRecord>) -> Row {
        let columns = self.config.column_count();
        let mut cells = vec![Cell::new(self.display_name(code))];
        let note = self.block.override_for(code);
        let note_at = note.map(|ov| {
            ov.from_field
                .as_deref()
                .and_then(|key| self.config.visible_fields().position(|f| f.key == key))
                .unwrap_or(0)
        });

        for (i, field) in self.config.visible_fields().enumerate() {
            if let (Some(ov), Some(at)) = (note, note_at) {
                if i == at {
                    let used: usize = cells.iter().map(|c| c.col_span).sum();
                    cells.push(
                        Cell::new(ov.text.clone())
                            .spanning(columns - used)
                            .aligned(HAlign::Center),
                    );
                    break;
                }
            }
            cells.push(self.value_cell(field, record));
        }

        Row {
            kind: if note.is_some() {
                RowKind::Override
            } else {
                RowKind::Data
            },
            project: Some(code.to_string()),
            cells,
        }
    }

    fn value_cell(&self, field: &FieldDef, record: Option<&MetricRecord>) -> Cell {
        let metric = record.and_then(|r| r.get(&field.key));
        let value = metric.map_or(MetricValue::Missing, |m| m.value);
        let mut cell = Cell::new(value_text(value, field, self.config)).aligned(HAlign::Right);
        if field.band {
            cell = cell.highlighted(classify(value, &self.config.thresholds));
        }
        if metric.is_some_and(|m| m.alert) {
            cell = cell.highlighted(Some(StatusBand::Warning)).bold();
        }
        cell
    }
}

fn header_row(config: &BulletinConfig) -> Row {
    let mut cells = vec![Cell::new(config.name_header.clone()).bold()];
    cells.extend(
        config
            .visible_fields()
            .map(|f| Cell::new(header_text(f, config)).aligned(HAlign::Center).bold()),
    );
    Row::new(RowKind::Header, cells)
}

/// Build the bulletin table for `date` from computed blocks, in layout order.
pub fn build_table(
    config: &BulletinConfig,
    projects: &ProjectTable,
    date: NaiveDate,
    blocks: &[BlockMetrics<'_>],
) -> TableModel {
    let groups = blocks
        .iter()
        .map(|metrics| {
            let mut builder = BlockBuilder::new(config, projects, metrics.block);
            for code in &metrics.block.projects {
                builder.push_project(code, metrics.record(code));
            }
            builder.finish()
        })
        .collect();

    TableModel {
        title: config.title.clone(),
        subtitle: date.format("%A, %B %-d, %Y").to_string(),
        column_count: config.column_count(),
        header: header_row(config),
        groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wmb_model::metric::MetricValue::{Missing, Value};
    use wmb_model::metric::{Metric, Provenance, Unit};

    const LAYOUT: &str = r#"{
        "name": "test", "title": "Daily Reservoir Bulletin",
        "storage": { "scale": 0.001, "label": "KAF" },
        "thresholds": { "yellow": 70.0, "red": 90.0 },
        "system": { "name": "System Total", "members": ["ALPH", "BRVO"] },
        "fields": [
            { "key": "elev", "header": "Elev", "unit": "feet", "decimals": 1,
              "type": "instant", "series": "{location}.Elev" },
            { "key": "change", "header": "Change", "unit": "feet", "decimals": 1,
              "type": "delta", "current": "elev", "prior": "elev" },
            { "key": "storage", "header": "Storage ({storage_unit})", "unit": "acre_feet", "decimals": 1,
              "type": "instant", "series": "{location}.Stor" },
            { "key": "cap", "unit": "acre_feet", "show": false,
              "type": "instant", "series": "{location}.Cap" },
            { "key": "pct", "header": "% Full", "unit": "percent", "decimals": 0, "band": true,
              "type": "percent", "occupied": "storage", "capacity": "cap" }
        ],
        "blocks": [
            { "heading": "Mainstem", "projects": ["ALPH", "BRVO", "SYS"] },
            { "heading": "Tributaries", "projects": ["CHRL", "DLTA"], "spacer": true,
              "overrides": [ { "project": "DLTA", "from_field": "storage", "text": "See note *" } ] }
        ]
    }"#;

    const PROJECTS: &str = "CODE,NAME,LOCATION,RATING_CURVE,CONVENTION,NON_CORPS,NOT_APPLICABLE\n\
        ALPH,Alpha Lake,ALPH,,local,,\n\
        BRVO,Bravo Reservoir,BRVO,,local,,\n\
        CHRL,Charlie Lake,CHRL,,gmt,,\n\
        DLTA,Delta Dam,DLTA,,local,yes,\n";

    fn setup() -> (BulletinConfig, ProjectTable) {
        (
            BulletinConfig::from_json(LAYOUT).unwrap(),
            ProjectTable::from_csv(PROJECTS).unwrap(),
        )
    }

    fn record(code: &str, values: &[(&str, MetricValue)]) -> MetricRecord {
        let mut record = MetricRecord::new(code);
        for (key, value) in values {
            record.insert(key, Metric::new(*value, Unit::None, Provenance::NotApplicable));
        }
        record
    }

    fn texts(row: &Row) -> Vec<&str> {
        row.cells.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn data_row_formats_every_visible_field() {
        let (config, projects) = setup();
        let mut builder = BlockBuilder::new(&config, &projects, &config.blocks[0]);
        let alph = record(
            "ALPH",
            &[
                ("elev", Value(1150.0)),
                ("change", Value(0.5)),
                ("storage", Value(15000.0)),
                ("cap", Value(20000.0)),
                ("pct", Value(75.0)),
            ],
        );
        builder.push_project("ALPH", Some(&alph));
        let group = builder.finish();

        let row = &group.rows[0];
        assert_eq!(row.kind, RowKind::Data);
        assert_eq!(texts(row), vec!["Alpha Lake", "1,150.0", "0.5", "15.0", "75"]);
        assert_eq!(row.span(), config.column_count());
        assert_eq!(row.cells[4].highlight, Some(StatusBand::Caution));
        assert_eq!(row.cells[1].highlight, None);
    }

    #[test]
    fn alert_flag_becomes_bold_warning() {
        let (config, projects) = setup();
        let mut alph = record("ALPH", &[("elev", Value(1150.0))]);
        alph.insert(
            "change",
            Metric::new(Value(1.5), Unit::Feet, Provenance::NotApplicable).with_alert(true),
        );
        let mut builder = BlockBuilder::new(&config, &projects, &config.blocks[0]);
        builder.push_project("ALPH", Some(&alph));
        let group = builder.finish();
        let cell = &group.rows[0].cells[2];
        assert_eq!(cell.text, "1.5");
        assert!(cell.bold);
        assert_eq!(cell.highlight, Some(StatusBand::Warning));
    }

    #[test]
    fn override_row_stops_at_note() {
        let (config, projects) = setup();
        let mut builder = BlockBuilder::new(&config, &projects, &config.blocks[1]);
        let dlta = record(
            "DLTA",
            &[("elev", Value(301.2)), ("change", Value(0.2)), ("storage", Value(1.0))],
        );
        builder.push_project("DLTA", Some(&dlta));
        let group = builder.finish();

        let row = group.project_rows().next().unwrap();
        assert_eq!(row.kind, RowKind::Override);
        assert_eq!(texts(row), vec!["Delta Dam*", "301.2", "0.2", "See note *"]);
        assert_eq!(row.span(), config.column_count());
        assert_eq!(row.cells.last().unwrap().col_span, 2);
    }

    #[test]
    fn override_without_field_spans_all_field_columns() {
        let (mut config, projects) = setup();
        config.blocks[1].overrides[0].from_field = None;
        let mut builder = BlockBuilder::new(&config, &projects, &config.blocks[1]);
        builder.push_project("DLTA", None);
        let group = builder.finish();
        let row = &group.rows[0];
        assert_eq!(row.cells.len(), 2);
        assert_eq!(row.cells[1].col_span, config.column_count() - 1);
        assert_eq!(row.span(), config.column_count());
    }

    #[test]
    fn state_machine_walks_heading_rows_spacer_done() {
        let (config, projects) = setup();
        let mut builder = BlockBuilder::new(&config, &projects, &config.blocks[1]);
        assert_eq!(builder.state(), BlockState::Heading);
        builder.push_project("CHRL", Some(&record("CHRL", &[])));
        assert_eq!(builder.state(), BlockState::Rows(1));
        builder.push_project("DLTA", Some(&record("DLTA", &[])));
        assert_eq!(builder.state(), BlockState::Rows(2));
        builder.close();
        assert_eq!(builder.state(), BlockState::Spacer);
        // closed blocks take no more rows
        builder.push_project("CHRL", Some(&record("CHRL", &[])));
        let group = builder.finish();

        assert_eq!(group.heading.kind, RowKind::Heading);
        assert_eq!(group.heading.cells[0].text, "Tributaries");
        assert_eq!(group.heading.span(), config.column_count());
        assert_eq!(group.rows.len(), 3);
        assert!(group.rows[2].is_spacer());
        assert_eq!(group.rows[2].span(), config.column_count());
    }

    #[test]
    fn last_row_flag_marks_only_final_project_row() {
        let (config, projects) = setup();
        let mut builder = BlockBuilder::new(&config, &projects, &config.blocks[1]);
        builder.push_project("CHRL", Some(&record("CHRL", &[])));
        builder.push_project("DLTA", Some(&record("DLTA", &[])));
        let group = builder.finish();
        assert!(group.rows[0].cells.iter().all(|c| !c.last_row));
        assert!(group.rows[1].cells.iter().all(|c| c.last_row));
        assert!(group.rows[2].cells.iter().all(|c| !c.last_row));
    }

    #[test]
    fn block_without_spacer_closes_straight_to_done() {
        let (config, projects) = setup();
        let mut builder = BlockBuilder::new(&config, &projects, &config.blocks[0]);
        builder.push_project("ALPH", Some(&record("ALPH", &[])));
        builder.close();
        assert_eq!(builder.state(), BlockState::Done);
        let group = builder.finish();
        assert_eq!(group.rows.len(), 1);
        assert!(!group.rows.iter().any(|r| r.is_spacer()));
    }

    #[test]
    fn empty_block_marks_heading_as_last_row() {
        let (mut config, projects) = setup();
        config.blocks[0].projects.clear();
        let group = BlockBuilder::new(&config, &projects, &config.blocks[0]).finish();
        assert!(group.rows.is_empty());
        assert!(group.heading.cells[0].last_row);
    }

    #[test]
    fn missing_record_renders_missing_markers() {
        let (config, projects) = setup();
        let mut builder = BlockBuilder::new(&config, &projects, &config.blocks[0]);
        builder.push_project("BRVO", None);
        let group = builder.finish();
        assert_eq!(texts(&group.rows[0]), vec!["Bravo Reservoir", "M", "M", "M", "M"]);
        assert_eq!(group.rows[0].cells[4].highlight, None);
    }

    #[test]
    fn system_row_uses_system_name_and_missing_marker() {
        let (config, projects) = setup();
        let mut builder = BlockBuilder::new(&config, &projects, &config.blocks[0]);
        let sys = record(
            "SYS",
            &[
                ("elev", MetricValue::Null),
                ("change", MetricValue::Null),
                ("storage", Missing),
                ("pct", Missing),
            ],
        );
        builder.push_project("SYS", Some(&sys));
        let group = builder.finish();
        assert_eq!(texts(&group.rows[0]), vec!["System Total", "--", "--", "M", "M"]);
    }

    #[test]
    fn build_table_header_and_subtitle() {
        let (config, projects) = setup();
        let table = build_table(
            &config,
            &projects,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            &[],
        );
        assert_eq!(table.title, "Daily Reservoir Bulletin");
        assert_eq!(table.subtitle, "Friday, March 1, 2024");
        assert_eq!(table.column_count, 5);
        assert_eq!(
            texts(&table.header),
            vec!["Project", "Elev", "Change", "Storage (KAF)", "% Full"]
        );
        assert!(table.groups.is_empty());
    }

    #[test]
    fn build_table_walks_blocks_in_order() {
        let (config, projects) = setup();
        let blocks = vec![
            BlockMetrics {
                block: &config.blocks[0],
                records: vec![record("ALPH", &[]), record("BRVO", &[]), record("SYS", &[])],
            },
            BlockMetrics {
                block: &config.blocks[1],
                records: vec![record("CHRL", &[]), record("DLTA", &[])],
            },
        ];
        let table = build_table(
            &config,
            &projects,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            &blocks,
        );
        assert_eq!(table.groups.len(), 2);
        assert_eq!(table.groups[0].rows.len(), 3);
        assert_eq!(table.groups[1].rows.len(), 3);
        assert!(table.rows().all(|r| r.span() == table.column_count));
        assert_eq!(table.project_row("DLTA").unwrap().kind, RowKind::Override);
    }
}
