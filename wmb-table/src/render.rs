//! Renderers for a finished [`TableModel`].
//!
//! - CSV: one record per row, spanned columns padded with empty fields
//! - JSON: the serialized model, for external document renderers
//! - Text: a fixed-width terminal preview

use crate::model::{HAlign, Row, TableModel};
use std::io;
use wmb_model::band::StatusBand;
use wmb_model::error::{BulletinError, Result};

/// Output format of a rendered bulletin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Csv,
    Json,
    Text,
}

impl std::str::FromStr for Format {
    type Err = BulletinError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            "text" | "txt" => Ok(Format::Text),
            other => Err(BulletinError::Config(format!("unknown output format '{}'", other))),
        }
    }
}

pub fn render(table: &TableModel, format: Format) -> Result<String> {
    match format {
        Format::Csv => to_csv(table),
        Format::Json => to_json(table),
        Format::Text => Ok(to_text(table)),
    }
}

fn padded_fields(row: &Row) -> Vec<&str> {
    let mut fields = Vec::with_capacity(row.span());
    for cell in &row.cells {
        fields.push(cell.text.as_str());
        fields.extend(std::iter::repeat("").take(cell.col_span - 1));
    }
    fields
}

pub fn to_csv(table: &TableModel) -> Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    wtr.write_record([table.title.as_str()])?;
    wtr.write_record([table.subtitle.as_str()])?;
    for row in table.rows() {
        wtr.write_record(padded_fields(row))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| BulletinError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| BulletinError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

pub fn to_json(table: &TableModel) -> Result<String> {
    Ok(serde_json::to_string_pretty(table)?)
}

fn marked(text: &str, highlight: Option<StatusBand>) -> String {
    match highlight {
        Some(StatusBand::Warning) => format!("!{}", text),
        Some(StatusBand::Caution) => format!("+{}", text),
        _ => text.to_string(),
    }
}

/// Fixed-width preview. Caution cells are prefixed `+`, warning cells `!`,
/// and a rule is drawn under the last row of each block.
pub fn to_text(table: &TableModel) -> String {
    let columns = table.column_count;
    let mut widths = vec![0usize; columns];
    for row in table.rows() {
        let mut col = 0;
        for cell in &row.cells {
            if cell.col_span == 1 && col < columns {
                let len = marked(&cell.text, cell.highlight).chars().count();
                widths[col] = widths[col].max(len);
            }
            col += cell.col_span;
        }
    }
    let total: usize = widths.iter().sum::<usize>() + 2 * columns.saturating_sub(1);

    let mut out = String::new();
    out.push_str(&table.title);
    out.push('\n');
    out.push_str(&table.subtitle);
    out.push('\n');
    out.push_str(&"=".repeat(total));
    out.push('\n');

    for row in table.rows() {
        let mut line = String::new();
        let mut col = 0;
        for cell in &row.cells {
            let end = (col + cell.col_span).min(columns);
            let width: usize = widths[col.min(columns)..end].iter().sum::<usize>()
                + 2 * cell.col_span.saturating_sub(1);
            let text = marked(&cell.text, cell.highlight);
            if col > 0 {
                line.push_str("  ");
            }
            match cell.h_align {
                HAlign::Left => line.push_str(&format!("{:<width$}", text, width = width)),
                HAlign::Center => line.push_str(&format!("{:^width$}", text, width = width)),
                HAlign::Right => line.push_str(&format!("{:>width$}", text, width = width)),
            }
            col += cell.col_span;
        }
        out.push_str(line.trim_end());
        out.push('\n');
        if row.cells.first().is_some_and(|c| c.last_row) {
            out.push_str(&"-".repeat(total));
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, RowGroup, RowKind};

    fn table() -> TableModel {
        let header = Row::new(
            RowKind::Header,
            vec![Cell::new("Project"), Cell::new("Elev"), Cell::new("Storage")],
        );
        let heading = Row::new(RowKind::Heading, vec![Cell::new("Mainstem").spanning(3)]);
        let mut alpha = Row::new(
            RowKind::Data,
            vec![
                Cell::new("Alpha Lake"),
                Cell::new("1,150.0").aligned(HAlign::Right),
                Cell::new("15.0")
                    .aligned(HAlign::Right)
                    .highlighted(Some(StatusBand::Warning)),
            ],
        );
        alpha.project = Some("ALPH".into());
        let mut delta = Row::new(
            RowKind::Override,
            vec![Cell::new("Delta Dam*"), Cell::new("See note *").spanning(2)],
        );
        for cell in delta.cells.iter_mut() {
            cell.last_row = true;
        }
        TableModel {
            title: "Daily Bulletin".into(),
            subtitle: "Friday, March 1, 2024".into(),
            column_count: 3,
            header,
            groups: vec![RowGroup {
                heading,
                rows: vec![alpha, delta],
            }],
        }
    }

    #[test]
    fn csv_pads_spanned_columns() {
        let csv = to_csv(&table()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Daily Bulletin");
        assert_eq!(lines[1], "\"Friday, March 1, 2024\"");
        assert_eq!(lines[2], "Project,Elev,Storage");
        assert_eq!(lines[3], "Mainstem,,");
        assert_eq!(lines[4], "Alpha Lake,\"1,150.0\",15.0");
        assert_eq!(lines[5], "Delta Dam*,See note *,");
    }

    #[test]
    fn json_carries_cell_directives() {
        let json = to_json(&table()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["column_count"], 3);
        let note = &value["groups"][0]["rows"][1]["cells"][1];
        assert_eq!(note["col_span"], 2);
        assert_eq!(note["last_row"], true);
        assert_eq!(value["groups"][0]["rows"][0]["project"], "ALPH");
        assert!(value["header"].get("project").is_none());
    }

    #[test]
    fn text_marks_highlights_and_block_end() {
        let text = to_text(&table());
        assert!(text.contains("!15.0"));
        assert!(text.contains("See note *"));
        let lines: Vec<&str> = text.lines().collect();
        let delta = lines.iter().position(|l| l.starts_with("Delta Dam*")).unwrap();
        assert!(lines[delta + 1].starts_with("---"));
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("CSV".parse::<Format>().unwrap(), Format::Csv);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("txt".parse::<Format>().unwrap(), Format::Text);
        assert!("pdf".parse::<Format>().is_err());
    }
}
