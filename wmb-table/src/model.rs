//! Backend-neutral table description.
//!
//! All structs derive `Serialize` so a renderer in another process can take
//! the model as JSON. Nothing here knows about fonts, point sizes or colours;
//! a cell only says what band it belongs to.

use serde::Serialize;
use wmb_model::band::StatusBand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VAlign {
    Top,
    Middle,
    Bottom,
}

/// One table cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub text: String,
    pub col_span: usize,
    pub row_span: usize,
    pub h_align: HAlign,
    pub v_align: VAlign,
    /// Highlight band, if the value was classified or flagged.
    pub highlight: Option<StatusBand>,
    pub bold: bool,
    /// Set on every cell of the last data row of a block, so a renderer can
    /// thicken the bottom border.
    pub last_row: bool,
}

impl Cell {
    /// A single-column, left-aligned, middle-aligned cell.
    pub fn new(text: impl Into<String>) -> Self {
        Cell {
            text: text.into(),
            col_span: 1,
            row_span: 1,
            h_align: HAlign::Left,
            v_align: VAlign::Middle,
            highlight: None,
            bold: false,
            last_row: false,
        }
    }

    pub fn spanning(mut self, columns: usize) -> Self {
        self.col_span = columns.max(1);
        self
    }

    pub fn aligned(mut self, h_align: HAlign) -> Self {
        self.h_align = h_align;
        self
    }

    pub fn highlighted(mut self, band: Option<StatusBand>) -> Self {
        self.highlight = band;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    /// Column headers of the whole table
    Header,
    /// Block heading
    Heading,
    /// One project (or the system) with one cell per field
    Data,
    /// A project row whose remaining fields are replaced by a note
    Override,
    /// Blank separator after a block
    Spacer,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub kind: RowKind,
    /// Project code for data and override rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(kind: RowKind, cells: Vec<Cell>) -> Self {
        Row {
            kind,
            project: None,
            cells,
        }
    }

    /// Total number of columns the row covers.
    pub fn span(&self) -> usize {
        self.cells.iter().map(|c| c.col_span).sum()
    }

    pub fn is_spacer(&self) -> bool {
        self.kind == RowKind::Spacer
    }
}

/// A block's heading and its rows, kept together so a paginating renderer
/// can place them on one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowGroup {
    pub heading: Row,
    pub rows: Vec<Row>,
}

impl RowGroup {
    /// Data and override rows, without the trailing spacer.
    pub fn project_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|r| !r.is_spacer())
    }
}

/// The complete bulletin table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableModel {
    pub title: String,
    pub subtitle: String,
    pub column_count: usize,
    pub header: Row,
    pub groups: Vec<RowGroup>,
}

impl TableModel {
    /// Every row in display order: header, then each group's heading and rows.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        std::iter::once(&self.header).chain(
            self.groups
                .iter()
                .flat_map(|g| std::iter::once(&g.heading).chain(g.rows.iter())),
        )
    }

    /// The row of `project` in the first group that shows it.
    pub fn project_row(&self, project: &str) -> Option<&Row> {
        self.groups
            .iter()
            .flat_map(|g| g.rows.iter())
            .find(|r| r.project.as_deref() == Some(project))
    }
}
