//! Typed workbook model for the translated-spreadsheet artifact.
//!
//! The backend emits its table result as an XLSX file. This module turns
//! those bytes into data a renderer can use without knowing anything about
//! OOXML:
//!
//! ```text
//!   bytes ──decode()──▶ Workbook ──materialize()──▶ SheetGrid ──to_html()
//!            (once)      sheets of     dense rows,     <table> markup
//!                        sparse cells  header + align
//! ```
//!
//! Decoding happens **once** per artifact; switching between sheets only
//! re-materializes from the in-memory [`Workbook`] and never touches the
//! bytes again. Dates stay as raw Excel serials inside the model —
//! conversion to a calendar date is a display decision and lives in
//! [`grid`].
//!
//! ## Why a sparse cell map?
//!
//! Translated spreadsheets are often mostly empty: a few columns, header
//! plus a handful of rows, buried in whatever dimensions the producer
//! declared. Storing only occupied cells keeps the model honest — the used
//! range is computed from cells that exist, not from a `dimension` element
//! that may lie.

use std::collections::BTreeMap;
use thiserror::Error;

pub mod dates;
pub mod decode;
pub mod grid;

pub use decode::decode;
pub use grid::{materialize, CellAlign, GridCell, SheetGrid};

/// One cell value. `Date` keeps the raw Excel serial; the 1900/1904 system
/// lives on the [`Workbook`].
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Date(f64),
    Text(String),
}

/// Tight bounding rectangle of a sheet's occupied cells. All coordinates
/// are 0-indexed and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsedRange {
    pub min_row: u32,
    pub min_col: u32,
    pub max_row: u32,
    pub max_col: u32,
}

impl UsedRange {
    pub fn width(&self) -> u32 {
        self.max_col - self.min_col + 1
    }

    pub fn height(&self) -> u32 {
        self.max_row - self.min_row + 1
    }
}

/// One worksheet: sparse `(row, col) → Cell` plus the computed used range
/// (`None` for an empty sheet).
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub cells: BTreeMap<(u32, u32), Cell>,
    pub used_range: Option<UsedRange>,
}

impl Sheet {
    /// Build a sheet and compute its used range from the cells present.
    pub fn from_cells(name: impl Into<String>, cells: BTreeMap<(u32, u32), Cell>) -> Self {
        let used_range = compute_used_range(&cells);
        Self {
            name: name.into(),
            cells,
            used_range,
        }
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A decoded workbook: sheets in the order `workbook.xml` lists them, plus
/// the date-system flag that governs serial-to-date conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
    pub date1904: bool,
}

impl Workbook {
    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Look a sheet up by exact name.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn first_sheet(&self) -> Option<&Sheet> {
        self.sheets.first()
    }
}

fn compute_used_range(cells: &BTreeMap<(u32, u32), Cell>) -> Option<UsedRange> {
    let mut keys = cells.keys();
    let &(first_row, first_col) = keys.next()?;
    let mut range = UsedRange {
        min_row: first_row,
        min_col: first_col,
        max_row: first_row,
        max_col: first_col,
    };
    for &(row, col) in keys {
        range.min_row = range.min_row.min(row);
        range.max_row = range.max_row.max(row);
        range.min_col = range.min_col.min(col);
        range.max_col = range.max_col.max(col);
    }
    Some(range)
}

/// Why XLSX bytes could not become a [`Workbook`]. Every malformed input
/// maps here; decoding never panics.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes are not a readable ZIP archive.
    #[error("not an XLSX archive: {0}")]
    Archive(String),

    /// A part the workbook refers to is absent from the archive.
    #[error("missing archive part: {0}")]
    MissingPart(String),

    /// XML inside a part could not be parsed.
    #[error("malformed XML in {part}: {message}")]
    Xml { part: String, message: String },

    /// A cell carried an unparseable `r` reference.
    #[error("invalid cell reference '{reference}' in sheet '{sheet}'")]
    CellReference { sheet: String, reference: String },

    /// A cell pointed at a shared string that does not exist.
    #[error("bad shared-string reference '{reference}' ({count} entries)")]
    SharedString { reference: String, count: usize },
}
