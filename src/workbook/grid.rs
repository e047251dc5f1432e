//! Dense, display-ready grids from decoded sheets.
//!
//! A [`SheetGrid`] is what a renderer wants: a header row, rectangular
//! rows over the used range, every cell already turned into a string with
//! an alignment hint. Materializing is pure — switching sheets just calls
//! [`materialize`] again on the same [`Workbook`], no re-decoding.

use super::dates::format_serial_date;
use super::{Cell, Workbook};
use crate::error::TranslateError;

/// Display alignment: numbers right, everything else (text, dates) left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellAlign {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub text: String,
    pub align: CellAlign,
}

impl GridCell {
    fn empty() -> Self {
        Self {
            text: String::new(),
            align: CellAlign::Left,
        }
    }
}

/// One sheet rendered over its used range. The first occupied row always
/// becomes the header, whatever it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetGrid {
    pub sheet_name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<GridCell>>,
}

impl SheetGrid {
    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.rows.is_empty()
    }

    /// Plain `<table>` markup: header in `<thead>`, numeric cells carry
    /// `class="num"`, all content HTML-escaped.
    pub fn to_html(&self) -> String {
        let mut html = String::from("<table>\n<thead>\n<tr>");
        for cell in &self.header {
            html.push_str("<th>");
            html.push_str(&escape_html(cell));
            html.push_str("</th>");
        }
        html.push_str("</tr>\n</thead>\n<tbody>\n");
        for row in &self.rows {
            html.push_str("<tr>");
            for cell in row {
                html.push_str(match cell.align {
                    CellAlign::Right => "<td class=\"num\">",
                    CellAlign::Left => "<td>",
                });
                html.push_str(&escape_html(&cell.text));
                html.push_str("</td>");
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody>\n</table>\n");
        html
    }
}

/// Materialize one sheet of a workbook into a dense grid. Unknown sheet
/// names error with the list of names that do exist.
pub fn materialize(workbook: &Workbook, sheet_name: &str) -> Result<SheetGrid, TranslateError> {
    let sheet = workbook
        .sheet(sheet_name)
        .ok_or_else(|| TranslateError::UnknownSheet {
            name: sheet_name.to_string(),
            available: workbook.sheet_names().join(", "),
        })?;

    let Some(range) = sheet.used_range else {
        return Ok(SheetGrid {
            sheet_name: sheet_name.to_string(),
            header: Vec::new(),
            rows: Vec::new(),
        });
    };

    let header = (range.min_col..=range.max_col)
        .map(|col| {
            sheet
                .cell(range.min_row, col)
                .map(|cell| render_cell(cell, workbook.date1904).text)
                .unwrap_or_default()
        })
        .collect();

    let mut rows = Vec::with_capacity(range.height() as usize - 1);
    for row in (range.min_row + 1)..=range.max_row {
        let grid_row = (range.min_col..=range.max_col)
            .map(|col| {
                sheet
                    .cell(row, col)
                    .map(|cell| render_cell(cell, workbook.date1904))
                    .unwrap_or_else(GridCell::empty)
            })
            .collect();
        rows.push(grid_row);
    }

    Ok(SheetGrid {
        sheet_name: sheet_name.to_string(),
        header,
        rows,
    })
}

fn render_cell(cell: &Cell, date1904: bool) -> GridCell {
    match cell {
        Cell::Number(value) => GridCell {
            text: format_number(*value),
            align: CellAlign::Right,
        },
        Cell::Date(serial) => {
            // Serials outside the calendar fall back to the literal
            // number, still left-aligned like every other date cell.
            let text = format_serial_date(*serial, date1904)
                .unwrap_or_else(|| format_number(*serial));
            GridCell {
                text,
                align: CellAlign::Left,
            }
        }
        Cell::Text(text) => GridCell {
            text: text.clone(),
            align: CellAlign::Left,
        },
    }
}

/// Literal numeric display: whole numbers without a decimal point,
/// fractions trimmed of trailing zeros.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e11 {
        format!("{}", value as i64)
    } else {
        let fixed = format!("{value:.10}");
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
