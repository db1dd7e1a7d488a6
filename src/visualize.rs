//! Matrix Table
//!
//! Converting a matrix into a printable table.
//!
//! The table keeps its title row separately from the body because prettytable doesn't
//! provide any public method to retrieve the title row again once it is set.
//! Cells that differ from a reference matrix are highlighted, which is how the result
//! of a reduction is shown against its input.
//!

use crate::util::{self, ColumnIndex, Matrix, RowIndex};
use itertools::Itertools;
use prettytable::format::{self, TableFormat};
use prettytable::{Cell, Row, Table};

/// monospace rendering: cells joined by single spaces, rows joined by newlines
pub fn matrix_to_string(matrix: &[Vec<util::Cell>]) -> String {
    matrix
        .iter()
        .map(|row| row.iter().map(|&cell| util::format_cell(cell)).join(" "))
        .join("\n")
}

#[derive(Clone)]
pub struct VizTable {
    pub title: Row,
    pub rows: Vec<Row>,
    /// `(row, col)` of the highlighted cells
    pub changed: Vec<(RowIndex, ColumnIndex)>,
}

impl VizTable {
    pub fn new(matrix: &[Vec<util::Cell>]) -> Self {
        Self::build(matrix, None)
    }

    /// highlight cells whose value differs from the same position in `reference`;
    /// positions missing from `reference` are not highlighted
    pub fn with_reference(matrix: &[Vec<util::Cell>], reference: &[Vec<util::Cell>]) -> Self {
        Self::build(matrix, Some(reference))
    }

    fn build(matrix: &[Vec<util::Cell>], reference: Option<&[Vec<util::Cell>]>) -> Self {
        let columns = matrix.iter().map(|row| row.len()).max().unwrap_or(0);
        let mut title = Row::empty();
        title.add_cell(Cell::new(""));
        for column in 0..columns {
            title.add_cell(Cell::new((column + 1).to_string().as_str()).style_spec("brFm"));
        }
        let mut rows: Vec<Row> = vec![];
        let mut changed = vec![];
        for (row_index, row) in matrix.iter().enumerate() {
            let mut table_row = Row::empty();
            table_row.add_cell(Cell::new((row_index + 1).to_string().as_str()).style_spec("brFb"));
            for column in 0..columns {
                let Some(&value) = row.get(column) else {
                    table_row.add_cell(Cell::new(""));
                    continue;
                };
                let previous = reference.and_then(|m| m.get(row_index)).and_then(|r| r.get(column));
                let mut cell = Cell::new(util::format_cell(value).as_str());
                if previous.is_some_and(|&previous| previous != value) {
                    cell = cell.style_spec("bFr");
                    changed.push((row_index, column));
                }
                table_row.add_cell(cell);
            }
            rows.push(table_row);
        }
        VizTable { title, rows, changed }
    }
}

lazy_static! {
    pub static ref DEFAULT_TABLE_FORMAT: TableFormat = {
        let mut format = TableFormat::new();
        format.padding(0, 0);
        format.column_separator('\u{250A}');
        format.borders('\u{250A}');
        use format::LinePosition::*;
        let separators = [
            (Intern, ['\u{2500}', '\u{253C}', '\u{251C}', '\u{2524}']),
            (Top, ['\u{2500}', '\u{252C}', '\u{250C}', '\u{2510}']),
            (Bottom, ['\u{2500}', '\u{2534}', '\u{2514}', '\u{2518}']),
            (Title, ['\u{2550}', '\u{256A}', '\u{255E}', '\u{2561}']),
        ];
        for (position, s) in separators {
            format.separators(&[position], format::LineSeparator::new(s[0], s[1], s[2], s[3]))
        }
        format
    };
}

impl From<VizTable> for Table {
    fn from(viz_table: VizTable) -> Table {
        let mut table = Table::new();
        table.set_format(*DEFAULT_TABLE_FORMAT);
        table.set_titles(viz_table.title.clone());
        for row in viz_table.rows.iter() {
            table.add_row(row.clone());
        }
        table
    }
}

impl From<VizTable> for serde_json::Value {
    fn from(viz_table: VizTable) -> serde_json::Value {
        let mut table_json = vec![];
        let mut title_json = vec![];
        for cell in viz_table.title.iter() {
            title_json.push(cell.get_content());
        }
        table_json.push(title_json);
        for row in viz_table.rows.iter() {
            let mut row_json = vec![];
            for cell in row {
                row_json.push(cell.get_content());
            }
            table_json.push(row_json);
        }
        json!({
            "table": table_json,
            "changed": viz_table.changed,
        })
    }
}

pub trait VizTrait {
    fn viz_table(&self) -> VizTable;
    fn printstd_str(&self) -> String {
        Table::from(self.viz_table()).to_string().replace('\r', "")
    }
    fn printstd(&self) {
        #[cfg(feature = "colorful")]
        Table::from(self.viz_table()).printstd();
        #[cfg(not(feature = "colorful"))]
        println!("{}", Table::from(self.viz_table()));
    }
}

impl VizTrait for VizTable {
    fn viz_table(&self) -> VizTable {
        self.clone()
    }
}

impl VizTrait for Matrix {
    fn viz_table(&self) -> VizTable {
        VizTable::new(self)
    }
}
