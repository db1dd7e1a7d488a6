//! History Diff
//!
//! Cell-by-cell comparison of two matrices of possibly different (even ragged) shapes.
//!
//! A cell that exists on only one side is a change; a cell missing on both sides is not.
//! Changes are produced in row-major order.
//!

use crate::serde::{Deserialize, Serialize};
use crate::util::*;
use itertools::Itertools;

/// how many changed cells a history report lists before summarizing the rest
pub const DIFF_DISPLAY_LIMIT: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellChange {
    pub row: RowIndex,
    pub col: ColumnIndex,
    /// `None` if the cell does not exist in the first matrix
    pub from: Option<Cell>,
    /// `None` if the cell does not exist in the second matrix
    pub to: Option<Cell>,
}

impl CellChange {
    fn cell_text(cell: Option<Cell>) -> String {
        match cell {
            Some(value) => format_cell(value),
            None => "undefined".to_string(),
        }
    }
}

impl std::fmt::Display for CellChange {
    /// 1-based position, as shown to the user
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}]: {} → {}",
            self.row + 1,
            self.col + 1,
            Self::cell_text(self.from),
            Self::cell_text(self.to)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiffResult {
    pub count: usize,
    pub changes: Vec<CellChange>,
}

impl DiffResult {
    /// the same diff seen from the other side
    pub fn mirrored(&self) -> Self {
        Self {
            count: self.count,
            changes: self
                .changes
                .iter()
                .map(|change| CellChange {
                    row: change.row,
                    col: change.col,
                    from: change.to,
                    to: change.from,
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// at most `limit` changes, one per line, followed by a count of the omitted ones
    pub fn summary_lines(&self, limit: usize) -> Vec<String> {
        let mut lines = self.changes.iter().take(limit).map(|change| change.to_string()).collect_vec();
        if self.changes.len() > limit {
            lines.push(format!("…and {} more", self.changes.len() - limit));
        }
        lines
    }
}

pub fn diff_matrices(a: &[Vec<Cell>], b: &[Vec<Cell>]) -> DiffResult {
    let mut changes = vec![];
    for row in 0..a.len().max(b.len()) {
        let row_a = a.get(row);
        let row_b = b.get(row);
        let columns = row_a.map_or(0, |r| r.len()).max(row_b.map_or(0, |r| r.len()));
        for col in 0..columns {
            let from = row_a.and_then(|r| r.get(col)).copied();
            let to = row_b.and_then(|r| r.get(col)).copied();
            // plain `!=` on the options: an absent cell only equals another absent cell, NaN never matches
            if from != to {
                changes.push(CellChange { row, col, from, to });
            }
        }
    }
    DiffResult {
        count: changes.len(),
        changes,
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn diff_same_matrix() {
        // cargo test diff_same_matrix -- --nocapture
        let ragged = vec![vec![1., 2., 3.], vec![], vec![4.]];
        assert_eq!(diff_matrices(&ragged, &ragged).count, 0);
        let empty: Matrix = vec![];
        assert_eq!(diff_matrices(&empty, &empty), DiffResult::default());
    }

    #[test]
    fn diff_changes_in_row_major_order() {
        // cargo test diff_changes_in_row_major_order -- --nocapture
        let a = vec![vec![1., 2.], vec![3., 4.]];
        let b = vec![vec![1., 5.], vec![6., 4.]];
        let result = diff_matrices(&a, &b);
        assert_eq!(result.count, 2);
        assert_eq!(
            result.changes,
            vec![
                CellChange { row: 0, col: 1, from: Some(2.), to: Some(5.) },
                CellChange { row: 1, col: 0, from: Some(3.), to: Some(6.) },
            ]
        );
    }

    #[test]
    fn diff_different_shapes() {
        // cargo test diff_different_shapes -- --nocapture
        let a = vec![vec![1., 2., 3.], vec![4.]];
        let b = vec![vec![1., 2.], vec![4., 5.], vec![6.]];
        let result = diff_matrices(&a, &b);
        assert_eq!(
            result.changes,
            vec![
                CellChange { row: 0, col: 2, from: Some(3.), to: None },
                CellChange { row: 1, col: 1, from: None, to: Some(5.) },
                CellChange { row: 2, col: 0, from: None, to: Some(6.) },
            ]
        );
        // symmetric in count, mirrored in content
        let reverse = diff_matrices(&b, &a);
        assert_eq!(reverse.count, result.count);
        assert_eq!(reverse, result.mirrored());
        assert_eq!(result.changes[0].to_string(), "[1, 3]: 3 → undefined");
        let signed_zero = diff_matrices(&[vec![1.]], &[vec![-0.]]);
        assert_eq!(signed_zero.changes[0].to_string(), "[1, 1]: 1 → 0");
    }

    #[test]
    fn diff_nan_is_always_a_change() {
        // cargo test diff_nan_is_always_a_change -- --nocapture
        let a = vec![vec![f64::NAN]];
        assert_eq!(diff_matrices(&a, &a).count, 1);
    }

    #[test]
    fn diff_summary_truncation() {
        // cargo test diff_summary_truncation -- --nocapture
        let a = vec![vec![0.; 5]; 2];
        let b = vec![vec![1.; 5]; 2];
        let result = diff_matrices(&a, &b);
        assert_eq!(result.count, 10);
        let lines = result.summary_lines(DIFF_DISPLAY_LIMIT);
        assert_eq!(lines.len(), DIFF_DISPLAY_LIMIT + 1);
        assert_eq!(lines[0], "[1, 1]: 0 → 1");
        assert_eq!(lines[7], "[2, 3]: 0 → 1");
        assert_eq!(lines[8], "…and 2 more");
        // exactly at the limit nothing is summarized
        let b = vec![vec![1.; 4], vec![1.; 4], vec![0.; 4]];
        let a = vec![vec![0.; 4]; 3];
        let lines = diff_matrices(&a, &b).summary_lines(DIFF_DISPLAY_LIMIT);
        assert_eq!(lines.len(), 8);
        assert!(lines.iter().all(|line| !line.starts_with('…')));
    }
}
