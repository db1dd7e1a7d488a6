//! Reduction Session
//!
//! One apply call: validate the input, reduce a copy of it while the ledger records every
//! step, check the result, and prepend the finished entry to the history.
//! Any failure aborts before the ledger is finished, leaving the history untouched.
//!

use crate::diff::*;
use crate::history::*;
use crate::ledger::*;
use crate::reduction::*;
use crate::store::*;
use crate::util::*;
use crate::visualize::*;
use std::fmt;

#[derive(Debug, Clone, Default)]
pub struct ReductionSession {
    pub config: ReductionConfig,
}

/// result of a successful apply
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    pub input: Matrix,
    pub output: Matrix,
    /// the entry that was prepended to the history
    pub entry: HistoryEntry,
}

impl ApplyOutcome {
    /// `(row, col)` of the cells the reduction changed, row-major
    pub fn changed_cells(&self) -> Vec<(RowIndex, ColumnIndex)> {
        diff_matrices(&self.input, &self.output)
            .changes
            .iter()
            .map(|change| (change.row, change.col))
            .collect()
    }
}

impl VizTrait for ApplyOutcome {
    fn viz_table(&self) -> VizTable {
        VizTable::with_reference(&self.output, &self.input)
    }
}

impl ReductionSession {
    pub fn new(config: ReductionConfig) -> Self {
        Self { config }
    }

    pub fn apply<S: BlobStore>(
        &self,
        input: &Matrix,
        history: &mut HistoryStore<S>,
    ) -> Result<ApplyOutcome, ReductionError> {
        let (rows, columns) = ensure_rectangular(input)?;
        tracing::info!(
            strategy = serde_variant::to_variant_name(&self.config.strategy).unwrap_or("unknown"),
            rows,
            columns,
            "apply reduction"
        );
        let mut ledger = LedgerSession::new();
        ledger.start(input);
        let reducer = self.config.build_reducer();
        let output = reducer.reduce(input.clone(), &mut ledger).map_err(|error| {
            tracing::warn!(%error, "reduction failed");
            error
        })?;
        Self::check_output_shape(&output, rows, columns)?;
        let entry = ledger.finish(&output);
        history.add(entry.clone());
        Ok(ApplyOutcome {
            input: input.clone(),
            output,
            entry,
        })
    }

    /// the reduced matrix must keep the shape of the input
    pub fn check_output_shape(output: &[Vec<Cell>], rows: usize, columns: usize) -> Result<(), ReductionError> {
        let found = match check_rectangular(output) {
            Ok((found_rows, found_columns)) if found_rows == rows && (rows == 0 || found_columns == columns) => {
                return Ok(());
            }
            Ok((found_rows, found_columns)) => format!("{found_rows}x{found_columns}"),
            Err((row, expected, found)) => format!("ragged rows (row {} has {found} cells, not {expected})", row + 1),
        };
        Err(ReductionError::InvalidOutputShape {
            expected_rows: rows,
            expected_columns: columns,
            found,
        })
    }
}

/// transient status text shown after an apply
#[derive(Debug, Clone, PartialEq)]
pub enum StatusLine {
    Done,
    Error(String),
}

impl<T, E: fmt::Display> From<&Result<T, E>> for StatusLine {
    fn from(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => Self::Done,
            Err(error) => Self::Error(error.to_string()),
        }
    }
}

impl StatusLine {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => write!(f, "Done."),
            Self::Error(message) => write!(f, "Error: {message}"),
        }
    }
}
