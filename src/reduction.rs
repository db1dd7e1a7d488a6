//! Row Reduction
//!
//! Elimination below every pivot, in one of two numeric policies:
//! - [`FloatingPointReducer`]: textbook elimination with `f64`, snapping round-off below
//!   `epsilon` to an exact zero
//! - [`IntegerExactReducer`]: fraction-free elimination; the target row is combined with the
//!   pivot row through an integer linear combination that cancels the pivot column exactly,
//!   and the common factor introduced is divided out again. Integer input is handled with
//!   checked `i64` arithmetic; anything else goes through the same formulas on `f64`
//!
//! Both first stable-sort the rows by pivot column (rows without pivot go last) and report
//! every row operation to a [`StepRecorder`], including the initial sort.
//!

use crate::clap::ValueEnum;
use crate::ledger::*;
use crate::numeric::*;
use crate::serde::{Deserialize, Serialize};
use crate::util::*;
use num_traits::ToPrimitive;
use thiserror::Error;

/// magnitudes below this are treated as zero by the floating point strategy
pub const DEFAULT_EPSILON: Cell = 1e-9;

/// description of the step recorded after sorting the rows
pub const SORT_DESCRIPTION: &str = "Sort";

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// `f64` elimination with epsilon snapping
    #[default]
    FloatingPoint,
    /// fraction-free elimination on integers
    IntegerExact,
}

impl Strategy {
    pub fn from_integer_exact(integer_exact: bool) -> Self {
        if integer_exact {
            Self::IntegerExact
        } else {
            Self::FloatingPoint
        }
    }

    pub fn build(&self, config: &ReductionConfig) -> Box<dyn RowReducer> {
        match self {
            Self::FloatingPoint => Box::new(FloatingPointReducer::new(config.epsilon)),
            Self::IntegerExact => Box::new(IntegerExactReducer::new()),
        }
    }
}

fn default_epsilon() -> Cell {
    DEFAULT_EPSILON
}

/// per-call configuration of a reduction; also accepted as a JSON object on the command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReductionConfig {
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default = "default_epsilon")]
    pub epsilon: Cell,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl ReductionConfig {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    pub fn build_reducer(&self) -> Box<dyn RowReducer> {
        self.strategy.build(self)
    }
}

/// row and column indices are 0-based internally and reported 1-based;
/// during a reduction they refer to the sorted matrix
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReductionError {
    #[error("row {} has {found} cells but row 1 has {expected}: the matrix must be rectangular", .row + 1)]
    RaggedMatrix { row: RowIndex, expected: usize, found: usize },
    #[error("integer overflow while updating cell [{}, {}]", .row + 1, .col + 1)]
    Overflow { row: RowIndex, col: ColumnIndex },
    #[error("reduction must return a {expected_rows}x{expected_columns} matrix, got {found}")]
    InvalidOutputShape {
        expected_rows: usize,
        expected_columns: usize,
        found: String,
    },
}

pub fn ensure_rectangular(matrix: &[Vec<Cell>]) -> Result<(usize, usize), ReductionError> {
    check_rectangular(matrix).map_err(|(row, expected, found)| ReductionError::RaggedMatrix { row, expected, found })
}

pub trait RowReducer {
    /// reduce `matrix` in place and hand it back, reporting each row operation to `recorder`
    fn reduce(&self, matrix: Matrix, recorder: &mut dyn StepRecorder) -> Result<Matrix, ReductionError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatingPointReducer {
    pub epsilon: Cell,
}

impl Default for FloatingPointReducer {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON)
    }
}

impl FloatingPointReducer {
    pub fn new(epsilon: Cell) -> Self {
        Self { epsilon }
    }
}

impl RowReducer for FloatingPointReducer {
    fn reduce(&self, mut matrix: Matrix, recorder: &mut dyn StepRecorder) -> Result<Matrix, ReductionError> {
        ensure_rectangular(&matrix)?;
        sort_by_pivot(&mut matrix);
        recorder.push_step(SORT_DESCRIPTION.to_string(), &matrix);
        for i in 0..matrix.len() {
            let Some(j) = first_nonzero_index(&matrix[i]) else {
                continue; // no pivot
            };
            for k in i + 1..matrix.len() {
                let (upper, lower) = matrix.split_at_mut(k);
                let (pivot_row, row) = (&upper[i], &mut lower[0]);
                let factor = row[j] / pivot_row[j];
                // the zero check matters when epsilon is configured as 0
                if factor.abs() < self.epsilon || factor == 0. {
                    continue;
                }
                for (cell, &pivot) in row[j..].iter_mut().zip(pivot_row[j..].iter()) {
                    *cell -= pivot * factor;
                    if cell.abs() < self.epsilon {
                        *cell = 0.;
                    }
                }
                recorder.push_step(
                    format!("R{} ← R{} − ({})·R{}", k + 1, k + 1, format_cell(factor), i + 1),
                    &matrix,
                );
            }
        }
        Ok(matrix)
    }
}

/// the arithmetic of one fraction-free elimination: exact and checked on `i64`,
/// the same formulas on `f64` for rows that are not all integers
trait FractionFree: Copy + PartialEq + ToPrimitive {
    const ZERO: Self;
    fn gcd(a: Self, b: Self) -> Option<Self>;
    fn row_gcd(row: &[Self]) -> Option<Self>;
    /// `m1 * cell - m2 * pivot`, `None` on overflow
    fn combine(m1: Self, cell: Self, m2: Self, pivot: Self) -> Option<Self>;
    /// `divisor` is positive and divides `self` whenever the values are integers
    fn divide(self, divisor: Self) -> Self;
    fn exceeds_one(self) -> bool;
    fn label(self) -> String;
    fn into_cell(self) -> Cell;
}

impl FractionFree for i64 {
    const ZERO: Self = 0;
    fn gcd(a: Self, b: Self) -> Option<Self> {
        i64::try_from(gcd(a, b)).ok()
    }
    fn row_gcd(row: &[Self]) -> Option<Self> {
        i64::try_from(row_gcd(row)).ok()
    }
    fn combine(m1: Self, cell: Self, m2: Self, pivot: Self) -> Option<Self> {
        m1.checked_mul(cell)
            .zip(m2.checked_mul(pivot))
            .and_then(|(x, y)| x.checked_sub(y))
    }
    fn divide(self, divisor: Self) -> Self {
        self / divisor
    }
    fn exceeds_one(self) -> bool {
        self > 1
    }
    fn label(self) -> String {
        self.to_string()
    }
    fn into_cell(self) -> Cell {
        self as Cell
    }
}

impl FractionFree for Cell {
    const ZERO: Self = 0.;
    fn gcd(a: Self, b: Self) -> Option<Self> {
        Some(float_gcd(a, b))
    }
    fn row_gcd(row: &[Self]) -> Option<Self> {
        Some(float_row_gcd(row))
    }
    fn combine(m1: Self, cell: Self, m2: Self, pivot: Self) -> Option<Self> {
        Some(m1 * cell - m2 * pivot)
    }
    fn divide(self, divisor: Self) -> Self {
        self / divisor
    }
    fn exceeds_one(self) -> bool {
        self > 1.
    }
    fn label(self) -> String {
        format_cell(self)
    }
    fn into_cell(self) -> Cell {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntegerExactReducer {}

impl IntegerExactReducer {
    pub fn new() -> Self {
        Self {}
    }

    /// `None` unless every cell is a finite integral value that fits in `i64`
    pub fn to_integers(matrix: &[Vec<Cell>]) -> Option<Vec<Vec<i64>>> {
        // 2^63 is exactly representable, unlike `i64::MAX`
        const UPPER: Cell = 9_223_372_036_854_775_808.;
        matrix
            .iter()
            .map(|cells| {
                cells
                    .iter()
                    .map(|&value| {
                        (value.is_finite() && value.fract() == 0. && value >= -UPPER && value < UPPER)
                            .then_some(value as i64)
                    })
                    .collect()
            })
            .collect()
    }

    fn to_cells<T: FractionFree>(rows: &[Vec<T>]) -> Matrix {
        rows.iter()
            .map(|row| row.iter().map(|&value| value.into_cell()).collect())
            .collect()
    }

    /// `row = m1 * row - m2 * pivot_row` from column `j`, then divide out the row gcd;
    /// returns `(m1, m2, rg)`
    fn eliminate<T: FractionFree>(
        pivot_row: &[T],
        row: &mut [T],
        j: ColumnIndex,
        row_index: RowIndex,
    ) -> Result<(T, T, T), ReductionError> {
        let (a, b) = (pivot_row[j], row[j]);
        let overflow = |col| ReductionError::Overflow { row: row_index, col };
        let g = T::gcd(a, b).ok_or_else(|| overflow(j))?;
        let (m1, m2) = (a.divide(g), b.divide(g));
        for (offset, (cell, &pivot)) in row[j..].iter_mut().zip(pivot_row[j..].iter()).enumerate() {
            *cell = T::combine(m1, *cell, m2, pivot).ok_or_else(|| overflow(j + offset))?;
        }
        let rg = T::row_gcd(&row[j..]).ok_or_else(|| overflow(j))?;
        if rg.exceeds_one() {
            for cell in row[j..].iter_mut() {
                *cell = cell.divide(rg);
            }
        }
        Ok((m1, m2, rg))
    }

    fn reduce_rows<T: FractionFree>(
        mut rows: Vec<Vec<T>>,
        recorder: &mut dyn StepRecorder,
    ) -> Result<Matrix, ReductionError> {
        sort_by_pivot(&mut rows);
        recorder.push_step(SORT_DESCRIPTION.to_string(), &Self::to_cells(&rows));
        for i in 0..rows.len() {
            let Some(j) = first_nonzero_index(&rows[i]) else {
                continue; // no pivot
            };
            for k in i + 1..rows.len() {
                let (upper, lower) = rows.split_at_mut(k);
                let (pivot_row, row) = (&upper[i], &mut lower[0]);
                if row[j] == T::ZERO {
                    continue;
                }
                let (m1, m2, rg) = Self::eliminate(pivot_row, row, j, k)?;
                let mut description = format!(
                    "R{} ← ({})·R{} − ({})·R{}",
                    k + 1,
                    m1.label(),
                    k + 1,
                    m2.label(),
                    i + 1
                );
                if rg.exceeds_one() {
                    description.push_str(&format!(", ÷{}", rg.label()));
                }
                recorder.push_step(description, &Self::to_cells(&rows));
            }
        }
        Ok(Self::to_cells(&rows))
    }
}

impl RowReducer for IntegerExactReducer {
    fn reduce(&self, matrix: Matrix, recorder: &mut dyn StepRecorder) -> Result<Matrix, ReductionError> {
        ensure_rectangular(&matrix)?;
        match Self::to_integers(&matrix) {
            Some(rows) => Self::reduce_rows(rows, recorder),
            None => {
                tracing::debug!("input is not all integers, eliminating fraction-free on f64");
                Self::reduce_rows(matrix, recorder)
            }
        }
    }
}
