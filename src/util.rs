use crate::rand_xoshiro;
use crate::serde::{Deserialize, Deserializer, Serialize, Serializer};
use rand::Rng;
use thiserror::Error;

pub type Cell = f64;
/// rows of cells; every hand-off between components clones the whole matrix
pub type Matrix = Vec<Vec<Cell>>;
pub type RowIndex = usize;
pub type ColumnIndex = usize;

pub type DeterministicRng = rand_xoshiro::Xoshiro256StarStar;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// nothing to import
    #[error("no matrix text to import")]
    Empty,
}

/// number text as the matrix editor shows it: no negative zero, exponent notation
/// below `1e-6` and from `1e21` on
pub fn format_cell(value: Cell) -> String {
    if value == 0. {
        return "0".to_string();
    }
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0. { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return value.to_string();
    }
    let text = format!("{value:e}");
    match text.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{mantissa}e+{exponent}"),
        _ => text,
    }
}

/// matrices in JSON: non-finite cells are written as `null` and read back as NaN,
/// so a stored matrix always loads again
pub mod matrix_serde {
    use super::*;

    pub fn serialize<S: Serializer>(matrix: &[Vec<Cell>], serializer: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<Vec<Option<Cell>>> = matrix
            .iter()
            .map(|row| row.iter().map(|&cell| cell.is_finite().then_some(cell)).collect())
            .collect();
        rows.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Matrix, D::Error> {
        let rows = Vec::<Vec<Option<Cell>>>::deserialize(deserializer)?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().map(|cell| cell.unwrap_or(Cell::NAN)).collect())
            .collect())
    }
}

/// the `(rows, columns)` shape of a rectangular matrix; otherwise the first row whose length
/// differs from the first row, as `(row, expected, found)`
pub fn check_rectangular(matrix: &[Vec<Cell>]) -> Result<(usize, usize), (RowIndex, usize, usize)> {
    let columns = matrix.first().map_or(0, |row| row.len());
    for (row_index, row) in matrix.iter().enumerate() {
        if row.len() != columns {
            return Err((row_index, columns, row.len()));
        }
    }
    Ok((matrix.len(), columns))
}

/// a zero grid; both dimensions are clamped to at least 1
pub fn zero_matrix(rows: usize, columns: usize) -> Matrix {
    vec![vec![0.; columns.max(1)]; rows.max(1)]
}

/// parse whitespace separated numbers, one matrix row per line;
/// tokens that are not finite numbers become 0 and short rows are padded with 0
pub fn parse_matrix_text(text: &str) -> Result<Matrix, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut matrix: Matrix = text
        .lines()
        .map(|line| {
            line.split_whitespace()
                .map(|token| match token.parse::<Cell>() {
                    Ok(value) if value.is_finite() => value,
                    _ => 0.,
                })
                .collect()
        })
        .collect();
    let columns = matrix.iter().map(|row| row.len()).max().unwrap_or(0);
    for row in matrix.iter_mut() {
        row.resize(columns, 0.);
    }
    Ok(matrix)
}

/// fill a `rows x columns` grid with integers uniformly drawn from `[min, max]`
pub fn random_matrix<R: Rng>(rows: usize, columns: usize, min: i64, max: i64, rng: &mut R) -> Matrix {
    let (low, high) = (min.min(max), min.max(max));
    let mut matrix = zero_matrix(rows, columns);
    for row in matrix.iter_mut() {
        for cell in row.iter_mut() {
            *cell = rng.gen_range(low..=high) as Cell;
        }
    }
    matrix
}
