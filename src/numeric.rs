//! Numeric Utilities
//!
//! Integer helpers used by the fraction-free elimination and the pivot lookup
//! shared by both reduction strategies.
//!

use crate::util::*;
use num_traits::ToPrimitive;

/// greatest common divisor of the absolute values; `gcd(0, 0) == 0`
pub fn gcd(a: i64, b: i64) -> u64 {
    let mut a = a.unsigned_abs();
    let mut b = b.unsigned_abs();
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// gcd of all nonzero elements in a row; a row without nonzero elements yields 1,
/// so it is never scaled
pub fn row_gcd(row: &[i64]) -> u64 {
    let mut g: u64 = 0;
    for &x in row.iter() {
        if x != 0 {
            g = if g == 0 { x.unsigned_abs() } else { gcd(g as i64, x) };
        }
        if g == 1 {
            break; // gcd with anything stays 1
        }
    }
    if g == 0 {
        1
    } else {
        g
    }
}

/// Euclid on `f64` magnitudes, for fraction-free elimination of non-integral rows;
/// the remainder is exact, so this terminates for every pair of finite values.
/// NaN when either side is not finite
pub fn float_gcd(a: f64, b: f64) -> f64 {
    let mut a = a.abs();
    let mut b = b.abs();
    if !a.is_finite() || !b.is_finite() {
        return f64::NAN;
    }
    while b != 0. {
        (a, b) = (b, a % b);
    }
    a
}

/// [`row_gcd`] for `f64` rows
pub fn float_row_gcd(row: &[f64]) -> f64 {
    let mut g = 0.;
    for &x in row.iter() {
        if x != 0. {
            g = if g == 0. { x.abs() } else { float_gcd(g, x) };
        }
        if g == 1. {
            break;
        }
    }
    if g == 0. {
        1.
    } else {
        g
    }
}

/// index of the first cell whose truncated value is nonzero, `None` if there is no pivot;
/// NaN and infinite cells never act as a pivot
pub fn first_nonzero_index<T: ToPrimitive>(row: &[T]) -> Option<ColumnIndex> {
    row.iter()
        .position(|x| x.to_f64().map_or(false, |value| value.is_finite() && value.trunc() != 0.))
}

/// sort key of a row: rows without a pivot sort after every other row
pub fn pivot_sort_key<T: ToPrimitive>(row: &[T]) -> usize {
    first_nonzero_index(row).unwrap_or(usize::MAX)
}

/// stable sort by pivot column, rows without a pivot go last
pub fn sort_by_pivot<T: ToPrimitive>(matrix: &mut [Vec<T>]) {
    matrix.sort_by_key(|row| pivot_sort_key(row));
}
