//! Ordinary least squares via the normal equations.

use crate::error::FitError;

/// Solve `min ||X b - y||²` where `rows` are the rows of `X`.
pub(crate) fn least_squares(rows: &[Vec<f64>], y: &[f64]) -> Result<Vec<f64>, FitError> {
    let k = rows.first().map_or(0, Vec::len);
    if k == 0 {
        return Ok(Vec::new());
    }
    if rows.len() < k || rows.len() != y.len() {
        return Err(FitError::TooShort);
    }

    // Augmented [XᵀX | Xᵀy].
    let mut a = vec![vec![0.0; k + 1]; k];
    for (row, &target) in rows.iter().zip(y) {
        for i in 0..k {
            for j in 0..k {
                a[i][j] += row[i] * row[j];
            }
            a[i][k] += row[i] * target;
        }
    }

    let scale = (0..k).map(|i| a[i][i].abs()).fold(0.0, f64::max).max(1.0);
    solve_in_place(&mut a, scale * 1e-12)
}

/// Gaussian elimination with partial pivoting on an augmented `k × (k+1)`
/// matrix.
fn solve_in_place(a: &mut [Vec<f64>], tiny: f64) -> Result<Vec<f64>, FitError> {
    let k = a.len();
    for col in 0..k {
        let pivot = (col..k)
            .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
            .unwrap_or(col);
        if !a[pivot][col].is_finite() || a[pivot][col].abs() < tiny {
            return Err(FitError::Singular);
        }
        a.swap(col, pivot);

        for row in (col + 1)..k {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for c in col..=k {
                a[row][c] -= factor * a[col][c];
            }
        }
    }

    let mut x = vec![0.0; k];
    for row in (0..k).rev() {
        let tail: f64 = ((row + 1)..k).map(|c| a[row][c] * x[c]).sum();
        x[row] = (a[row][k] - tail) / a[row][row];
    }

    if x.iter().all(|v| v.is_finite()) {
        Ok(x)
    } else {
        Err(FitError::NonFinite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_line() {
        // y = 2 + 3x
        let rows: Vec<Vec<f64>> = (0..5).map(|x| vec![1.0, x as f64]).collect();
        let y: Vec<f64> = (0..5).map(|x| 2.0 + 3.0 * x as f64).collect();

        let b = least_squares(&rows, &y).unwrap();
        assert!((b[0] - 2.0).abs() < 1e-9);
        assert!((b[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn collinear_columns_are_singular() {
        let rows: Vec<Vec<f64>> = (0..5).map(|x| vec![x as f64, 2.0 * x as f64]).collect();
        let y = vec![1.0; 5];
        assert_eq!(least_squares(&rows, &y), Err(FitError::Singular));
    }

    #[test]
    fn underdetermined_is_too_short() {
        let rows = vec![vec![1.0, 2.0, 3.0]];
        assert_eq!(least_squares(&rows, &[1.0]), Err(FitError::TooShort));
    }

    #[test]
    fn empty_design_is_empty_solution() {
        assert_eq!(least_squares(&[], &[]), Ok(Vec::new()));
    }
}
