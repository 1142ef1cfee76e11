use ndarray::{Array1, Array2, ArrayView2};

pub struct MatrixHelper;

impl MatrixHelper {
    /// Multiply two 2D arrays.
    pub fn multiply(lhs: ArrayView2<f64>, rhs: ArrayView2<f64>) -> Array2<f64> {
        lhs.dot(&rhs)
    }

    /// Solves the square system `a * x = b` by Gaussian elimination with partial pivoting.
    ///
    /// Returns `None` when the system is not square or is numerically singular.
    pub fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
        let n = a.nrows();
        if a.ncols() != n || b.len() != n || n == 0 {
            return None;
        }

        let mut m = a.clone();
        let mut rhs = b.clone();
        let scale = m.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let tolerance = scale * 1e-14;

        for col in 0..n {
            let pivot = (col..n).max_by(|&i, &j| m[[i, col]].abs().total_cmp(&m[[j, col]].abs()))?;
            if m[[pivot, col]].abs() <= tolerance {
                return None;
            }
            if pivot != col {
                for k in 0..n {
                    m.swap([pivot, k], [col, k]);
                }
                rhs.swap(pivot, col);
            }
            for row in col + 1..n {
                let factor = m[[row, col]] / m[[col, col]];
                if factor == 0.0 {
                    continue;
                }
                for k in col..n {
                    m[[row, k]] -= factor * m[[col, k]];
                }
                rhs[row] -= factor * rhs[col];
            }
        }

        let mut x = Array1::zeros(n);
        for row in (0..n).rev() {
            let tail: f64 = (row + 1..n).map(|k| m[[row, k]] * x[k]).sum();
            x[row] = (rhs[row] - tail) / m[[row, row]];
        }
        Some(x)
    }
}
