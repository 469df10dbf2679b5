//! Savitzky-Golay smoothing.
//!
//! Each output sample is the value at the window centre of a least-squares
//! polynomial fitted over `window` neighbouring samples. The fit reduces to a
//! fixed set of convolution weights: row 0 of the pseudo-inverse of the
//! window's Vandermonde matrix `B[k][i] = k^i`, `k = -h..=h`.

use crate::error::AnalysisError;

#[derive(Debug, Clone, PartialEq)]
pub struct SavitzkyGolay {
    window: usize,
    order: usize,
    coeffs: Vec<f64>,
}

impl SavitzkyGolay {
    pub fn new(window: usize, order: usize) -> Result<Self, AnalysisError> {
        if window == 0 || window % 2 != 1 {
            return Err(AnalysisError::InvalidArgument(format!(
                "window size must be a positive odd number, got {}",
                window
            )));
        }
        if window < order + 2 {
            return Err(AnalysisError::InvalidArgument(format!(
                "window size {} is too small for polynomial order {}",
                window, order
            )));
        }

        Ok(Self {
            window,
            order,
            coeffs: smoothing_coefficients(window, order)?,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coeffs
    }

    /// Smooth `series`; the output has the same length as the input.
    pub fn apply(&self, series: &[f64]) -> Vec<f64> {
        if series.is_empty() {
            return Vec::new();
        }
        let padded = pad_edges(series, self.window / 2);
        padded
            .windows(self.window)
            .map(|w| w.iter().zip(&self.coeffs).map(|(y, c)| y * c).sum::<f64>())
            .collect()
    }
}

/// Convenience wrapper building the filter for a single series.
pub fn smooth(series: &[f64], window: usize, order: usize) -> Result<Vec<f64>, AnalysisError> {
    Ok(SavitzkyGolay::new(window, order)?.apply(series))
}

/// Throughput and latency cannot go negative; smoothing overshoot can.
pub fn clamp_non_negative(series: &mut [f64]) {
    for v in series.iter_mut() {
        if *v < 0.0 {
            *v = 0.0;
        }
    }
}

/// Extend both ends by `half` samples mirrored through the boundary value.
///
/// Series shorter than the window reuse their last available neighbour.
fn pad_edges(y: &[f64], half: usize) -> Vec<f64> {
    let n = y.len();
    let first = y[0];
    let last = y[n - 1];
    let at = |j: usize| j.min(n - 1);

    let mut out = Vec::with_capacity(n + 2 * half);
    for j in (1..=half).rev() {
        out.push(first - (y[at(j)] - first).abs());
    }
    out.extend_from_slice(y);
    for j in 1..=half {
        out.push(last + (y[n - 1 - at(j)] - last).abs());
    }
    out
}

fn smoothing_coefficients(window: usize, order: usize) -> Result<Vec<f64>, AnalysisError> {
    let half = (window / 2) as i64;
    let terms = order + 1;
    let positions: Vec<f64> = (-half..=half).map(|k| k as f64).collect();

    // Normal equations (B^T B) c = e0; row 0 of pinv(B) is then c^T B^T.
    let mut normal = vec![vec![0.0f64; terms]; terms];
    for (i, row) in normal.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = positions.iter().map(|k| k.powi((i + j) as i32)).sum::<f64>();
        }
    }
    let mut rhs = vec![0.0f64; terms];
    rhs[0] = 1.0;
    let c = solve(normal, rhs)?;

    Ok(positions
        .iter()
        .map(|k| c.iter().enumerate().map(|(i, ci)| ci * k.powi(i as i32)).sum::<f64>())
        .collect())
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, AnalysisError> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < f64::EPSILON {
            return Err(AnalysisError::InvalidArgument(
                "singular design matrix for smoothing window".to_string(),
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0f64; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}
