//! Uniform B-spline smoothing.
//!
//! The basis function of degree `d` is the `(d + 1)`-fold self-convolution of the unit
//! indicator, evaluated in closed form. `K` knots split the parameter range in `K − 1`
//! intervals; one extra basis function on each side keeps the basis complete at the
//! ends. Coefficients are the least-squares solution of the design system, computed
//! by SVD so that under-determined fits (more basis functions than samples) return the
//! minimum-norm exact solution.
use nalgebra::DMatrix;

use crate::track_errors::TrackError;

fn binomial(n: usize, k: usize) -> f64 {
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

fn factorial(n: usize) -> f64 {
    (1..=n).map(|i| i as f64).product()
}

/// Centered cardinal B-spline of degree `d` at `x` (support `[−(d+1)/2, (d+1)/2]`).
pub fn cardinal(d: usize, x: f64) -> f64 {
    let half = (d + 1) as f64 / 2.0;
    if x.abs() >= half && d > 0 {
        return 0.0;
    }
    let sum: f64 = (0..=d + 1)
        .map(|k| {
            let y = x + half - k as f64;
            let term = if d == 0 {
                if y >= 0.0 {
                    1.0
                } else {
                    0.0
                }
            } else if y > 0.0 {
                y.powi(d as i32)
            } else {
                0.0
            };
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            sign * binomial(d + 1, k) * term
        })
        .sum();
    sum / factorial(d)
}

/// Fit every column with a B-spline of `degree` on `knots` knots and evaluate it at
/// `targets`.
///
/// Errors
/// ------
/// * [`TrackError::ConfigError`] when `degree > 3` or `knots < 2`,
/// * [`TrackError::SingularSystem`] when the least-squares solve fails
pub fn fit_eval(
    params: &[f64],
    columns: &[Vec<f64>],
    targets: &[f64],
    degree: usize,
    knots: usize,
) -> Result<Vec<Vec<f64>>, TrackError> {
    if degree > 3 {
        return Err(TrackError::ConfigError(format!(
            "B-spline degree {degree} is not supported (max 3)"
        )));
    }
    if knots < 2 {
        return Err(TrackError::ConfigError(format!(
            "B-spline needs at least 2 knots, got {knots}"
        )));
    }
    let n = params.len();
    if n == 0 {
        return Err(TrackError::EmptyTrack);
    }
    let p0 = params[0];
    let range = params[n - 1] - p0;
    let h = if range > 0.0 { range / (knots - 1) as f64 } else { 1.0 };
    let m = knots + 2;
    // basis function k is centered on p0 + (k − 1)h
    let basis = |p: f64, k: usize| cardinal(degree, (p - p0) / h - (k as f64 - 1.0));

    let design = DMatrix::<f64>::from_fn(n, m, |i, k| basis(params[i], k));
    let mut rhs = DMatrix::<f64>::zeros(n, columns.len());
    for (c, column) in columns.iter().enumerate() {
        for (i, v) in column.iter().enumerate() {
            rhs[(i, c)] = *v;
        }
    }
    let coefficients = design
        .svd(true, true)
        .solve(&rhs, 1e-12)
        .map_err(|e| TrackError::SingularSystem(format!("B-spline least squares: {e}")))?;

    Ok((0..columns.len())
        .map(|c| {
            targets
                .iter()
                .map(|&t| (0..m).map(|k| coefficients[(k, c)] * basis(t, k)).sum())
                .collect()
        })
        .collect())
}
