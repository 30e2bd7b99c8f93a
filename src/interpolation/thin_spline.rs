//! Thin-plate spline smoothing along a 1-D parameter.
//!
//! With `φ(r) = r² log r`, the fit solves
//!
//! ```text
//! | Φ + λI   P | | w |   | v |
//! | Pᵀ       0 | | a | = | 0 |          P = [1, u_i]
//! ```
//!
//! and evaluates `f(u) = Σ w_i φ(|u − u_i|) + a₀ + a₁ u`. Parameters are rescaled to
//! `[0, 1]` before the solve.
use nalgebra::DMatrix;

use crate::track_errors::TrackError;

fn phi(r: f64) -> f64 {
    if r <= 0.0 {
        0.0
    } else {
        r * r * r.ln()
    }
}

/// Fit every column of `columns` (sampled at `params`) and evaluate it at `targets`.
///
/// Arguments
/// ---------
/// * `params` – strictly increasing sample parameters
/// * `columns` – one value vector per interpolated quantity
/// * `targets` – evaluation parameters
/// * `penalization` – diagonal term λ, `0` for exact interpolation
///
/// Errors
/// ------
/// * [`TrackError::SingularSystem`] when the linear system cannot be solved
pub fn fit_eval(
    params: &[f64],
    columns: &[Vec<f64>],
    targets: &[f64],
    penalization: f64,
) -> Result<Vec<Vec<f64>>, TrackError> {
    let n = params.len();
    if n < 2 {
        return Err(TrackError::SingularSystem(format!(
            "thin-plate spline needs 2 samples, got {n}"
        )));
    }
    let (p0, range) = (params[0], params[n - 1] - params[0]);
    let range = if range > 0.0 { range } else { 1.0 };
    let u: Vec<f64> = params.iter().map(|p| (p - p0) / range).collect();

    let mut system = DMatrix::<f64>::zeros(n + 2, n + 2);
    for i in 0..n {
        for j in 0..n {
            system[(i, j)] = phi((u[i] - u[j]).abs());
        }
        system[(i, i)] += penalization;
        system[(i, n)] = 1.0;
        system[(i, n + 1)] = u[i];
        system[(n, i)] = 1.0;
        system[(n + 1, i)] = u[i];
    }
    let mut rhs = DMatrix::<f64>::zeros(n + 2, columns.len());
    for (c, column) in columns.iter().enumerate() {
        for (i, v) in column.iter().enumerate() {
            rhs[(i, c)] = *v;
        }
    }
    let coefficients = system
        .lu()
        .solve(&rhs)
        .ok_or_else(|| TrackError::SingularSystem("thin-plate spline system".into()))?;

    Ok((0..columns.len())
        .map(|c| {
            targets
                .iter()
                .map(|t| {
                    let ut = (t - p0) / range;
                    let bending: f64 = (0..n)
                        .map(|i| coefficients[(i, c)] * phi((ut - u[i]).abs()))
                        .sum();
                    bending + coefficients[(n, c)] + coefficients[(n + 1, c)] * ut
                })
                .collect()
        })
        .collect())
}
