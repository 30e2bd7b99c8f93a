//! Gaussian-process regression along a 1-D parameter.
//!
//! Covariance `K(p_i, p_j) = factor · k(p_i − p_j) + σ² δ_ij` where `k` is a
//! [`Kernel`] evaluated in parameter units. The posterior mean is computed around the
//! sample mean of each column; the posterior deviation is shared by all columns.
use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::kernel::Kernel;
use crate::track_errors::TrackError;

/// Parameters of the regression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpParams {
    pub kernel: Kernel,
    pub factor: f64,
    pub noise: f64,
}

/// Posterior means (one vector per column) and posterior deviations at the targets.
pub struct GpOutput {
    pub means: Vec<Vec<f64>>,
    pub sigma: Vec<f64>,
}

/// Errors
/// ------
/// * [`TrackError::SingularSystem`] when the covariance matrix is not invertible
pub fn fit_eval(
    params: &[f64],
    columns: &[Vec<f64>],
    targets: &[f64],
    gp: &GpParams,
) -> Result<GpOutput, TrackError> {
    let n = params.len();
    if n == 0 {
        return Err(TrackError::EmptyTrack);
    }
    let cov = |a: f64, b: f64| gp.factor * gp.kernel.value(a - b);
    let mut k = DMatrix::<f64>::from_fn(n, n, |i, j| cov(params[i], params[j]));
    for i in 0..n {
        // jitter keeps noiseless systems positive definite
        k[(i, i)] += gp.noise * gp.noise + 1e-10 * gp.factor.abs().max(1.0);
    }

    let solve = |rhs: &DMatrix<f64>| -> Result<DMatrix<f64>, TrackError> {
        if let Some(chol) = k.clone().cholesky() {
            return Ok(chol.solve(rhs));
        }
        debug!("covariance not positive definite, falling back to LU");
        k.clone()
            .lu()
            .solve(rhs)
            .ok_or_else(|| TrackError::SingularSystem("Gaussian-process covariance".into()))
    };

    let means_of: Vec<f64> = columns
        .iter()
        .map(|c| c.iter().sum::<f64>() / c.len().max(1) as f64)
        .collect();
    let centered = DMatrix::<f64>::from_fn(n, columns.len(), |i, c| columns[c][i] - means_of[c]);
    let alpha = solve(&centered)?;

    let cross = DMatrix::<f64>::from_fn(n, targets.len(), |i, t| cov(params[i], targets[t]));
    let beta = solve(&cross)?;

    let means = (0..columns.len())
        .map(|c| {
            let a = DVector::from_iterator(n, alpha.column(c).iter().copied());
            (0..targets.len())
                .map(|t| cross.column(t).dot(&a) + means_of[c])
                .collect()
        })
        .collect();
    let sigma = (0..targets.len())
        .map(|t| {
            let var = cov(targets[t], targets[t]) - cross.column(t).dot(&beta.column(t));
            var.max(0.0).sqrt()
        })
        .collect();
    Ok(GpOutput { means, sigma })
}

#[cfg(test)]
mod gaussian_process_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn params() -> GpParams {
        GpParams {
            kernel: Kernel::gaussian(1.0),
            factor: 1.0,
            noise: 0.0,
        }
    }

    #[test]
    fn test_noiseless_gp_interpolates() {
        let p: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let v: Vec<f64> = p.iter().map(|x| (x * 0.4).sin()).collect();
        let out = fit_eval(&p, &[v.clone()], &p, &params()).unwrap();
        for (a, b) in out.means[0].iter().zip(&v) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
        }
        assert!(out.sigma.iter().all(|s| *s < 1e-3));
    }

    #[test]
    fn test_sigma_grows_away_from_samples() {
        let p = vec![0.0, 1.0, 2.0];
        let v = vec![1.0, 2.0, 3.0];
        let out = fit_eval(&p, &[v], &[1.0, 1.5, 6.0], &params()).unwrap();
        assert!(out.sigma[0] < out.sigma[1]);
        assert!(out.sigma[1] < out.sigma[2]);
        // far from the data the mean returns to the sample mean
        assert_abs_diff_eq!(out.means[0][2], 2.0, epsilon = 0.5);
    }
}
