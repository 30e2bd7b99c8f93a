//! Sliding-window filters, pointwise application and random columns.
//!
//! Both filters share one boundary rule: a kernel that does not filter its boundary
//! leaves the `m` first and last samples unchanged (`m` = window half-width);
//! otherwise the partial window is renormalized by the sum of the weights it covers.
//! `NaN` samples are excluded from the weighted sums the same way.
use num_complex::Complex64;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};

use crate::kernel::{check_window, Kernel};
use crate::operator::fft::{fft, next_pow2};
use crate::track_errors::TrackError;

/// Direct-space filtering with the sampled window of `kernel`.
pub fn filter(x: &[f64], kernel: &Kernel) -> Result<Vec<f64>, TrackError> {
    let window = kernel.checked_window()?;
    filter_with_window(x, &window, kernel.filter_boundary())
}

/// Direct-space filtering with an explicit odd-length window.
pub fn filter_with_window(
    x: &[f64],
    window: &[f64],
    filter_boundary: bool,
) -> Result<Vec<f64>, TrackError> {
    check_window(window)?;
    let n = x.len();
    let m = window.len() / 2;
    Ok((0..n)
        .map(|i| {
            let at_boundary = i < m || i + m >= n;
            if at_boundary && !filter_boundary {
                return x[i];
            }
            let (mut acc, mut wsum) = (0.0, 0.0);
            for (k, w) in window.iter().enumerate() {
                let j = i as isize + k as isize - m as isize;
                if j < 0 || j >= n as isize {
                    continue;
                }
                let v = x[j as usize];
                if v.is_nan() {
                    continue;
                }
                acc += w * v;
                wsum += w;
            }
            if wsum == 0.0 {
                f64::NAN
            } else {
                acc / wsum
            }
        })
        .collect())
}

/// Frequency-domain filtering.
///
/// The signal is zero-padded to a power of two `N ≥ n + m`, the window is wrapped
/// around index 0 (a roll by its half-width), and the circular product of both
/// spectra is inverted. The same product applied to the indicator of valid samples
/// gives the renormalization weights of partial windows.
pub fn filter_fft(x: &[f64], kernel: &Kernel) -> Result<Vec<f64>, TrackError> {
    let window = kernel.checked_window()?;
    let n = x.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    let m = window.len() / 2;
    let size = next_pow2(n + window.len());

    let mut signal = vec![Complex64::new(0.0, 0.0); size];
    let mut valid = vec![Complex64::new(0.0, 0.0); size];
    for (i, &v) in x.iter().enumerate() {
        if !v.is_nan() {
            signal[i] = Complex64::new(v, 0.0);
            valid[i] = Complex64::new(1.0, 0.0);
        }
    }
    let mut taps = vec![Complex64::new(0.0, 0.0); size];
    for (k, &w) in window.iter().enumerate() {
        let offset = (k as isize - m as isize).rem_euclid(size as isize) as usize;
        taps[offset] = Complex64::new(w, 0.0);
    }

    fft(&mut signal, false);
    fft(&mut valid, false);
    fft(&mut taps, false);
    for ((s, v), t) in signal.iter_mut().zip(valid.iter_mut()).zip(&taps) {
        *s *= t;
        *v *= t;
    }
    fft(&mut signal, true);
    fft(&mut valid, true);

    Ok((0..n)
        .map(|i| {
            let at_boundary = i < m || i + m >= n;
            if at_boundary && !kernel.filter_boundary() {
                return x[i];
            }
            let wsum = valid[i].re;
            if wsum.abs() < 1e-12 {
                f64::NAN
            } else {
                signal[i].re / wsum
            }
        })
        .collect())
}

/// Pointwise application of an arbitrary function.
pub fn apply(x: &[f64], f: impl Fn(f64) -> f64) -> Vec<f64> {
    x.iter().map(|&v| f(v)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RandomDistribution {
    /// Uniform on `[low, high)`
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, sigma: f64 },
}

/// `n` random samples, reproducible when a `seed` is given.
pub fn random(n: usize, distribution: RandomDistribution, seed: Option<u64>) -> Result<Vec<f64>, TrackError> {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    match distribution {
        RandomDistribution::Uniform { low, high } => {
            let d = Uniform::new(low, high)
                .map_err(|e| TrackError::ConfigError(format!("uniform distribution: {e}")))?;
            Ok((0..n).map(|_| d.sample(&mut rng)).collect())
        }
        RandomDistribution::Normal { mean, sigma } => {
            let d = Normal::new(mean, sigma)
                .map_err(|e| TrackError::ConfigError(format!("normal distribution: {e}")))?;
            Ok((0..n).map(|_| rng.sample(d)).collect())
        }
    }
}
