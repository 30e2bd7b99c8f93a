//! # Convolution kernels
//!
//! Symmetric functions `K(Δ)` parameterized by a scalar bandwidth. They are used
//!
//! * as **sliding windows** by [`crate::operator::filter`] (sampled at integer offsets
//!   and normalized to unit sum), and
//! * as **covariance functions** by the Gaussian-process interpolator
//!   (evaluated on real-valued offsets, peak value 1).
//!
//! | Kind           | `value(x)`                         | Window half-width | Filters boundary |
//! |----------------|------------------------------------|-------------------|------------------|
//! | Dirac          | `1` if `x = 0`                     | 0                 | yes              |
//! | Uniform        | `1` if `|x| ≤ h/2`                 | `⌊h/2⌋`, length `h` | yes            |
//! | Triangular     | `max(0, 1 − |x|/h)`                | `⌈h⌉`             | no               |
//! | Gaussian       | `exp(−x²/2h²)`                     | `⌈3h⌉`            | no               |
//! | Exponential    | `exp(−|x|/h)`                      | `⌈3h⌉`            | no               |
//! | Epanechnikov   | `max(0, 1 − (x/h)²)`               | `⌈h⌉`             | no               |
//! | Sinc           | `sin(πx/h)/(πx/h)`                 | `⌈3h⌉`            | no               |
//!
//! The uniform kernel of width `w` samples to a window of exactly `w` taps; an even `w`
//! therefore produces an even-length window, which the filters reject with
//! [`TrackError::KernelError`].
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::track_errors::TrackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelKind {
    Dirac,
    Uniform,
    Triangular,
    Gaussian,
    Exponential,
    Epanechnikov,
    Sinc,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kernel {
    kind: KernelKind,
    bandwidth: f64,
    filter_boundary: bool,
}

impl Kernel {
    /// Build a kernel with its default boundary policy.
    pub fn new(kind: KernelKind, bandwidth: f64) -> Self {
        let filter_boundary = matches!(kind, KernelKind::Dirac | KernelKind::Uniform);
        Kernel {
            kind,
            bandwidth,
            filter_boundary,
        }
    }

    pub fn dirac() -> Self {
        Kernel::new(KernelKind::Dirac, 0.0)
    }

    /// Uniform window of `width` samples.
    pub fn uniform(width: f64) -> Self {
        Kernel::new(KernelKind::Uniform, width)
    }

    pub fn triangular(bandwidth: f64) -> Self {
        Kernel::new(KernelKind::Triangular, bandwidth)
    }

    /// Gaussian kernel with standard deviation `sigma`.
    pub fn gaussian(sigma: f64) -> Self {
        Kernel::new(KernelKind::Gaussian, sigma)
    }

    pub fn exponential(bandwidth: f64) -> Self {
        Kernel::new(KernelKind::Exponential, bandwidth)
    }

    pub fn epanechnikov(bandwidth: f64) -> Self {
        Kernel::new(KernelKind::Epanechnikov, bandwidth)
    }

    pub fn sinc(bandwidth: f64) -> Self {
        Kernel::new(KernelKind::Sinc, bandwidth)
    }

    /// Override the boundary policy.
    pub fn with_boundary_filtering(mut self, filter_boundary: bool) -> Self {
        self.filter_boundary = filter_boundary;
        self
    }

    pub fn kind(&self) -> KernelKind {
        self.kind
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// `true` when filters must also smooth the samples closer than the half-width
    /// to either end; otherwise those samples are copied unchanged.
    pub fn filter_boundary(&self) -> bool {
        self.filter_boundary
    }

    /// Evaluate the (unnormalized) kernel at offset `x`.
    pub fn value(&self, x: f64) -> f64 {
        let h = self.bandwidth;
        match self.kind {
            KernelKind::Dirac => {
                if x == 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            KernelKind::Uniform => {
                if x.abs() <= h / 2.0 {
                    1.0
                } else {
                    0.0
                }
            }
            KernelKind::Triangular => (1.0 - x.abs() / h).max(0.0),
            KernelKind::Gaussian => (-x * x / (2.0 * h * h)).exp(),
            KernelKind::Exponential => (-x.abs() / h).exp(),
            KernelKind::Epanechnikov => (1.0 - (x / h).powi(2)).max(0.0),
            KernelKind::Sinc => {
                if x == 0.0 {
                    1.0
                } else {
                    let u = PI * x / h;
                    u.sin() / u
                }
            }
        }
    }

    /// Half-width (in samples) of the sampled window.
    fn half_width(&self) -> usize {
        let h = self.bandwidth.max(0.0);
        match self.kind {
            KernelKind::Dirac => 0,
            KernelKind::Uniform => (h.round() as usize) / 2,
            KernelKind::Triangular | KernelKind::Epanechnikov => h.ceil() as usize,
            KernelKind::Gaussian | KernelKind::Exponential | KernelKind::Sinc => {
                (3.0 * h).ceil() as usize
            }
        }
    }

    /// Sample the kernel at integer offsets and normalize the window to unit sum.
    ///
    /// Return
    /// ------
    /// * a window of length `2m + 1` for every kind but the uniform kernel, whose
    ///   length is its (rounded) width
    pub fn to_sliding_window(&self) -> Vec<f64> {
        let window: Vec<f64> = match self.kind {
            KernelKind::Uniform => {
                let w = (self.bandwidth.round() as usize).max(1);
                vec![1.0; w]
            }
            _ => {
                let m = self.half_width() as i64;
                (-m..=m).map(|k| self.value(k as f64)).collect()
            }
        };
        let total: f64 = window.iter().sum();
        if total == 0.0 {
            return window;
        }
        window.into_iter().map(|w| w / total).collect()
    }

    /// Sliding window checked for odd length.
    pub(crate) fn checked_window(&self) -> Result<Vec<f64>, TrackError> {
        let window = self.to_sliding_window();
        check_window(&window)?;
        Ok(window)
    }
}

/// Reject empty or even-length windows.
pub(crate) fn check_window(window: &[f64]) -> Result<(), TrackError> {
    if window.is_empty() {
        return Err(TrackError::KernelError("empty kernel window".into()));
    }
    if window.len() % 2 == 0 {
        return Err(TrackError::KernelError(format!(
            "kernel window length must be odd, got {}",
            window.len()
        )));
    }
    if window.iter().any(|w| !w.is_finite()) {
        return Err(TrackError::KernelError("non-finite kernel weight".into()));
    }
    Ok(())
}
