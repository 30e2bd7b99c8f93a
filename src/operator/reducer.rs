//! Column → scalar operators. `NaN` samples are ignored.
use serde::{Deserialize, Serialize};

use crate::track_errors::TrackError;

fn finite(x: &[f64]) -> impl Iterator<Item = f64> + '_ {
    x.iter().copied().filter(|v| !v.is_nan())
}

pub(crate) fn nan_mean(x: &[f64]) -> f64 {
    let (s, n) = finite(x).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        s / n as f64
    }
}

/// Population variance.
pub(crate) fn nan_var(x: &[f64]) -> f64 {
    let m = nan_mean(x);
    nan_mean(&finite(x).map(|v| (v - m).powi(2)).collect::<Vec<_>>())
}

pub(crate) fn nan_std(x: &[f64]) -> f64 {
    nan_var(x).sqrt()
}

pub(crate) fn nan_median(x: &[f64]) -> f64 {
    let mut v: Vec<f64> = finite(x).collect();
    if v.is_empty() {
        return f64::NAN;
    }
    v.sort_by(|a, b| a.total_cmp(b));
    let n = v.len();
    if n % 2 == 1 {
        v[n / 2]
    } else {
        0.5 * (v[n / 2 - 1] + v[n / 2])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryReducer {
    Sum,
    Averager,
    Variance,
    StdDev,
    /// Mean of squares
    Mse,
    /// Root mean square
    Rmse,
    /// Median absolute deviation
    Mad,
    Min,
    Max,
    Median,
    ArgMin,
    ArgMax,
    /// Number of sign changes
    Zeros,
}

impl UnaryReducer {
    /// Reducer from an aggregate keyword (`SUM`, `AVG`, ...), case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        use UnaryReducer::*;
        Some(match name.to_ascii_uppercase().as_str() {
            "SUM" => Sum,
            "AVG" | "MEAN" | "AVERAGER" => Averager,
            "VAR" | "VARIANCE" => Variance,
            "STDDEV" | "STD" => StdDev,
            "MSE" => Mse,
            "RMSE" => Rmse,
            "MAD" => Mad,
            "MIN" => Min,
            "MAX" => Max,
            "MEDIAN" => Median,
            "ARGMIN" => ArgMin,
            "ARGMAX" => ArgMax,
            "ZEROS" => Zeros,
            _ => return None,
        })
    }

    pub fn reduce(&self, x: &[f64]) -> f64 {
        use UnaryReducer::*;
        match self {
            Sum => finite(x).sum::<f64>(),
            Averager => nan_mean(x),
            Variance => nan_var(x),
            StdDev => nan_std(x),
            Mse => nan_mean(&x.iter().map(|v| v * v).collect::<Vec<_>>()),
            Rmse => nan_mean(&x.iter().map(|v| v * v).collect::<Vec<_>>()).sqrt(),
            Mad => {
                let m = nan_median(x);
                nan_median(&x.iter().map(|v| (v - m).abs()).collect::<Vec<_>>())
            }
            Min => finite(x).reduce(f64::min).unwrap_or(f64::NAN),
            Max => finite(x).reduce(f64::max).unwrap_or(f64::NAN),
            Median => nan_median(x),
            ArgMin => arg_best(x, |a, b| a < b),
            ArgMax => arg_best(x, |a, b| a > b),
            Zeros => {
                let signs: Vec<f64> = finite(x).filter(|v| *v != 0.0).map(f64::signum).collect();
                signs.windows(2).filter(|w| w[0] != w[1]).count() as f64
            }
        }
    }
}

fn arg_best(x: &[f64], better: impl Fn(f64, f64) -> bool) -> f64 {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in x.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if !better(v, b) => {}
            _ => best = Some((i, v)),
        }
    }
    best.map_or(f64::NAN, |(i, _)| i as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryReducer {
    Covariance,
    Correlation,
    /// Number of differing samples
    L0Diff,
    L1Diff,
    L2Diff,
    LInfDiff,
    /// `1` when every pair is equal, `0` otherwise
    Equal,
}

impl BinaryReducer {
    /// Pairs with a `NaN` on either side are ignored.
    ///
    /// Errors
    /// ------
    /// * [`TrackError::SizeError`] when the columns have different lengths
    pub fn reduce(&self, x: &[f64], y: &[f64]) -> Result<f64, TrackError> {
        if x.len() != y.len() {
            return Err(TrackError::SizeError(format!(
                "binary reducer on columns of sizes {} and {}",
                x.len(),
                y.len()
            )));
        }
        let (a, b): (Vec<f64>, Vec<f64>) = x
            .iter()
            .zip(y)
            .filter(|(u, v)| !u.is_nan() && !v.is_nan())
            .map(|(u, v)| (*u, *v))
            .unzip();
        let diffs = || a.iter().zip(&b).map(|(u, v)| (u - v).abs());
        Ok(match self {
            BinaryReducer::Covariance => covariance(&a, &b),
            BinaryReducer::Correlation => {
                let (sa, sb) = (nan_std(&a), nan_std(&b));
                if sa == 0.0 || sb == 0.0 {
                    f64::NAN
                } else {
                    covariance(&a, &b) / (sa * sb)
                }
            }
            BinaryReducer::L0Diff => diffs().filter(|d| *d != 0.0).count() as f64,
            BinaryReducer::L1Diff => diffs().sum::<f64>(),
            BinaryReducer::L2Diff => diffs().map(|d| d * d).sum::<f64>().sqrt(),
            BinaryReducer::LInfDiff => diffs().fold(0.0, f64::max),
            BinaryReducer::Equal => {
                if diffs().all(|d| d == 0.0) {
                    1.0
                } else {
                    0.0
                }
            }
        })
    }
}

fn covariance(a: &[f64], b: &[f64]) -> f64 {
    let (ma, mb) = (nan_mean(a), nan_mean(b));
    nan_mean(
        &a.iter()
            .zip(b)
            .map(|(u, v)| (u - ma) * (v - mb))
            .collect::<Vec<_>>(),
    )
}
