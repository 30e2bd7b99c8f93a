use serde::{Deserialize, Serialize};

use crate::operator::fft::linear_convolution;
use crate::operator::reducer::{nan_mean, nan_std};
use crate::track_errors::TrackError;

/// Two columns → one column, elementwise unless stated otherwise.
///
/// Division and modulo by zero yield `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Power,
    Modulo,
    /// `1` where `x > y`, else `0`
    Above,
    /// `1` where `x < y`, else `0`
    Below,
    /// `sqrt(x² + y²)`
    QuadraticAdder,
    /// `1` where `x = y`, else `0`
    PointwiseEqual,
    /// `Δx / Δy`, `NaN` on the first sample
    Derivator,
    /// Rescale `x` to the mean and deviation of `y`
    Renormalizer,
    /// Centered convolution computed in the frequency domain
    Convolution,
    /// Centered cross-correlation
    Correlator,
}

fn elementwise(x: &[f64], y: &[f64], f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    x.iter().zip(y).map(|(&a, &b)| f(a, b)).collect()
}

fn indicator(c: bool) -> f64 {
    if c {
        1.0
    } else {
        0.0
    }
}

/// Central `n` samples of a full convolution with a kernel of length `m`.
fn centered(full: Vec<f64>, n: usize, m: usize) -> Vec<f64> {
    let d = m / 2;
    full.into_iter().skip(d).take(n).collect()
}

impl BinaryOperator {
    /// Operator from its expression-language symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        use BinaryOperator::*;
        Some(match symbol {
            "+" => Addition,
            "-" => Subtraction,
            "*" => Multiplication,
            "/" => Division,
            "^" | "**" => Power,
            "%" => Modulo,
            ">" => Above,
            "<" => Below,
            "!" | ".*" => Convolution,
            _ => return None,
        })
    }

    /// Operator from its function name in the expression language.
    pub fn from_name(name: &str) -> Option<Self> {
        use BinaryOperator::*;
        Some(match name.to_ascii_lowercase().as_str() {
            "quad" | "quadratic_adder" => QuadraticAdder,
            "equal" | "pointwise_equal" => PointwiseEqual,
            "derivator" => Derivator,
            "renorm" | "renormalizer" => Renormalizer,
            "conv" | "convolution" => Convolution,
            "corr" | "correlator" => Correlator,
            _ => return None,
        })
    }

    /// Errors
    /// ------
    /// * [`TrackError::SizeError`] when the columns have different lengths
    pub fn apply(&self, x: &[f64], y: &[f64]) -> Result<Vec<f64>, TrackError> {
        use BinaryOperator::*;
        if x.len() != y.len() {
            return Err(TrackError::SizeError(format!(
                "binary operator {self:?} on columns of sizes {} and {}",
                x.len(),
                y.len()
            )));
        }
        let n = x.len();
        Ok(match self {
            Addition => elementwise(x, y, |a, b| a + b),
            Subtraction => elementwise(x, y, |a, b| a - b),
            Multiplication => elementwise(x, y, |a, b| a * b),
            Division => elementwise(x, y, |a, b| if b == 0.0 { f64::NAN } else { a / b }),
            Power => elementwise(x, y, f64::powf),
            Modulo => elementwise(x, y, |a, b| if b == 0.0 { f64::NAN } else { a.rem_euclid(b) }),
            Above => elementwise(x, y, |a, b| indicator(a > b)),
            Below => elementwise(x, y, |a, b| indicator(a < b)),
            QuadraticAdder => elementwise(x, y, f64::hypot),
            PointwiseEqual => elementwise(x, y, |a, b| indicator(a == b)),
            Derivator => (0..n)
                .map(|i| {
                    if i == 0 {
                        return f64::NAN;
                    }
                    let dy = y[i] - y[i - 1];
                    if dy == 0.0 {
                        f64::NAN
                    } else {
                        (x[i] - x[i - 1]) / dy
                    }
                })
                .collect(),
            Renormalizer => {
                let (m1, s1) = (nan_mean(x), nan_std(x));
                let (m2, s2) = (nan_mean(y), nan_std(y));
                x.iter()
                    .map(|v| if s1 == 0.0 { f64::NAN } else { (v - m1) * s2 / s1 + m2 })
                    .collect()
            }
            Convolution => centered(linear_convolution(x, y), n, n),
            Correlator => {
                let reversed: Vec<f64> = y.iter().rev().copied().collect();
                centered(linear_convolution(x, &reversed), n, n)
            }
        })
    }
}
