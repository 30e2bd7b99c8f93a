use serde::{Deserialize, Serialize};

use crate::operator::reducer::{nan_mean, nan_std};

/// Column → column operators.
///
/// Shifts are expressed in samples; a positive shift delays the signal
/// (`y[i] = x[i − k]`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Identity,
    /// `|x|`
    Rectifier,
    /// Prefix sum; `NaN` samples are skipped and stay `NaN`
    Integrator,
    /// Rigid shift, vacated samples are `NaN`
    Shift(isize),
    /// Circular shift
    ShiftCircular(isize),
    /// `−x`
    Inverter,
    /// `1/x`, `NaN` where `x = 0`
    Inverser,
    Reverser,
    /// `x − mean(x)`
    Debiaser,
    /// `(x − mean(x)) / std(x)`
    Normalizer,
    Square,
    Sqrt,
    /// `x·[x > 0]`
    Diode,
    Sign,
    Exp,
    Log,
    Cos,
    Sin,
    Tan,
    /// `y[i] = x[i] − x[i−1]`, `y[0] = NaN`
    Differentiator,
    /// `x[i] − x[i−1]`, the first sample repeats the first difference
    BackwardFiniteDiff,
    /// `x[i+1] − x[i]`, the last sample repeats the last difference
    ForwardFiniteDiff,
    /// `(x[i+1] − x[i−1]) / 2`, one-sided at both ends
    CenteredFiniteDiff,
    /// `x[i+1] − 2x[i] + x[i−1]`, `NaN` at both ends
    SecondOrderFiniteDiff,
}

impl UnaryOperator {
    /// Operator from its expression-language name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        use UnaryOperator::*;
        Some(match name.to_ascii_lowercase().as_str() {
            "identity" | "id" => Identity,
            "rectifier" | "abs" => Rectifier,
            "integrator" | "cumsum" => Integrator,
            "inverter" | "neg" => Inverter,
            "inverser" | "inv" => Inverser,
            "reverser" | "reverse" => Reverser,
            "debiaser" | "debias" => Debiaser,
            "normalizer" | "normalize" => Normalizer,
            "square" => Square,
            "sqrt" => Sqrt,
            "diode" => Diode,
            "sign" => Sign,
            "exp" => Exp,
            "log" => Log,
            "cos" => Cos,
            "sin" => Sin,
            "tan" => Tan,
            "d" | "diff" | "differentiator" => Differentiator,
            "backward_diff" => BackwardFiniteDiff,
            "forward_diff" => ForwardFiniteDiff,
            "centered_diff" => CenteredFiniteDiff,
            "second_diff" => SecondOrderFiniteDiff,
            _ => return None,
        })
    }

    pub fn apply(&self, x: &[f64]) -> Vec<f64> {
        use UnaryOperator::*;
        let n = x.len();
        match *self {
            Identity => x.to_vec(),
            Rectifier => map(x, f64::abs),
            Integrator => {
                let mut acc = 0.0;
                x.iter()
                    .map(|&v| {
                        if v.is_nan() {
                            f64::NAN
                        } else {
                            acc += v;
                            acc
                        }
                    })
                    .collect()
            }
            Shift(k) => (0..n as isize)
                .map(|i| {
                    let j = i - k;
                    if j >= 0 && j < n as isize {
                        x[j as usize]
                    } else {
                        f64::NAN
                    }
                })
                .collect(),
            ShiftCircular(k) => {
                if n == 0 {
                    return Vec::new();
                }
                (0..n as isize)
                    .map(|i| x[(i - k).rem_euclid(n as isize) as usize])
                    .collect()
            }
            Inverter => map(x, |v| -v),
            Inverser => map(x, |v| if v == 0.0 { f64::NAN } else { 1.0 / v }),
            Reverser => x.iter().rev().copied().collect(),
            Debiaser => {
                let m = nan_mean(x);
                map(x, |v| v - m)
            }
            Normalizer => {
                let (m, s) = (nan_mean(x), nan_std(x));
                map(x, |v| if s == 0.0 { f64::NAN } else { (v - m) / s })
            }
            Square => map(x, |v| v * v),
            Sqrt => map(x, f64::sqrt),
            Diode => map(x, |v| if v > 0.0 { v } else { 0.0 }),
            Sign => map(x, |v| {
                if v.is_nan() {
                    f64::NAN
                } else if v > 0.0 {
                    1.0
                } else if v < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }),
            Exp => map(x, f64::exp),
            Log => map(x, f64::ln),
            Cos => map(x, f64::cos),
            Sin => map(x, f64::sin),
            Tan => map(x, f64::tan),
            Differentiator => (0..n)
                .map(|i| if i == 0 { f64::NAN } else { x[i] - x[i - 1] })
                .collect(),
            BackwardFiniteDiff => (0..n)
                .map(|i| match (i, n) {
                    (_, 1) => f64::NAN,
                    (0, _) => x[1] - x[0],
                    _ => x[i] - x[i - 1],
                })
                .collect(),
            ForwardFiniteDiff => (0..n)
                .map(|i| match n {
                    1 => f64::NAN,
                    _ if i == n - 1 => x[n - 1] - x[n - 2],
                    _ => x[i + 1] - x[i],
                })
                .collect(),
            CenteredFiniteDiff => (0..n)
                .map(|i| match n {
                    1 => f64::NAN,
                    _ if i == 0 => x[1] - x[0],
                    _ if i == n - 1 => x[n - 1] - x[n - 2],
                    _ => (x[i + 1] - x[i - 1]) / 2.0,
                })
                .collect(),
            SecondOrderFiniteDiff => (0..n)
                .map(|i| {
                    if i == 0 || i + 1 >= n {
                        f64::NAN
                    } else {
                        x[i + 1] - 2.0 * x[i] + x[i - 1]
                    }
                })
                .collect(),
        }
    }
}

fn map(x: &[f64], f: impl Fn(f64) -> f64) -> Vec<f64> {
    x.iter().map(|&v| f(v)).collect()
}

#[cfg(test)]
mod unary_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_differentiate_then_integrate() {
        let a = vec![3.0, 5.0, 4.0, 10.0, 7.5];
        let d = UnaryOperator::Differentiator.apply(&a);
        let back = UnaryOperator::Integrator.apply(&d);
        assert!(back[0].is_nan());
        for i in 1..a.len() {
            assert_relative_eq!(back[i], a[i] - a[0]);
        }
    }

    #[test]
    fn test_shifts() {
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let r = UnaryOperator::Shift(1).apply(&x);
        assert!(r[0].is_nan());
        assert_eq!(&r[1..], &[1.0, 2.0, 3.0]);
        let l = UnaryOperator::Shift(-2).apply(&x);
        assert_eq!(&l[..2], &[3.0, 4.0]);
        assert!(l[3].is_nan());
        assert_eq!(
            UnaryOperator::ShiftCircular(1).apply(&x),
            vec![4.0, 1.0, 2.0, 3.0]
        );
        assert_eq!(
            UnaryOperator::ShiftCircular(-5).apply(&x),
            vec![2.0, 3.0, 4.0, 1.0]
        );
    }

    #[test]
    fn test_pointwise() {
        let x = vec![-2.0, 0.0, 4.0];
        assert_eq!(UnaryOperator::Rectifier.apply(&x), vec![2.0, 0.0, 4.0]);
        assert_eq!(UnaryOperator::Diode.apply(&x), vec![0.0, 0.0, 4.0]);
        assert_eq!(UnaryOperator::Sign.apply(&x), vec![-1.0, 0.0, 1.0]);
        let inv = UnaryOperator::Inverser.apply(&x);
        assert_eq!(inv[0], -0.5);
        assert!(inv[1].is_nan());
        assert_eq!(UnaryOperator::Reverser.apply(&x), vec![4.0, 0.0, -2.0]);
        let d = UnaryOperator::Debiaser.apply(&x);
        assert_relative_eq!(d.iter().sum::<f64>(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_finite_differences() {
        let x = vec![0.0, 1.0, 4.0, 9.0];
        assert_eq!(UnaryOperator::BackwardFiniteDiff.apply(&x), vec![1.0, 1.0, 3.0, 5.0]);
        assert_eq!(UnaryOperator::ForwardFiniteDiff.apply(&x), vec![1.0, 3.0, 5.0, 5.0]);
        assert_eq!(UnaryOperator::CenteredFiniteDiff.apply(&x), vec![1.0, 2.0, 4.0, 5.0]);
        let s = UnaryOperator::SecondOrderFiniteDiff.apply(&x);
        assert!(s[0].is_nan() && s[3].is_nan());
        assert_eq!(&s[1..3], &[2.0, 2.0]);
    }

    #[test]
    fn test_names() {
        assert_eq!(UnaryOperator::from_name("ABS"), Some(UnaryOperator::Rectifier));
        assert_eq!(UnaryOperator::from_name("D"), Some(UnaryOperator::Differentiator));
        assert_eq!(UnaryOperator::from_name("nope"), None);
    }
}
