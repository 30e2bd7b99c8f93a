use serde::{Deserialize, Serialize};

use crate::operator::unary::UnaryOperator;

/// Column ⊕ scalar operators. The `R*` variants are the reflected forms, with the
/// scalar on the left-hand side (`s − x`, `s / x`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Modulo,
    /// Rigid shift by `s` samples (rounded)
    Shift,
    Above,
    Below,
    RAdd,
    RSubtract,
    RMultiply,
    RDivide,
    RPower,
    RModulo,
    RAbove,
    RBelow,
}

fn div(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        f64::NAN
    } else {
        a / b
    }
}

fn modulo(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        f64::NAN
    } else {
        a.rem_euclid(b)
    }
}

fn indicator(c: bool) -> f64 {
    if c {
        1.0
    } else {
        0.0
    }
}

impl ScalarOperator {
    pub fn apply(&self, x: &[f64], s: f64) -> Vec<f64> {
        use ScalarOperator::*;
        if *self == Shift {
            return UnaryOperator::Shift(s.round() as isize).apply(x);
        }
        x.iter()
            .map(|&v| match self {
                Add | RAdd => v + s,
                Subtract => v - s,
                RSubtract => s - v,
                Multiply | RMultiply => v * s,
                Divide => div(v, s),
                RDivide => div(s, v),
                Power => v.powf(s),
                RPower => s.powf(v),
                Modulo => modulo(v, s),
                RModulo => modulo(s, v),
                Above => indicator(v > s),
                Below => indicator(v < s),
                RAbove => indicator(s > v),
                RBelow => indicator(s < v),
                Shift => v,
            })
            .collect()
    }
}

#[cfg(test)]
mod scalar_test {
    use super::*;

    #[test]
    fn test_direct_and_reflected() {
        let x = vec![1.0, 2.0, 0.0];
        assert_eq!(ScalarOperator::Subtract.apply(&x, 1.0), vec![0.0, 1.0, -1.0]);
        assert_eq!(ScalarOperator::RSubtract.apply(&x, 1.0), vec![0.0, -1.0, 1.0]);
        let r = ScalarOperator::RDivide.apply(&x, 2.0);
        assert_eq!(&r[..2], &[2.0, 1.0]);
        assert!(r[2].is_nan());
        assert_eq!(ScalarOperator::RPower.apply(&x, 2.0), vec![2.0, 4.0, 1.0]);
        assert_eq!(ScalarOperator::Above.apply(&x, 1.0), vec![0.0, 1.0, 0.0]);
        assert_eq!(ScalarOperator::RAbove.apply(&x, 1.0), vec![0.0, 0.0, 1.0]);
        let sh = ScalarOperator::Shift.apply(&x, 1.0);
        assert!(sh[0].is_nan());
        assert_eq!(&sh[1..], &[1.0, 2.0]);
    }
}
