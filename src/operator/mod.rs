//! # Operator catalog
//!
//! Operators act on AF columns (`&[f64]`) and are grouped by arity:
//!
//! | Type                 | Signature                         | Examples                               |
//! |----------------------|-----------------------------------|----------------------------------------|
//! | [`UnaryOperator`]    | column → column                   | integrator, shift, normalizer, diff    |
//! | [`BinaryOperator`]   | column × column → column          | `+ - * / ^ %`, derivator, convolution  |
//! | [`UnaryReducer`]     | column → scalar                   | sum, median, argmax, rmse              |
//! | [`BinaryReducer`]    | column × column → scalar          | covariance, L2 diff                    |
//! | [`ScalarOperator`]   | column × scalar → column          | `x + s`, `s / x`, shift by `s`         |
//! | [`filter`] module    | column × kernel → column          | direct and FFT filtering, random       |
//!
//! On a [`Track`], [`Track::operate`] reads the input AFs by name (virtual columns
//! included), evaluates an [`Operation`] and, when an output name is given, stores the
//! result as an AF.
//!
//! ```rust
//! use tracklib::operator::{Operation, UnaryOperator};
//! use tracklib::track::enu_track;
//!
//! let mut t = enu_track(&[(0., 0., 0.), (1., 0., 0.), (3., 0., 0.)], 1.0);
//! let dx = t.operate(Operation::Unary(UnaryOperator::Differentiator, "x"), Some("dx")).unwrap();
//! assert!(dx[0].is_nan());
//! assert_eq!(t.get_analytical_feature("dx").unwrap()[2], 2.0);
//! ```
pub mod binary;
pub mod fft;
pub mod filter;
pub mod reducer;
pub mod scalar;
pub mod unary;

pub use binary::BinaryOperator;
pub use filter::RandomDistribution;
pub use reducer::{BinaryReducer, UnaryReducer};
pub use scalar::ScalarOperator;
pub use unary::UnaryOperator;

use crate::kernel::Kernel;
use crate::track::Track;
use crate::track_errors::TrackError;

/// An operator bound to its input AF names.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation<'a> {
    Unary(UnaryOperator, &'a str),
    Binary(BinaryOperator, &'a str, &'a str),
    Scalar(ScalarOperator, &'a str, f64),
    Filter(&'a str, Kernel),
    FilterFft(&'a str, Kernel),
}

impl Track {
    /// Evaluate `operation` and store the column in AF `output` when given.
    pub fn operate(&mut self, operation: Operation<'_>, output: Option<&str>) -> Result<Vec<f64>, TrackError> {
        let column = match operation {
            Operation::Unary(op, a) => op.apply(&self.get_analytical_feature(a)?),
            Operation::Binary(op, a, b) => {
                op.apply(&self.get_analytical_feature(a)?, &self.get_analytical_feature(b)?)?
            }
            Operation::Scalar(op, a, s) => op.apply(&self.get_analytical_feature(a)?, s),
            Operation::Filter(a, kernel) => filter::filter(&self.get_analytical_feature(a)?, &kernel)?,
            Operation::FilterFft(a, kernel) => {
                filter::filter_fft(&self.get_analytical_feature(a)?, &kernel)?
            }
        };
        if let Some(name) = output {
            self.set_analytical_feature(name, column.clone())?;
        }
        Ok(column)
    }

    pub fn reduce(&self, reducer: UnaryReducer, name: &str) -> Result<f64, TrackError> {
        Ok(reducer.reduce(&self.get_analytical_feature(name)?))
    }

    pub fn reduce_pair(&self, reducer: BinaryReducer, a: &str, b: &str) -> Result<f64, TrackError> {
        reducer.reduce(&self.get_analytical_feature(a)?, &self.get_analytical_feature(b)?)
    }

    /// Apply `f` to every value of AF `input` and store the result in `output`.
    pub fn apply_feature(
        &mut self,
        input: &str,
        output: &str,
        f: impl Fn(f64) -> f64,
    ) -> Result<Vec<f64>, TrackError> {
        let column = filter::apply(&self.get_analytical_feature(input)?, f);
        self.set_analytical_feature(output, column.clone())?;
        Ok(column)
    }

    /// Fill AF `output` with random samples.
    pub fn random_feature(
        &mut self,
        output: &str,
        distribution: RandomDistribution,
        seed: Option<u64>,
    ) -> Result<Vec<f64>, TrackError> {
        let column = filter::random(self.size(), distribution, seed)?;
        self.set_analytical_feature(output, column.clone())?;
        Ok(column)
    }
}

#[cfg(test)]
mod operator_test {
    use super::*;
    use crate::track::enu_track;
    use approx::assert_relative_eq;

    #[test]
    fn test_differentiate_integrate_on_track() {
        let mut t = enu_track(&[(0., 0., 0.), (2., 0., 0.), (3., 0., 0.), (7., 0., 0.)], 1.0);
        t.create_analytical_feature("a", vec![5.0, 1.0, 2.0, 8.0]).unwrap();
        t.operate(Operation::Unary(UnaryOperator::Differentiator, "a"), Some("da"))
            .unwrap();
        let back = t
            .operate(Operation::Unary(UnaryOperator::Integrator, "da"), Some("ia"))
            .unwrap();
        assert!(back[0].is_nan());
        assert_eq!(&back[1..], &[-4.0, -3.0, 3.0]);
        assert_eq!(t.get_analytical_feature("ia").unwrap().len(), t.size());
    }

    #[test]
    fn test_binary_scalar_reduce() {
        let mut t = enu_track(&[(1., 2., 0.), (2., 4., 0.), (3., 6., 0.)], 1.0);
        let r = t
            .operate(Operation::Binary(BinaryOperator::Division, "y", "x"), Some("ratio"))
            .unwrap();
        assert_eq!(r, vec![2.0; 3]);
        let s = t
            .operate(Operation::Scalar(ScalarOperator::Multiply, "x", 10.0), None)
            .unwrap();
        assert_eq!(s, vec![10.0, 20.0, 30.0]);
        assert!(!t.has_analytical_feature("x10"));
        assert_eq!(t.reduce(UnaryReducer::Sum, "y").unwrap(), 12.0);
        assert_relative_eq!(t.reduce_pair(BinaryReducer::Correlation, "x", "y").unwrap(), 1.0, epsilon = 1e-12);
        assert!(t.reduce(UnaryReducer::Sum, "nope").is_err());
    }

    #[test]
    fn test_filter_apply_random() {
        let mut t = enu_track(&[(0., 0., 0.), (3., 0., 0.), (0., 0., 0.), (3., 0., 0.), (0., 0., 0.)], 1.0);
        let f = t
            .operate(Operation::Filter("x", Kernel::uniform(3.0)), Some("xs"))
            .unwrap();
        assert_eq!(f[2], 2.0);
        t.apply_feature("x", "x2", |v| v * v).unwrap();
        assert_eq!(t.get_analytical_feature("x2").unwrap()[1], 9.0);
        let r = t
            .random_feature(
                "noise",
                RandomDistribution::Normal {
                    mean: 0.0,
                    sigma: 1.0,
                },
                Some(1),
            )
            .unwrap();
        assert_eq!(r.len(), 5);
    }
}
