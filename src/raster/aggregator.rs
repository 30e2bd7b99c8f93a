//! Cell aggregators of the summarization step.
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::operator::reducer::UnaryReducer;
use crate::track_errors::TrackError;

/// Function reducing the values accumulated in one raster cell.
///
/// `Count` counts every accumulated value; the others ignore `NaN` values. An empty
/// accumulator (or one holding only `NaN`) has no value, see [`Aggregator::aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregator {
    Sum,
    Min,
    Max,
    Count,
    Avg,
    /// Most frequent value, the smallest one on ties
    Dominant,
    Median,
}

impl Aggregator {
    pub fn name(&self) -> &'static str {
        match self {
            Aggregator::Sum => "sum",
            Aggregator::Min => "min",
            Aggregator::Max => "max",
            Aggregator::Count => "count",
            Aggregator::Avg => "avg",
            Aggregator::Dominant => "dominant",
            Aggregator::Median => "median",
        }
    }

    /// Value of a cell, `None` for a cell without data.
    pub fn aggregate(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        if *self == Aggregator::Count {
            return Some(values.len() as f64);
        }
        let v = match self {
            Aggregator::Sum if values.iter().all(|v| v.is_nan()) => f64::NAN,
            Aggregator::Sum => UnaryReducer::Sum.reduce(values),
            Aggregator::Min => UnaryReducer::Min.reduce(values),
            Aggregator::Max => UnaryReducer::Max.reduce(values),
            Aggregator::Avg => UnaryReducer::Averager.reduce(values),
            Aggregator::Median => UnaryReducer::Median.reduce(values),
            Aggregator::Dominant => dominant(values),
            Aggregator::Count => values.len() as f64,
        };
        (!v.is_nan()).then_some(v)
    }
}

fn dominant(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mut best = (f64::NAN, 0usize);
    let mut k = 0;
    while k < sorted.len() {
        let run = sorted[k..].iter().take_while(|v| **v == sorted[k]).count();
        if run > best.1 {
            best = (sorted[k], run);
        }
        k += run;
    }
    best.0
}

impl FromStr for Aggregator {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(Aggregator::Sum),
            "min" => Ok(Aggregator::Min),
            "max" => Ok(Aggregator::Max),
            "count" => Ok(Aggregator::Count),
            "avg" | "mean" => Ok(Aggregator::Avg),
            "dominant" | "mode" => Ok(Aggregator::Dominant),
            "median" => Ok(Aggregator::Median),
            other => Err(TrackError::UnknownFunction(format!("aggregator {other}"))),
        }
    }
}

#[cfg(test)]
mod aggregator_test {
    use super::*;

    #[test]
    fn test_aggregators() {
        let v = [3.0, 1.0, f64::NAN, 3.0, 2.0];
        assert_eq!(Aggregator::Sum.aggregate(&v), Some(9.0));
        assert_eq!(Aggregator::Min.aggregate(&v), Some(1.0));
        assert_eq!(Aggregator::Max.aggregate(&v), Some(3.0));
        assert_eq!(Aggregator::Count.aggregate(&v), Some(5.0));
        assert_eq!(Aggregator::Avg.aggregate(&v), Some(2.25));
        assert_eq!(Aggregator::Median.aggregate(&v), Some(2.5));
        assert_eq!(Aggregator::Dominant.aggregate(&v), Some(3.0));
        assert_eq!(Aggregator::Dominant.aggregate(&[2.0, 1.0]), Some(1.0));
    }

    #[test]
    fn test_empty_cells_have_no_value() {
        for agg in [Aggregator::Sum, Aggregator::Count, Aggregator::Avg, Aggregator::Dominant] {
            assert_eq!(agg.aggregate(&[]), None);
        }
        assert_eq!(Aggregator::Avg.aggregate(&[f64::NAN]), None);
        assert_eq!(Aggregator::Sum.aggregate(&[f64::NAN]), None);
        assert_eq!(Aggregator::Count.aggregate(&[f64::NAN]), Some(1.0));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("AVG".parse::<Aggregator>().unwrap(), Aggregator::Avg);
        assert!(matches!("foo".parse::<Aggregator>(), Err(TrackError::UnknownFunction(_))));
    }
}
