//! Polyline simplification.
//!
//! Each algorithm returns the sorted indices of the kept vertices, always including
//! the first and the last one, so that callers can keep the matching observations
//! with their timestamps and AF values.
use serde::{Deserialize, Serialize};

use crate::geometry::{proj_point_on_segment, triangle_area, Pt};
use crate::track::Track;
use crate::track_errors::TrackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimplifyMode {
    /// Drop vertices closer than the tolerance to the chord (distance)
    DouglasPeucker,
    /// Drop vertices spanning an effective triangle smaller than the tolerance (area)
    Visvalingam,
    /// Keep one vertex every `tolerance` samples
    Decimation,
}

/// Douglas-Peucker, iterative with an explicit stack.
pub fn douglas_peucker(points: &[Pt], tolerance: f64) -> Vec<usize> {
    let n = points.len();
    if n < 3 {
        return (0..n).collect();
    }
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;
    let mut stack = vec![(0, n - 1)];
    while let Some((first, last)) = stack.pop() {
        let (mut dmax, mut imax) = (0.0, first);
        for i in first + 1..last {
            let d = proj_point_on_segment(&points[i], &points[first], &points[last]).distance;
            if d > dmax {
                dmax = d;
                imax = i;
            }
        }
        if dmax > tolerance {
            keep[imax] = true;
            stack.push((first, imax));
            stack.push((imax, last));
        }
    }
    (0..n).filter(|&i| keep[i]).collect()
}

/// Visvalingam-Whyatt: repeatedly remove the vertex of smallest effective area
/// while that area is below `tolerance`.
pub fn visvalingam(points: &[Pt], tolerance: f64) -> Vec<usize> {
    let mut kept: Vec<usize> = (0..points.len()).collect();
    loop {
        if kept.len() < 3 {
            break;
        }
        let smallest = (1..kept.len() - 1)
            .map(|k| {
                let area = triangle_area(&points[kept[k - 1]], &points[kept[k]], &points[kept[k + 1]]).abs();
                (k, area)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));
        match smallest {
            Some((k, area)) if area < tolerance => {
                kept.remove(k);
            }
            _ => break,
        }
    }
    kept
}

/// Keep every `step`-th vertex and the last one.
pub fn decimation(n: usize, step: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let step = step.max(1);
    let mut kept: Vec<usize> = (0..n).step_by(step).collect();
    if kept.last() != Some(&(n - 1)) {
        kept.push(n - 1);
    }
    kept
}

impl Track {
    pub(crate) fn planar_points(&self) -> Vec<Pt> {
        self.iter()
            .map(|o| Pt::new(o.position.x(), o.position.y()))
            .collect()
    }

    /// Simplify the track geometry in place.
    ///
    /// Return
    /// ------
    /// * the number of removed observations
    pub fn simplify(&mut self, tolerance: f64, mode: SimplifyMode) -> Result<usize, TrackError> {
        if tolerance < 0.0 {
            return Err(TrackError::ConfigError(format!(
                "negative simplification tolerance {tolerance}"
            )));
        }
        let points = self.planar_points();
        let kept = match mode {
            SimplifyMode::DouglasPeucker => douglas_peucker(&points, tolerance),
            SimplifyMode::Visvalingam => visvalingam(&points, tolerance),
            SimplifyMode::Decimation => decimation(points.len(), tolerance.round() as usize),
        };
        let before = self.size();
        let obs = self.observations();
        let simplified = kept.iter().map(|&i| obs[i].clone()).collect();
        *self.observations_mut() = simplified;
        Ok(before - self.size())
    }
}
