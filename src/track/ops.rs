//! Track-level operators.
//!
//! | Operator      | Method                        | Result                                   |
//! |---------------|-------------------------------|------------------------------------------|
//! | `&a + &b`     | [`Track::concat`]             | observations of `a` then `b`             |
//! | `&a / n`      | [`Track::split`]              | `n` consecutive parts of even size       |
//! | `&a % k`      | [`Track::decimate`]           | every `k`-th observation                 |
//! | `&a - &b`     | [`Track::difference_profile`] | copy of `a` with AF `diff`               |
//! | `&a * &b`     | [`Track::intersections`]      | crossing points of both polylines        |
//!
//! Operators that can fail return a `Result`.
use std::ops::{Add, Div, Mul, Rem, Sub};

use crate::coords::Coord;
use crate::geometry::{distance_to_polyline, segment_intersection};
use crate::time::GPSTime;
use crate::track::{FeatureValue, Observation, Track};
use crate::track_errors::TrackError;

/// Name of the AF written by [`Track::difference_profile`].
pub const DIFF_FEATURE: &str = "diff";

impl Track {
    /// Observations of `self` followed by those of `other`.
    ///
    /// The AF table of `self` is kept; values of `other` are matched by name and set
    /// to `NaN` when `other` lacks the feature.
    ///
    /// Errors
    /// ------
    /// * [`TrackError::WrongCoordinateSystem`] when both tracks use different variants
    pub fn concat(&self, other: &Track) -> Result<Track, TrackError> {
        if !self.is_empty() && !other.is_empty() && self.srid()? != other.srid()? {
            return Err(TrackError::WrongCoordinateSystem(format!(
                "cannot concatenate {} and {} tracks",
                self.srid()?,
                other.srid()?
            )));
        }
        let columns: Vec<Option<usize>> = self
            .feature_names()
            .iter()
            .map(|n| other.feature_index_of(n).ok())
            .collect();
        let mut out = self.clone();
        for o in other.iter() {
            let mut obs = Observation::new(o.position, o.timestamp);
            obs.gnss = o.gnss;
            obs.features = columns
                .iter()
                .map(|k| k.map_or(FeatureValue::default(), |k| o.features[k].clone()))
                .collect();
            out.add_obs(obs);
        }
        Ok(out)
    }

    /// Split into `n` consecutive tracks whose sizes differ by at most one.
    pub fn split(&self, n: usize) -> Result<Vec<Track>, TrackError> {
        if n == 0 || n > self.size() {
            return Err(TrackError::SizeError(format!(
                "cannot split {} observations into {n} parts",
                self.size()
            )));
        }
        let (q, r) = (self.size() / n, self.size() % n);
        let mut parts = Vec::with_capacity(n);
        let mut start = 0;
        for k in 0..n {
            let len = q + usize::from(k < r);
            parts.push(self.extract(start, start + len)?);
            start += len;
        }
        Ok(parts)
    }

    /// Keep observations `0, k, 2k, …`.
    pub fn decimate(&self, k: usize) -> Result<Track, TrackError> {
        if k == 0 {
            return Err(TrackError::SizeError("decimation step 0".to_string()));
        }
        Ok(self.with_observations_of(self.iter().step_by(k).cloned().collect()))
    }

    /// Keep the observations whose mask entry is `true`.
    pub fn decimate_mask(&self, mask: &[bool]) -> Result<Track, TrackError> {
        if mask.len() != self.size() {
            return Err(TrackError::SizeError(format!(
                "mask of {} values for a track of {} observations",
                mask.len(),
                self.size()
            )));
        }
        Ok(self.with_observations_of(
            self.iter()
                .zip(mask)
                .filter(|(_, keep)| **keep)
                .map(|(o, _)| o.clone())
                .collect(),
        ))
    }

    /// Copy without the `n` first observations.
    pub fn drop_first(&self, n: usize) -> Track {
        let n = n.min(self.size());
        self.with_observations_of(self.observations()[n..].to_vec())
    }

    /// Copy without the `n` last observations.
    pub fn drop_last(&self, n: usize) -> Track {
        let end = self.size().saturating_sub(n);
        self.with_observations_of(self.observations()[..end].to_vec())
    }

    /// `true` when `self` starts at or after the end of `other`.
    pub fn is_after(&self, other: &Track) -> Result<bool, TrackError> {
        Ok(self.first_obs()?.timestamp >= other.last_obs()?.timestamp)
    }

    /// `true` when `self` ends at or before the start of `other`.
    pub fn is_before(&self, other: &Track) -> Result<bool, TrackError> {
        Ok(self.last_obs()?.timestamp <= other.first_obs()?.timestamp)
    }

    /// Copy of `self` whose AF `diff` holds the planar distance of every observation
    /// to the polyline of `other`.
    pub fn difference_profile(&self, other: &Track) -> Result<Track, TrackError> {
        if other.is_empty() {
            return Err(TrackError::EmptyTrack);
        }
        let reference = other.planar_points();
        let diff: Vec<f64> = self
            .planar_points()
            .iter()
            .map(|p| distance_to_polyline(p, &reference))
            .collect();
        let mut out = self.clone();
        out.set_analytical_feature(DIFF_FEATURE, diff)?;
        Ok(out)
    }

    /// Crossing points of the polylines of `self` and `other`.
    ///
    /// Positions and timestamps are interpolated along the crossed segment of `self`;
    /// the result has no AF.
    pub fn intersections(&self, other: &Track) -> Result<Track, TrackError> {
        let mut out = Track::new().with_ids(self.uid.clone(), self.tid.clone());
        out.base = self.base;
        if self.size() < 2 || other.size() < 2 {
            return Ok(out);
        }
        let srid = self.srid()?;
        let (a, b) = (self.planar_points(), other.planar_points());
        for (i, sa) in a.windows(2).enumerate() {
            for sb in b.windows(2) {
                let Some((p, t, _)) = segment_intersection(&sa[0], &sa[1], &sb[0], &sb[1]) else {
                    continue;
                };
                let (o1, o2) = (&self.observations()[i], &self.observations()[i + 1]);
                let z = o1.position.z() + t * (o2.position.z() - o1.position.z());
                let at = o1.timestamp.to_abs_time()
                    + t * (o2.timestamp.to_abs_time() - o1.timestamp.to_abs_time());
                out.add_obs(Observation::new(
                    Coord::from_components(srid, p.x, p.y, z),
                    GPSTime::read_unix_time(at),
                ));
            }
        }
        Ok(out)
    }
}

impl Add for &Track {
    type Output = Result<Track, TrackError>;

    fn add(self, other: &Track) -> Self::Output {
        self.concat(other)
    }
}

impl Div<usize> for &Track {
    type Output = Result<Vec<Track>, TrackError>;

    fn div(self, n: usize) -> Self::Output {
        self.split(n)
    }
}

impl Rem<usize> for &Track {
    type Output = Result<Track, TrackError>;

    fn rem(self, k: usize) -> Self::Output {
        self.decimate(k)
    }
}

impl Rem<&[bool]> for &Track {
    type Output = Result<Track, TrackError>;

    fn rem(self, mask: &[bool]) -> Self::Output {
        self.decimate_mask(mask)
    }
}

impl Sub for &Track {
    type Output = Result<Track, TrackError>;

    fn sub(self, other: &Track) -> Self::Output {
        self.difference_profile(other)
    }
}

impl Mul for &Track {
    type Output = Result<Track, TrackError>;

    fn mul(self, other: &Track) -> Self::Output {
        self.intersections(other)
    }
}

#[cfg(test)]
mod ops_test {
    use super::*;
    use crate::track::enu_track;
    use approx::assert_abs_diff_eq;

    fn line(n: usize) -> Track {
        let pts: Vec<_> = (0..n).map(|i| (i as f64, 0.0, 0.0)).collect();
        enu_track(&pts, 1.0)
    }

    #[test]
    fn test_concat_matches_features_by_name() {
        let mut a = line(3);
        a.create_analytical_feature("v", vec![1.0, 2.0, 3.0]).unwrap();
        let mut b = line(2);
        b.create_analytical_feature("w", vec![0.0, 0.0]).unwrap();
        let c = (&a + &b).unwrap();
        assert_eq!(c.size(), 5);
        assert_eq!(c.feature_names(), &["v".to_string()]);
        let v = c.get_analytical_feature("v").unwrap();
        assert_eq!(&v[..3], &[1.0, 2.0, 3.0]);
        assert!(v[3].is_nan() && v[4].is_nan());
    }

    #[test]
    fn test_concat_rejects_mixed_srid() {
        let a = line(2);
        let mut b = line(2);
        b.to_geo_coords(Some(Coord::geo(2.0, 48.0, 0.0))).unwrap();
        assert!(matches!(&a + &b, Err(TrackError::WrongCoordinateSystem(_))));
    }

    #[test]
    fn test_split_and_decimate() {
        let t = line(10);
        let parts = (&t / 3).unwrap();
        let sizes: Vec<usize> = parts.iter().map(Track::size).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        assert_eq!(parts[1].first_obs().unwrap().position.x(), 4.0);
        assert!((&t / 0).is_err());

        let d = (&t % 3).unwrap();
        assert_eq!(d.get_x(), vec![0.0, 3.0, 6.0, 9.0]);
        let mask: Vec<bool> = (0..10).map(|i| i % 2 == 1).collect();
        assert_eq!((&t % mask.as_slice()).unwrap().size(), 5);
        assert!(t.decimate_mask(&[true]).is_err());
    }

    #[test]
    fn test_drop_and_time_comparison() {
        let t = line(6);
        assert_eq!(t.drop_first(2).get_x()[0], 2.0);
        assert_eq!(t.drop_last(2).size(), 4);
        assert!(t.drop_first(10).is_empty());
        let head = t.extract(0, 3).unwrap();
        let tail = t.extract(2, 6).unwrap();
        assert!(tail.is_after(&head).unwrap());
        assert!(head.is_before(&tail).unwrap());
        assert!(!head.is_after(&tail).unwrap());
    }

    #[test]
    fn test_difference_profile() {
        let reference = line(5);
        let shifted = enu_track(&[(0.5, 2.0, 0.0), (1.5, -1.0, 0.0), (10.0, 0.0, 0.0)], 1.0);
        let d = (&shifted - &reference).unwrap();
        assert_eq!(
            d.get_analytical_feature(DIFF_FEATURE).unwrap(),
            vec![2.0, 1.0, 6.0]
        );
    }

    #[test]
    fn test_intersections_interpolate_time() {
        let a = enu_track(&[(0.0, 0.0, 0.0), (10.0, 0.0, 0.0)], 10.0);
        let b = enu_track(&[(4.0, -1.0, 0.0), (4.0, 1.0, 0.0)], 1.0);
        let x = (&a * &b).unwrap();
        assert_eq!(x.size(), 1);
        let o = x.first_obs().unwrap();
        assert_abs_diff_eq!(o.position.x(), 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(o.timestamp.to_abs_time(), 4.0, epsilon = 1e-3);
        assert!((&a * &line(1)).unwrap().is_empty());
    }
}
