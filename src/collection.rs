//! Ordered collection of tracks.
//!
//! A [`TrackCollection`] owns its tracks and exposes the cumulative measures (bbox,
//! length, duration) plus fan-out helpers that apply one operation to every track.
use std::ops::{Index, IndexMut};

use log::debug;

use crate::constants::{Meter, Seconds};
use crate::coords::{bbox::BBox, Coord};
use crate::geometry::{simplification::SimplifyMode, Pt};
use crate::interpolation::{ResampleAlgo, ResampleMode, ResampleTarget};
use crate::operator::Operation;
use crate::spatial_index::{Indexable, SpatialIndex};
use crate::track::Track;
use crate::track_errors::TrackError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackCollection {
    tracks: Vec<Track>,
}

impl TrackCollection {
    pub fn new() -> Self {
        TrackCollection::default()
    }

    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        TrackCollection { tracks }
    }

    pub fn add_track(&mut self, track: Track) {
        self.tracks.push(track);
    }

    pub fn remove_track(&mut self, i: usize) -> Result<Track, TrackError> {
        if i >= self.tracks.len() {
            return Err(TrackError::OutOfRange {
                index: i,
                len: self.tracks.len(),
            });
        }
        Ok(self.tracks.remove(i))
    }

    pub fn size(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, i: usize) -> Result<&Track, TrackError> {
        let len = self.tracks.len();
        self.tracks.get(i).ok_or(TrackError::OutOfRange { index: i, len })
    }

    pub fn get_mut(&mut self, i: usize) -> Result<&mut Track, TrackError> {
        let len = self.tracks.len();
        self.tracks.get_mut(i).ok_or(TrackError::OutOfRange { index: i, len })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Track> {
        self.tracks.iter_mut()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Total number of observations.
    pub fn nb_observations(&self) -> usize {
        self.tracks.iter().map(Track::size).sum()
    }

    /// Union of the bounding boxes of the non-empty tracks.
    ///
    /// Errors
    /// ------
    /// * [`TrackError::EmptyTrack`] when no track holds an observation
    pub fn bbox(&self) -> Result<BBox, TrackError> {
        self.tracks
            .iter()
            .filter(|t| !t.is_empty())
            .map(Track::bbox)
            .try_fold(None::<BBox>, |acc, b| {
                let b = b?;
                Ok::<_, TrackError>(Some(match acc {
                    None => b,
                    Some(a) => a.union(&b),
                }))
            })?
            .ok_or(TrackError::EmptyTrack)
    }

    pub fn length(&self) -> Result<Meter, TrackError> {
        self.tracks.iter().map(Track::length).sum()
    }

    pub fn duration(&self) -> Seconds {
        self.tracks.iter().map(Track::duration).sum()
    }

    /// Grid index of every track segment, see [`SpatialIndex::new`].
    pub fn create_spatial_index(&self, resolution: (f64, f64), margin: f64) -> Result<SpatialIndex, TrackError> {
        SpatialIndex::new(self, resolution, margin)
    }

    /// Keep the tracks satisfying `predicate`, return how many were removed.
    pub fn retain(&mut self, predicate: impl FnMut(&Track) -> bool) -> usize {
        let before = self.tracks.len();
        self.tracks.retain(predicate);
        before - self.tracks.len()
    }

    /// Apply a fallible operation to every track, stopping at the first error.
    pub fn try_for_each<F>(&mut self, mut f: F) -> Result<(), TrackError>
    where
        F: FnMut(&mut Track) -> Result<(), TrackError>,
    {
        for (k, track) in self.tracks.iter_mut().enumerate() {
            f(track).inspect_err(|e| debug!("operation failed on track #{k} ({}): {e}", track.tid))?;
        }
        Ok(())
    }

    pub fn add_analytical_feature<F>(&mut self, name: &str, algo: F) -> Result<(), TrackError>
    where
        F: Fn(&Track, usize) -> f64,
    {
        self.try_for_each(|t| t.add_analytical_feature(name, &algo))
    }

    pub fn compute_abs_curv(&mut self) -> Result<(), TrackError> {
        self.try_for_each(|t| t.compute_abs_curv().map(|_| ()))
    }

    pub fn compute_speed(&mut self) -> Result<(), TrackError> {
        self.try_for_each(|t| t.compute_speed().map(|_| ()))
    }

    pub fn operate(&mut self, operation: Operation<'_>, output: Option<&str>) -> Result<(), TrackError> {
        self.try_for_each(|t| t.operate(operation, output).map(|_| ()))
    }

    /// Evaluate an algebraic expression on every track.
    pub fn eval(&mut self, expr: &str) -> Result<(), TrackError> {
        self.try_for_each(|t| t.eval(expr).map(|_| ()))
    }

    pub fn resample(
        &mut self,
        target: &ResampleTarget,
        mode: ResampleMode,
        algo: ResampleAlgo,
    ) -> Result<(), TrackError> {
        self.try_for_each(|t| t.resample(target, mode, algo))
    }

    pub fn simplify(&mut self, tolerance: f64, mode: SimplifyMode) -> Result<usize, TrackError> {
        let mut removed = 0;
        self.try_for_each(|t| {
            removed += t.simplify(tolerance, mode)?;
            Ok(())
        })?;
        Ok(removed)
    }

    /// Convert every track to ENU around `base`, or around the first observation of the
    /// collection when `base` is `None`, so that all tracks share one frame.
    pub fn to_enu_coords(&mut self, base: Option<Coord>) -> Result<(), TrackError> {
        let base = match base {
            Some(b) => b,
            None => self
                .tracks
                .iter()
                .find(|t| !t.is_empty())
                .ok_or(TrackError::EmptyTrack)?
                .first_obs()?
                .position,
        };
        self.try_for_each(|t| t.to_enu_coords(Some(base)))
    }

    pub fn to_geo_coords(&mut self, base: Option<Coord>) -> Result<(), TrackError> {
        self.try_for_each(|t| t.to_geo_coords(base))
    }
}

impl Indexable for TrackCollection {
    fn polylines(&self) -> Vec<Vec<Pt>> {
        self.tracks.iter().map(Track::planar_points).collect()
    }

    fn extent(&self) -> Result<BBox, TrackError> {
        self.bbox()
    }
}

impl Index<usize> for TrackCollection {
    type Output = Track;

    fn index(&self, i: usize) -> &Track {
        &self.tracks[i]
    }
}

impl IndexMut<usize> for TrackCollection {
    fn index_mut(&mut self, i: usize) -> &mut Track {
        &mut self.tracks[i]
    }
}

impl FromIterator<Track> for TrackCollection {
    fn from_iter<I: IntoIterator<Item = Track>>(iter: I) -> Self {
        TrackCollection {
            tracks: iter.into_iter().collect(),
        }
    }
}

impl Extend<Track> for TrackCollection {
    fn extend<I: IntoIterator<Item = Track>>(&mut self, iter: I) {
        self.tracks.extend(iter)
    }
}

impl IntoIterator for TrackCollection {
    type Item = Track;
    type IntoIter = std::vec::IntoIter<Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.into_iter()
    }
}

impl<'a> IntoIterator for &'a TrackCollection {
    type Item = &'a Track;
    type IntoIter = std::slice::Iter<'a, Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}

#[cfg(test)]
mod collection_test {
    use super::*;
    use crate::spatial_index::SegmentRef;
    use crate::track::enu_track;
    use approx::assert_abs_diff_eq;

    fn collection() -> TrackCollection {
        TrackCollection::from_tracks(vec![
            enu_track(&[(0.0, 0.0, 0.0), (3.0, 4.0, 0.0)], 1.0),
            enu_track(&[(10.0, -2.0, 0.0), (10.0, 8.0, 0.0), (12.0, 8.0, 0.0)], 2.0),
        ])
    }

    #[test]
    fn test_cumulative_measures() {
        let tc = collection();
        assert_eq!(tc.size(), 2);
        assert_eq!(tc.nb_observations(), 5);
        assert_eq!(tc.bbox().unwrap(), BBox::new(0.0, 12.0, -2.0, 8.0));
        assert_abs_diff_eq!(tc.length().unwrap(), 17.0, epsilon = 1e-12);
        assert_eq!(tc.duration(), 5.0);
        assert!(matches!(TrackCollection::new().bbox(), Err(TrackError::EmptyTrack)));
        assert!(tc.get(2).is_err());
    }

    #[test]
    fn test_fan_out() {
        let mut tc = collection();
        tc.compute_abs_curv().unwrap();
        tc.add_analytical_feature("one", |_, _| 1.0).unwrap();
        tc.eval("two = one + one").unwrap();
        for t in &tc {
            assert!(t.get_analytical_feature("two").unwrap().iter().all(|v| *v == 2.0));
        }
        assert_eq!(tc[1].get_analytical_feature("abs_curv").unwrap(), vec![0.0, 10.0, 12.0]);
        assert!(tc.eval("bad = nope + 1").is_err());
    }

    #[test]
    fn test_spatial_index_over_collection() {
        let tc = collection();
        let index = tc.create_spatial_index((1.0, 1.0), 0.05).unwrap();
        assert_eq!(index.request_point(10.2, 3.0), vec![SegmentRef { member: 1, segment: 0 }]);
        assert_eq!(index.request_track(&tc[0]), vec![SegmentRef { member: 0, segment: 0 }]);
    }
}
