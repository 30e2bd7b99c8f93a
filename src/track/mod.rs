//! # Tracks
//!
//! A [`Track`] is an ordered sequence of [`Observation`]s plus an **analytical feature
//! (AF) table**: a name → index map whose indices address the `features` vector
//! carried by every observation.
//!
//! ## Overview
//!
//! | Module          | Content                                                        |
//! |-----------------|----------------------------------------------------------------|
//! | [`observation`] | [`Observation`], [`FeatureValue`], [`GnssQuality`]             |
//! | [`features`]    | AF creation/update/removal, virtual columns, [`AfValue`] assign |
//! | [`kinematics`]  | `abs_curv`, `speed`, `heading`, `acceleration`                  |
//! | [`transform`]   | coordinate conversions and rigid/affine transforms              |
//! | [`ops`]         | concatenation, split, decimation, time comparison, profiles     |
//! | [`display`]     | `comfy-table` rendering of a track and its AF statistics        |
//!
//! ## Invariants
//!
//! * every observation carries exactly `feature_names().len()` feature values,
//! * the reserved names `x, y, z, t, timestamp, idx` are never stored,
//! * all observations share one coordinate variant; operations that need it call
//!   [`Track::srid`] which fails with [`TrackError::WrongCoordinateSystem`] on a mix.
//!
//! Cloning a track is a deep copy.
pub mod display;
pub mod features;
pub mod kinematics;
pub mod observation;
pub mod ops;
pub mod transform;

use std::collections::HashMap;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use crate::constants::{Meter, Seconds};
use crate::coords::{bbox::BBox, Coord, Srid};
use crate::settings::with_settings;
use crate::time::GPSTime;
use crate::track_errors::TrackError;

pub use features::AfValue;
pub use observation::{FeatureValue, GnssQuality, Observation};

/// Name → column index of the AF table.
pub type FeatureIndex = HashMap<String, usize, RandomState>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "TrackData")]
pub struct Track {
    pub uid: String,
    pub tid: String,
    /// Base point of ENU coordinates, when known
    pub base: Option<Coord>,
    pub no_data: f64,
    feature_names: Vec<String>,
    #[serde(skip)]
    feature_index: FeatureIndex,
    observations: Vec<Observation>,
}

/// Serialized form of a [`Track`], the name index is rebuilt on load.
#[derive(Deserialize)]
struct TrackData {
    uid: String,
    tid: String,
    base: Option<Coord>,
    no_data: f64,
    feature_names: Vec<String>,
    observations: Vec<Observation>,
}

impl From<TrackData> for Track {
    fn from(data: TrackData) -> Self {
        let mut track = Track {
            uid: data.uid,
            tid: data.tid,
            base: data.base,
            no_data: data.no_data,
            feature_names: data.feature_names,
            feature_index: FeatureIndex::default(),
            observations: data.observations,
        };
        track.reindex();
        track
    }
}

impl Default for Track {
    fn default() -> Self {
        Track::new()
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.uid == other.uid
            && self.tid == other.tid
            && self.feature_names == other.feature_names
            && self.observations == other.observations
    }
}

impl Track {
    pub fn new() -> Self {
        Track {
            uid: String::new(),
            tid: String::new(),
            base: None,
            no_data: with_settings(|s| s.no_data),
            feature_names: Vec::new(),
            feature_index: FeatureIndex::default(),
            observations: Vec::new(),
        }
    }

    /// Build a track from observations without features.
    ///
    /// Any feature values carried by the observations are dropped, since there is no
    /// name to attach them to.
    pub fn from_observations(observations: Vec<Observation>) -> Self {
        let mut track = Track::new();
        track.observations = observations
            .into_iter()
            .map(|mut o| {
                o.features.clear();
                o
            })
            .collect();
        track
    }

    pub fn with_ids(mut self, uid: impl Into<String>, tid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self.tid = tid.into();
        self
    }

    /// Empty track sharing the metadata and AF names of `self`.
    pub(crate) fn empty_like(&self) -> Track {
        Track {
            uid: self.uid.clone(),
            tid: self.tid.clone(),
            base: self.base,
            no_data: self.no_data,
            feature_names: self.feature_names.clone(),
            feature_index: self.feature_index.clone(),
            observations: Vec::new(),
        }
    }

    /// Track with the metadata and AF names of `self` holding `observations`.
    pub(crate) fn with_observations_of(&self, observations: Vec<Observation>) -> Track {
        let mut t = self.empty_like();
        t.observations = observations;
        t
    }

    /// Rebuild the name → index map after deserialization.
    pub fn reindex(&mut self) {
        self.feature_index = self
            .feature_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
    }

    pub fn size(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }

    pub(crate) fn observations_mut(&mut self) -> &mut Vec<Observation> {
        &mut self.observations
    }

    fn check_index(&self, i: usize) -> Result<(), TrackError> {
        if i >= self.size() {
            return Err(TrackError::OutOfRange {
                index: i,
                len: self.size(),
            });
        }
        Ok(())
    }

    pub fn get_obs(&self, i: usize) -> Result<&Observation, TrackError> {
        self.check_index(i)?;
        Ok(&self.observations[i])
    }

    pub fn get_obs_mut(&mut self, i: usize) -> Result<&mut Observation, TrackError> {
        self.check_index(i)?;
        Ok(&mut self.observations[i])
    }

    pub fn first_obs(&self) -> Result<&Observation, TrackError> {
        self.observations.first().ok_or(TrackError::EmptyTrack)
    }

    pub fn last_obs(&self) -> Result<&Observation, TrackError> {
        self.observations.last().ok_or(TrackError::EmptyTrack)
    }

    /// Bring the feature vector of `obs` to the width of the AF table.
    fn fit_features(&self, obs: &mut Observation) {
        obs.features
            .resize(self.feature_names.len(), FeatureValue::default());
    }

    /// Append an observation at the end of the track.
    pub fn add_obs(&mut self, mut obs: Observation) {
        self.fit_features(&mut obs);
        self.observations.push(obs);
    }

    /// Insert an observation at position `i` (`i == size()` appends).
    pub fn insert_obs(&mut self, mut obs: Observation, i: usize) -> Result<(), TrackError> {
        if i > self.size() {
            return Err(TrackError::OutOfRange {
                index: i,
                len: self.size(),
            });
        }
        self.fit_features(&mut obs);
        self.observations.insert(i, obs);
        Ok(())
    }

    /// Insert an observation at its chronological position.
    ///
    /// The track must already be sorted; the position is found by binary search and
    /// an observation sharing a timestamp is inserted after the existing ones.
    ///
    /// Return
    /// ------
    /// * the index of the inserted observation
    pub fn insert_chronological(&mut self, mut obs: Observation) -> usize {
        self.fit_features(&mut obs);
        let i = self
            .observations
            .partition_point(|o| o.timestamp <= obs.timestamp);
        self.observations.insert(i, obs);
        i
    }

    pub fn remove_obs(&mut self, i: usize) -> Result<Observation, TrackError> {
        self.check_index(i)?;
        Ok(self.observations.remove(i))
    }

    /// Remove every observation whose timestamp is listed.
    ///
    /// Return
    /// ------
    /// * the number of removed observations
    pub fn remove_obs_at(&mut self, timestamps: &[GPSTime]) -> usize {
        let before = self.size();
        self.observations
            .retain(|o| !timestamps.iter().any(|t| *t == o.timestamp));
        before - self.size()
    }

    /// Remove the observations at the given (distinct) indices.
    pub fn remove_obs_list(&mut self, indices: &[usize]) -> Result<usize, TrackError> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.size()) {
            return Err(TrackError::OutOfRange {
                index: bad,
                len: self.size(),
            });
        }
        let before = self.size();
        let mut k = 0;
        self.observations.retain(|_| {
            let keep = !indices.contains(&k);
            k += 1;
            keep
        });
        Ok(before - self.size())
    }

    /// Stable chronological sort.
    pub fn sort(&mut self) {
        self.observations.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    }

    pub fn is_sorted(&self) -> bool {
        self.observations
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    }

    /// Observations `[from, to)` as a new track.
    pub fn extract(&self, from: usize, to: usize) -> Result<Track, TrackError> {
        if from > to || to > self.size() {
            return Err(TrackError::OutOfRange {
                index: to,
                len: self.size(),
            });
        }
        Ok(self.with_observations_of(self.observations[from..to].to_vec()))
    }

    /// Common coordinate variant of the observations.
    pub fn srid(&self) -> Result<Srid, TrackError> {
        let first = self.first_obs()?.position.srid();
        if let Some(o) = self.observations.iter().find(|o| o.position.srid() != first) {
            return Err(TrackError::WrongCoordinateSystem(format!(
                "track mixes {first} and {} coordinates",
                o.position.srid()
            )));
        }
        Ok(first)
    }

    pub fn get_x(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.position.x()).collect()
    }

    pub fn get_y(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.position.y()).collect()
    }

    pub fn get_z(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.position.z()).collect()
    }

    /// Absolute times (seconds since 1970-01-01).
    pub fn get_t(&self) -> Vec<Seconds> {
        self.observations
            .iter()
            .map(|o| o.timestamp.to_abs_time())
            .collect()
    }

    pub fn get_timestamps(&self) -> Vec<GPSTime> {
        self.observations.iter().map(|o| o.timestamp).collect()
    }

    pub fn positions(&self) -> Vec<Coord> {
        self.observations.iter().map(|o| o.position).collect()
    }

    /// Sum of the 3-D distances between consecutive observations.
    pub fn length(&self) -> Result<Meter, TrackError> {
        self.observations
            .windows(2)
            .map(|w| w[0].position.distance_to(&w[1].position))
            .sum()
    }

    /// Elapsed time between the first and last observation, in seconds.
    pub fn duration(&self) -> Seconds {
        match (self.observations.first(), self.observations.last()) {
            (Some(a), Some(b)) => b.timestamp - a.timestamp,
            _ => 0.0,
        }
    }

    /// Planar bounding box of the positions.
    pub fn bbox(&self) -> Result<BBox, TrackError> {
        BBox::from_points(self.observations.iter().map(|o| (o.position.x(), o.position.y())))
            .ok_or(TrackError::EmptyTrack)
    }

    /// Median time between consecutive observations, 1 s for tracks shorter than 2.
    pub fn median_sampling_period(&self) -> Seconds {
        let mut dt: Vec<f64> = self
            .observations
            .windows(2)
            .map(|w| w[1].timestamp - w[0].timestamp)
            .collect();
        if dt.is_empty() {
            return 1.0;
        }
        dt.sort_by(|a, b| a.total_cmp(b));
        dt[dt.len() / 2]
    }
}

impl<'a> IntoIterator for &'a Track {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}

/// Build an ENU track from `(e, n, u)` triples sampled every `dt` seconds from
/// 1970-01-01, mostly useful in tests and demos.
pub fn enu_track(points: &[(f64, f64, f64)], dt: Seconds) -> Track {
    let t0 = GPSTime::zero();
    Track::from_observations(
        points
            .iter()
            .enumerate()
            .map(|(i, &(e, n, u))| Observation::new(Coord::enu(e, n, u), t0.add_sec(i as f64 * dt)))
            .collect(),
    )
}
