//! # Raster summaries of track collections
//!
//! [`summarize`] maps analytical features evaluated on every observation of a
//! [`TrackCollection`] into raster cells:
//!
//! 1. an empty [`Raster`] is laid over the collection bbox (+5 % margin) at the requested
//!    resolution,
//! 2. each observation is located in its cell and the value of every [`Indicator`] is
//!    pushed into the accumulator of the matching band,
//! 3. each band is reduced by its [`Aggregator`], empty cells receiving the no-data
//!    sentinel.
//!
//! Bands are named `<indicator>#<aggregator>`, e.g. `speed#avg`.
use log::{debug, warn};

use crate::collection::TrackCollection;
use crate::raster::{aggregator::Aggregator, Alignment, Raster};
use crate::track::Track;
use crate::track_errors::TrackError;

/// Per-observation value summarized into the raster.
pub enum Indicator<'a> {
    /// Stored or virtual analytical feature, read by name
    Feature(&'a str),
    /// Function `(track, obs_index) → value`
    Algorithm {
        name: &'a str,
        algo: &'a dyn Fn(&Track, usize) -> f64,
    },
}

impl Indicator<'_> {
    pub fn name(&self) -> &str {
        match self {
            Indicator::Feature(n) => n,
            Indicator::Algorithm { name, .. } => name,
        }
    }

    fn values(&self, track: &Track) -> Result<Vec<f64>, TrackError> {
        match self {
            Indicator::Feature(n) => track.get_analytical_feature(n),
            Indicator::Algorithm { algo, .. } => Ok((0..track.size()).map(|i| algo(track, i)).collect()),
        }
    }
}

/// Name of the band produced by an indicator and an aggregator.
pub fn band_name(indicator: &str, aggregator: Aggregator) -> String {
    format!("{indicator}#{}", aggregator.name())
}

/// Summarize `collection` into one raster band per `(indicators[k], aggregators[k])`.
///
/// Arguments
/// ---------
/// * `resolution` – cell size `(dx, dy)`, see [`Raster::new`] for the default
///
/// Errors
/// ------
/// * [`TrackError::SizeError`] when the two lists differ in length,
/// * [`TrackError::EmptyTrack`] when the collection has no observation,
/// * [`TrackError::UnknownFeature`] for an unknown feature indicator
pub fn summarize(
    collection: &TrackCollection,
    indicators: &[Indicator<'_>],
    aggregators: &[Aggregator],
    resolution: Option<(f64, f64)>,
) -> Result<Raster, TrackError> {
    if indicators.len() != aggregators.len() {
        return Err(TrackError::SizeError(format!(
            "{} indicators for {} aggregators",
            indicators.len(),
            aggregators.len()
        )));
    }
    let mut raster = Raster::new(collection.bbox()?, resolution, None, Alignment::LowerLeft)?;
    for (ind, agg) in indicators.iter().zip(aggregators) {
        raster.add_af_map(&band_name(ind.name(), *agg), None)?;
    }

    let mut outside = 0usize;
    for track in collection {
        let columns = indicators
            .iter()
            .map(|ind| ind.values(track))
            .collect::<Result<Vec<_>, _>>()?;
        for (k, obs) in track.iter().enumerate() {
            let Some((i, j)) = raster.get_cell(obs.position.x(), obs.position.y()) else {
                outside += 1;
                continue;
            };
            for (band, column) in raster.bands_mut().iter_mut().zip(&columns) {
                band.accumulate(i, j, column[k])?;
            }
        }
    }
    if outside > 0 {
        warn!("{outside} observations fell outside of the summary raster");
    }
    for (band, agg) in raster.bands_mut().iter_mut().zip(aggregators) {
        band.aggregate(*agg);
    }
    debug!(
        "summarized {} tracks into {} bands of {}×{}",
        collection.size(),
        aggregators.len(),
        raster.nrow(),
        raster.ncol()
    );
    Ok(raster)
}
