//! # Resampling and interpolation
//!
//! A track is resampled along a **parameter**: its curvilinear abscissa
//! ([`ResampleMode::Spatial`]) or its absolute time ([`ResampleMode::Temporal`]).
//! Target parameters come from a [`ResampleTarget`]; those outside the parameter range
//! of the track are skipped.
//!
//! | Algorithm                          | Positions                                   |
//! |------------------------------------|---------------------------------------------|
//! | [`ResampleAlgo::Linear`]           | [`linear`] blend of the bracketing samples  |
//! | [`ResampleAlgo::ThinSplines`]      | [`thin_spline`] `r² log r` basis + affine   |
//! | [`ResampleAlgo::BSplines`]         | [`bspline`] uniform basis, least squares    |
//! | [`ResampleAlgo::GaussianProcess`]  | [`gaussian_process`] posterior mean         |
//!
//! Timestamps (spatial mode) and numeric AFs are always interpolated linearly along the
//! parameter; text AFs take the value of the closest bracketing sample. Smoothing
//! parameters are read from the thread's [`crate::settings::Settings`].
//!
//! [`synchronize`] brings two tracks onto a common timestamp sequence.
pub mod bspline;
pub mod gaussian_process;
pub mod linear;
pub mod thin_spline;

use log::debug;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::SIGMA_GP_FEATURE;
use crate::coords::{Coord, Srid};
use crate::interpolation::gaussian_process::GpParams;
use crate::interpolation::linear::{brackets, interpolate, Bracket};
use crate::settings::settings;
use crate::time::GPSTime;
use crate::track::{FeatureValue, Observation, Track};
use crate::track_errors::TrackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResampleMode {
    Spatial = 1,
    Temporal = 2,
}

impl FromStr for ResampleMode {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spatial" | "1" => Ok(ResampleMode::Spatial),
            "temporal" | "2" => Ok(ResampleMode::Temporal),
            _ => Err(TrackError::ParseError(format!("unknown resampling mode {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResampleAlgo {
    Linear = 1,
    ThinSplines = 2,
    BSplines = 3,
    GaussianProcess = 4,
}

impl FromStr for ResampleAlgo {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" | "1" => Ok(ResampleAlgo::Linear),
            "thin" | "thin_splines" | "2" => Ok(ResampleAlgo::ThinSplines),
            "bspline" | "b_splines" | "3" => Ok(ResampleAlgo::BSplines),
            "gp" | "gaussian_process" | "4" => Ok(ResampleAlgo::GaussianProcess),
            _ => Err(TrackError::ParseError(format!("unknown resampling algorithm {s:?}"))),
        }
    }
}

/// Where to sample the resampled track.
#[derive(Debug, Clone, PartialEq)]
pub enum ResampleTarget {
    /// Regular step (meters or seconds) from the first sample
    Interval(f64),
    /// Number of regularly spaced samples, both ends included
    Count(usize),
    /// Explicit timestamps (temporal mode)
    Timestamps(Vec<GPSTime>),
    /// Explicit parameter values (abscissae or absolute seconds)
    Parameters(Vec<f64>),
}

impl ResampleTarget {
    /// Target reproducing the samples of `reference` in `mode`.
    pub fn like(reference: &Track, mode: ResampleMode) -> Result<Self, TrackError> {
        Ok(match mode {
            ResampleMode::Spatial => ResampleTarget::Parameters(reference.abs_curv_column()?),
            ResampleMode::Temporal => ResampleTarget::Timestamps(reference.get_timestamps()),
        })
    }

    /// Sorted target parameters within `[first, last]`.
    fn parameters(&self, first: f64, last: f64) -> Result<Vec<f64>, TrackError> {
        let mut values = match self {
            ResampleTarget::Interval(step) => {
                if *step <= 0.0 || !step.is_finite() {
                    return Err(TrackError::ConfigError(format!("resampling step {step}")));
                }
                let k_max = ((last - first) / step + 1e-9).floor() as usize;
                (0..=k_max)
                    .map(|k| (first + k as f64 * step).min(last))
                    .collect()
            }
            ResampleTarget::Count(0) => {
                return Err(TrackError::ConfigError("resampling to 0 samples".into()))
            }
            ResampleTarget::Count(1) => vec![first],
            ResampleTarget::Count(n) => {
                let step = (last - first) / (*n - 1) as f64;
                (0..*n)
                    .map(|k| if k + 1 == *n { last } else { first + k as f64 * step })
                    .collect()
            }
            ResampleTarget::Timestamps(ts) => ts.iter().map(GPSTime::to_abs_time).collect(),
            ResampleTarget::Parameters(p) => p.clone(),
        };
        values.retain(|p| *p >= first && *p <= last);
        values.sort_by(|a, b| a.total_cmp(b));
        Ok(values)
    }
}

/// Samples with a strictly increasing parameter (first of each run of duplicates).
fn strictly_increasing(params: &[f64]) -> Vec<usize> {
    let mut kept: Vec<usize> = Vec::with_capacity(params.len());
    for (i, p) in params.iter().enumerate() {
        match kept.last() {
            Some(&j) if params[j] >= *p => {}
            _ => kept.push(i),
        }
    }
    kept
}

fn feature_at(column: &[FeatureValue], b: &Bracket) -> FeatureValue {
    let right = (b.left + 1).min(column.len() - 1);
    match (&column[b.left], &column[right]) {
        (FeatureValue::Num(_), FeatureValue::Num(_)) => {
            let values: Vec<f64> = [b.left, right].iter().map(|&i| column[i].as_f64()).collect();
            FeatureValue::Num(Bracket { left: 0, weight: b.weight }.blend(&values))
        }
        (l, r) => {
            if b.weight < 0.5 {
                l.clone()
            } else {
                r.clone()
            }
        }
    }
}

impl Track {
    fn resample_parameter(&self, mode: ResampleMode) -> Result<Vec<f64>, TrackError> {
        match mode {
            ResampleMode::Spatial => self.abs_curv_column(),
            ResampleMode::Temporal => Ok(self.get_t()),
        }
    }

    /// Resampled copy of the track.
    ///
    /// Arguments
    /// ---------
    /// * `target` – target parameters
    /// * `mode` – spatial (abscissa) or temporal parameterization
    /// * `algo` – interpolation algorithm for the positions
    ///
    /// Errors
    /// ------
    /// * [`TrackError::EmptyTrack`] on an empty track,
    /// * [`TrackError::WrongCoordinateSystem`] on mixed coordinates,
    /// * [`TrackError::ConfigError`] / [`TrackError::SingularSystem`] from the algorithms
    pub fn resampled(
        &self,
        target: &ResampleTarget,
        mode: ResampleMode,
        algo: ResampleAlgo,
    ) -> Result<Track, TrackError> {
        if self.is_empty() {
            return Err(TrackError::EmptyTrack);
        }
        if mode == ResampleMode::Temporal && !self.is_sorted() {
            debug!("sorting track {} before temporal resampling", self.tid);
            let mut sorted = self.clone();
            sorted.sort();
            return sorted.resampled(target, mode, algo);
        }
        let srid = self.srid()?;
        let params = self.resample_parameter(mode)?;
        let (first, last) = (params[0], params[params.len() - 1]);
        let targets = target.parameters(first, last)?;
        let bracketed: Vec<Bracket> = brackets(&params, &targets).into_iter().flatten().collect();

        let xyz = [self.get_x(), self.get_y(), self.get_z()];
        let positions: Vec<Vec<f64>> = match algo {
            ResampleAlgo::Linear => xyz.iter().map(|c| interpolate(c, &bracketed)).collect(),
            _ => {
                let kept = strictly_increasing(&params);
                let p: Vec<f64> = kept.iter().map(|&i| params[i]).collect();
                let columns: Vec<Vec<f64>> = xyz
                    .iter()
                    .map(|c| kept.iter().map(|&i| c[i]).collect())
                    .collect();
                let s = settings();
                match algo {
                    ResampleAlgo::ThinSplines => {
                        thin_spline::fit_eval(&p, &columns, &targets, s.spline_penalization)?
                    }
                    ResampleAlgo::BSplines => {
                        bspline::fit_eval(&p, &columns, &targets, s.bspline_degree, s.bspline_knots)?
                    }
                    _ => {
                        let gp = GpParams {
                            kernel: s.gp_kernel,
                            factor: s.gp_factor,
                            noise: s.gp_noise,
                        };
                        let out = gaussian_process::fit_eval(&p, &columns, &targets, &gp)?;
                        if s.gp_sigma_output {
                            return self.assemble(srid, mode, &targets, &bracketed, &out.means, Some(out.sigma));
                        }
                        out.means
                    }
                }
            }
        };
        self.assemble(srid, mode, &targets, &bracketed, &positions, None)
    }

    fn assemble(
        &self,
        srid: Srid,
        mode: ResampleMode,
        targets: &[f64],
        bracketed: &[Bracket],
        positions: &[Vec<f64>],
        sigma: Option<Vec<f64>>,
    ) -> Result<Track, TrackError> {
        let times = match mode {
            ResampleMode::Temporal => targets.to_vec(),
            ResampleMode::Spatial => interpolate(&self.get_t(), bracketed),
        };
        let columns: Vec<Vec<FeatureValue>> = self
            .feature_names()
            .iter()
            .map(|n| self.get_feature_values(n))
            .collect::<Result<_, _>>()?;
        let observations = bracketed
            .iter()
            .enumerate()
            .map(|(k, b)| {
                let mut obs = Observation::new(
                    Coord::from_components(srid, positions[0][k], positions[1][k], positions[2][k]),
                    GPSTime::read_unix_time(times[k]),
                );
                obs.features = columns.iter().map(|c| feature_at(c, b)).collect();
                obs
            })
            .collect();
        let mut out = self.with_observations_of(observations);
        if let Some(sigma) = sigma {
            out.set_analytical_feature(SIGMA_GP_FEATURE, sigma)?;
        }
        debug!(
            "resampled track {} from {} to {} observations ({mode:?})",
            self.tid,
            self.size(),
            out.size()
        );
        Ok(out)
    }

    /// Resample in place, see [`Track::resampled`].
    pub fn resample(
        &mut self,
        target: &ResampleTarget,
        mode: ResampleMode,
        algo: ResampleAlgo,
    ) -> Result<(), TrackError> {
        *self = self.resampled(target, mode, algo)?;
        Ok(())
    }

    /// Resample to `n` observations regularly spaced along the track.
    pub fn resample_to_count(&mut self, n: usize) -> Result<(), TrackError> {
        self.resample(&ResampleTarget::Count(n), ResampleMode::Spatial, ResampleAlgo::Linear)
    }

    /// Resample at the timestamps of `other` (linear, temporal).
    pub fn resample_on(&mut self, other: &Track) -> Result<(), TrackError> {
        self.resample(
            &ResampleTarget::like(other, ResampleMode::Temporal)?,
            ResampleMode::Temporal,
            ResampleAlgo::Linear,
        )
    }
}

/// Resample both tracks on the union of their timestamps within their common time
/// range.
///
/// Afterwards both tracks share the same timestamps; a second call changes nothing.
///
/// Errors
/// ------
/// * [`TrackError::ConfigError`] when the time ranges do not overlap
pub fn synchronize(t1: &mut Track, t2: &mut Track) -> Result<(), TrackError> {
    t1.sort();
    t2.sort();
    let (a, b) = (t1.get_t(), t2.get_t());
    let (Some(&a0), Some(&an), Some(&b0), Some(&bn)) = (a.first(), a.last(), b.first(), b.last())
    else {
        return Err(TrackError::EmptyTrack);
    };
    let (start, end) = (a0.max(b0), an.min(bn));
    if start > end {
        return Err(TrackError::ConfigError(format!(
            "tracks {} and {} do not overlap in time",
            t1.tid, t2.tid
        )));
    }
    let mut union: Vec<f64> = a
        .into_iter()
        .chain(b)
        .filter(|t| *t >= start && *t <= end)
        .collect();
    union.sort_by(|x, y| x.total_cmp(y));
    union.dedup();
    let target = ResampleTarget::Parameters(union);
    t1.resample(&target, ResampleMode::Temporal, ResampleAlgo::Linear)?;
    t2.resample(&target, ResampleMode::Temporal, ResampleAlgo::Linear)?;
    Ok(())
}
