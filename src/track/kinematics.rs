//! Kinematic AFs: curvilinear abscissa, speed, heading and acceleration.
//!
//! Derivatives are estimated on the sampled sequence with centered differences on
//! interior samples and one-sided differences at both ends. A zero time step yields
//! `NaN`.
use crate::constants::{ABS_CURV, ACCELERATION, HEADING, SPEED};
use crate::track::Track;
use crate::track_errors::TrackError;

/// Centered derivative of `y` with respect to `t`.
pub(crate) fn centered_derivative(y: &[f64], t: &[f64]) -> Vec<f64> {
    let n = y.len();
    let ratio = |i: usize, j: usize| {
        let dt = t[j] - t[i];
        if dt == 0.0 {
            f64::NAN
        } else {
            (y[j] - y[i]) / dt
        }
    };
    match n {
        0 => Vec::new(),
        1 => vec![f64::NAN],
        _ => (0..n)
            .map(|i| {
                if i == 0 {
                    ratio(0, 1)
                } else if i == n - 1 {
                    ratio(n - 2, n - 1)
                } else {
                    ratio(i - 1, i + 1)
                }
            })
            .collect(),
    }
}

impl Track {
    fn cumulative_length(&self) -> Result<Vec<f64>, TrackError> {
        let obs = self.observations();
        let mut s = Vec::with_capacity(obs.len());
        let mut acc = 0.0;
        for (i, o) in obs.iter().enumerate() {
            if i > 0 {
                acc += obs[i - 1].position.distance_to(&o.position)?;
            }
            s.push(acc);
        }
        Ok(s)
    }

    /// Cumulative along-track distance, stored in AF `abs_curv`.
    ///
    /// Return
    /// ------
    /// * the abscissa column, non-decreasing, starting at 0
    pub fn compute_abs_curv(&mut self) -> Result<Vec<f64>, TrackError> {
        let s = self.cumulative_length()?;
        self.set_analytical_feature(ABS_CURV, s.clone())?;
        Ok(s)
    }

    /// Curvilinear abscissa, from the `abs_curv` AF when present.
    pub(crate) fn abs_curv_column(&self) -> Result<Vec<f64>, TrackError> {
        if self.has_analytical_feature(ABS_CURV) {
            return self.get_analytical_feature(ABS_CURV);
        }
        self.cumulative_length()
    }

    /// Speed in m/s estimated by `(s[i+1] − s[i−1]) / (t[i+1] − t[i−1])`, stored in
    /// AF `speed`.
    pub fn compute_speed(&mut self) -> Result<Vec<f64>, TrackError> {
        let s = self.abs_curv_column()?;
        let t = self.get_t();
        let v = centered_derivative(&s, &t);
        self.set_analytical_feature(SPEED, v.clone())?;
        Ok(v)
    }

    /// Azimuth (radians, clockwise from north) of the segment leaving each
    /// observation; the last observation repeats the heading of the last segment.
    pub fn compute_heading(&mut self) -> Result<Vec<f64>, TrackError> {
        let obs = self.observations();
        let n = obs.len();
        let mut h = Vec::with_capacity(n);
        for i in 0..n {
            if n < 2 {
                h.push(f64::NAN);
                continue;
            }
            let a = i.min(n - 2);
            h.push(obs[a].position.azimuth_to(&obs[a + 1].position)?);
        }
        self.set_analytical_feature(HEADING, h.clone())?;
        Ok(h)
    }

    /// Centered derivative of `speed` (computed if missing), stored in AF
    /// `acceleration`.
    pub fn compute_acceleration(&mut self) -> Result<Vec<f64>, TrackError> {
        let v = if self.has_analytical_feature(SPEED) {
            self.get_analytical_feature(SPEED)?
        } else {
            self.compute_speed()?
        };
        let a = centered_derivative(&v, &self.get_t());
        self.set_analytical_feature(ACCELERATION, a.clone())?;
        Ok(a)
    }
}

#[cfg(test)]
mod kinematics_test {
    use super::*;
    use crate::track::enu_track;
    use approx::assert_relative_eq;

    #[test]
    fn test_speed_on_s_shaped_track() {
        let mut t = enu_track(&[(0., 0., 0.), (1., 0., 0.), (1., 1., 0.), (2., 1., 0.)], 1.0);
        let s = t.compute_abs_curv().unwrap();
        assert_eq!(s, vec![0., 1., 2., 3.]);
        let v = t.compute_speed().unwrap();
        assert_relative_eq!(v[1], 1.0);
        assert!(v.iter().all(|x| *x >= 0.0));
    }

    #[test]
    fn test_abs_curv_monotone() {
        let mut t = enu_track(
            &[(0., 0., 0.), (3., 4., 0.), (3., 4., 0.), (0., 0., 0.), (0., 0., 2.)],
            2.0,
        );
        let s = t.compute_abs_curv().unwrap();
        assert!(s.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(s[4], 12.0);
        assert_eq!(t.abs_curv_column().unwrap(), s);
    }

    #[test]
    fn test_zero_time_step_is_nan() {
        let mut t = enu_track(&[(0., 0., 0.), (1., 0., 0.)], 0.0);
        let v = t.compute_speed().unwrap();
        assert!(v[0].is_nan() && v[1].is_nan());
    }

    #[test]
    fn test_heading_and_acceleration() {
        let mut t = enu_track(&[(0., 0., 0.), (0., 1., 0.), (1., 1., 0.), (1., 3., 0.)], 1.0);
        let h = t.compute_heading().unwrap();
        assert_relative_eq!(h[0], 0.0);
        assert_relative_eq!(h[1], std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(h[3], 0.0);
        let a = t.compute_acceleration().unwrap();
        assert_eq!(a.len(), 4);
        assert!(t.has_analytical_feature(SPEED));
        assert!(t.has_analytical_feature(ACCELERATION));
    }
}
