//! Coordinate conversions and geometric transforms applied to a whole track.
use nalgebra::{Matrix3, Vector3};

use crate::constants::{Meter, Radian};
use crate::coords::{projection::ProjSrid, Coord, Srid};
use crate::track::{Observation, Track};
use crate::track_errors::TrackError;

const IDLE_WINDOW: usize = 5;

fn centroid(obs: &[Observation]) -> Coord {
    let n = obs.len().max(1) as f64;
    let (sx, sy, sz) = obs.iter().fold((0.0, 0.0, 0.0), |(x, y, z), o| {
        let (a, b, c) = o.position.components();
        (x + a, y + b, z + c)
    });
    let srid = obs.first().map_or(Srid::Enu, |o| o.position.srid());
    Coord::from_components(srid, sx / n, sy / n, sz / n)
}

impl Track {
    fn convert_positions<F>(&mut self, f: F) -> Result<(), TrackError>
    where
        F: Fn(&Coord) -> Result<Coord, TrackError>,
    {
        let converted = self
            .observations()
            .iter()
            .map(|o| f(&o.position))
            .collect::<Result<Vec<_>, _>>()?;
        for (o, c) in self.observations_mut().iter_mut().zip(converted) {
            o.position = c;
        }
        Ok(())
    }

    /// Convert every position to ECEF. ENU tracks need their base.
    pub fn to_ecef_coords(&mut self) -> Result<(), TrackError> {
        let base = self.base;
        self.convert_positions(|c| c.to_ecef(base.as_ref()))
    }

    /// Convert every position to geodetic, using `base` (or the track's own base)
    /// for ENU tracks.
    pub fn to_geo_coords(&mut self, base: Option<Coord>) -> Result<(), TrackError> {
        let base = base.or(self.base);
        self.convert_positions(|c| c.to_geo(base.as_ref()))
    }

    /// Convert every position to ENU around `base`, or around the first observation
    /// when `base` is `None`. The base is recorded on the track.
    pub fn to_enu_coords(&mut self, base: Option<Coord>) -> Result<(), TrackError> {
        if self.srid()? == Srid::Enu {
            // re-centering an ENU track goes through geodetic coordinates
            let Some(new_base) = base else {
                return Ok(());
            };
            if self.base == Some(new_base) {
                return Ok(());
            }
            self.to_geo_coords(None)?;
            return self.to_enu_coords(Some(new_base));
        }
        let base = match base {
            Some(b) => b,
            None => self.first_obs()?.position.to_geo(None)?,
        };
        self.convert_positions(|c| c.to_enu(&base))?;
        self.base = Some(base);
        Ok(())
    }

    /// Project a geodetic track into a numeric SRID. Positions become ENU-variant
    /// `(easting, northing, height)` and the ENU base is dropped.
    pub fn to_proj_coords(&mut self, srid: ProjSrid) -> Result<(), TrackError> {
        if self.srid()? != Srid::Geo {
            self.to_geo_coords(None)?;
        }
        self.convert_positions(|c| c.to_proj(srid))?;
        self.base = None;
        Ok(())
    }

    /// Inverse of [`Track::to_proj_coords`].
    pub fn from_proj_coords(&mut self, srid: ProjSrid) -> Result<(), TrackError> {
        self.convert_positions(|c| c.from_proj(srid))
    }

    /// Affine map sending the world rectangle `(p1_world, p2_world)` onto the image
    /// rectangle `(p1_image, p2_image)`, axis by axis.
    pub fn to_image_coords(
        &mut self,
        p1_world: (f64, f64),
        p2_world: (f64, f64),
        p1_image: (f64, f64),
        p2_image: (f64, f64),
    ) -> Result<(), TrackError> {
        let (dxw, dyw) = (p2_world.0 - p1_world.0, p2_world.1 - p1_world.1);
        if dxw == 0.0 || dyw == 0.0 {
            return Err(TrackError::SizeError(
                "degenerate world rectangle for image coordinates".into(),
            ));
        }
        let sx = (p2_image.0 - p1_image.0) / dxw;
        let sy = (p2_image.1 - p1_image.1) / dyw;
        self.convert_positions(|c| {
            Ok(Coord::enu(
                p1_image.0 + (c.x() - p1_world.0) * sx,
                p1_image.1 + (c.y() - p1_world.1) * sy,
                c.z(),
            ))
        })?;
        self.base = None;
        Ok(())
    }

    /// Planar rotation of angle `theta` (counter-clockwise) around the origin.
    pub fn rotate(&mut self, theta: Radian) {
        for o in self.observations_mut() {
            o.position.rotate(theta);
        }
    }

    /// Apply a 3-D linear map to the position components.
    pub fn rotate_3d(&mut self, rotation: &Matrix3<f64>) {
        for o in self.observations_mut() {
            let (x, y, z) = o.position.components();
            let r = rotation * Vector3::new(x, y, z);
            o.position = Coord::from_components(o.position.srid(), r.x, r.y, r.z);
        }
    }

    pub fn scale(&mut self, h: f64) {
        for o in self.observations_mut() {
            o.position.scale(h);
        }
    }

    pub fn scale_3d(&mut self, hx: f64, hy: f64, hz: f64) {
        for o in self.observations_mut() {
            o.position.scale_3d(hx, hy, hz);
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64, dz: f64) {
        for o in self.observations_mut() {
            o.position.translate(dx, dy, dz);
        }
    }

    /// Append the track travelled backwards, so that it ends where it started.
    ///
    /// Time goes on after the last observation with the mirrored sampling intervals.
    pub fn symmetrize(&mut self) {
        let n = self.size();
        if n < 2 {
            return;
        }
        let obs = self.observations().to_vec();
        let mut t = obs[n - 1].timestamp;
        for k in (0..n - 1).rev() {
            t = t.add_sec(obs[k + 1].timestamp - obs[k].timestamp);
            let mut o = obs[k].clone();
            o.timestamp = t;
            self.observations_mut().push(o);
        }
    }

    /// Close the track with a copy of its first position, one median sampling period
    /// after the last observation.
    pub fn loop_track(&mut self) -> Result<(), TrackError> {
        let dt = self.median_sampling_period();
        let mut first = self.first_obs()?.clone();
        first.timestamp = self.last_obs()?.timestamp.add_sec(dt);
        self.observations_mut().push(first);
        Ok(())
    }

    /// Rotate positions and AF values so that observation `i` comes first; the
    /// timestamps stay in place.
    pub fn shift_to(&mut self, i: usize) -> Result<(), TrackError> {
        self.get_obs(i)?;
        let timestamps = self.get_timestamps();
        let obs = self.observations_mut();
        obs.rotate_left(i);
        for (o, t) in obs.iter_mut().zip(timestamps) {
            o.timestamp = t;
        }
        Ok(())
    }

    /// Drop the last observation when the size is even.
    pub fn make_odd(&mut self) {
        if self.size() % 2 == 0 {
            self.observations_mut().pop();
        }
    }

    /// Drop the last observation when the size is odd.
    pub fn make_even(&mut self) {
        if self.size() % 2 == 1 {
            self.observations_mut().pop();
        }
    }

    /// Duplicate removal is not performed; kept for interface compatibility.
    pub fn remove_obs_dup(&mut self) -> usize {
        0
    }

    /// Strip the idle phases at both ends of the track.
    ///
    /// Windows of 5 samples slide from the beginning (resp. the end); the first
    /// window whose centroid lies further than `radius + sigma_3d` from the centroid
    /// of the initial window marks the start (resp. end) of the movement.
    ///
    /// Return
    /// ------
    /// * the number of removed observations
    pub fn remove_idle_ends(&mut self, radius: Meter, sigma_3d: Meter) -> Result<usize, TrackError> {
        let n = self.size();
        if n <= IDLE_WINDOW {
            return Ok(0);
        }
        let threshold = radius + sigma_3d;
        let obs = self.observations();

        let c0 = centroid(&obs[..IDLE_WINDOW]);
        let mut start = 0;
        for k in 1..=n - IDLE_WINDOW {
            if centroid(&obs[k..k + IDLE_WINDOW]).distance_to(&c0)? > threshold {
                start = k;
                break;
            }
        }

        let c1 = centroid(&obs[n - IDLE_WINDOW..]);
        let mut end = n;
        for k in 1..=n - IDLE_WINDOW {
            let hi = n - k;
            if centroid(&obs[hi - IDLE_WINDOW..hi]).distance_to(&c1)? > threshold {
                end = hi;
                break;
            }
        }

        if start >= end {
            return Ok(0);
        }
        let kept = obs[start..end].to_vec();
        *self.observations_mut() = kept;
        Ok(n - self.size())
    }
}

#[cfg(test)]
mod transform_test {
    use super::*;
    use crate::track::enu_track;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn s_track() -> Track {
        enu_track(&[(0., 0., 0.), (1., 0., 0.), (1., 1., 0.), (2., 1., 0.)], 1.0)
    }

    #[test]
    fn test_enu_geo_round_trip() {
        let base = Coord::geo(2.35, 48.85, 35.0);
        let mut t = s_track();
        t.scale(100.0);
        let before = t.positions();
        t.base = Some(base);
        t.to_geo_coords(None).unwrap();
        assert_eq!(t.srid().unwrap(), Srid::Geo);
        t.to_enu_coords(Some(base)).unwrap();
        for (a, b) in before.iter().zip(t.positions()) {
            assert!(a.distance_to(&b).unwrap() < 1e-6);
        }
    }

    #[test]
    fn test_enu_without_base_fails() {
        let mut t = s_track();
        assert!(matches!(
            t.to_geo_coords(None),
            Err(TrackError::WrongCoordinateSystem(_))
        ));
    }

    #[test]
    fn test_rigid_transforms() {
        let mut t = s_track();
        t.rotate(FRAC_PI_2);
        assert_abs_diff_eq!(t.get_obs(1).unwrap().position.y(), 1.0, epsilon = 1e-12);
        t.rotate(-FRAC_PI_2);
        t.translate(1.0, 2.0, 3.0);
        assert_eq!(t.get_obs(0).unwrap().position, Coord::enu(1.0, 2.0, 3.0));
        t.scale_3d(2.0, 1.0, 0.0);
        assert_eq!(t.get_obs(3).unwrap().position, Coord::enu(6.0, 3.0, 0.0));
        t.rotate_3d(&Matrix3::identity());
        assert_eq!(t.get_obs(3).unwrap().position, Coord::enu(6.0, 3.0, 0.0));
    }

    #[test]
    fn test_symmetrize_loop_shift() {
        let mut t = s_track();
        t.symmetrize();
        assert_eq!(t.size(), 7);
        assert_eq!(t.last_obs().unwrap().position, t.first_obs().unwrap().position);
        assert_eq!(t.duration(), 6.0);
        assert!(t.is_sorted());

        let mut t = s_track();
        t.loop_track().unwrap();
        assert_eq!(t.size(), 5);
        assert_eq!(t.duration(), 4.0);

        let mut t = s_track();
        t.shift_to(2).unwrap();
        assert_eq!(t.get_x(), vec![1., 2., 0., 1.]);
        assert_eq!(t.get_t(), vec![0., 1., 2., 3.]);
        assert!(t.shift_to(9).is_err());
    }

    #[test]
    fn test_parity_helpers() {
        let mut t = s_track();
        t.make_even();
        assert_eq!(t.size(), 4);
        t.make_odd();
        assert_eq!(t.size(), 3);
        t.make_odd();
        assert_eq!(t.size(), 3);
        assert_eq!(t.remove_obs_dup(), 0);
    }

    #[test]
    fn test_image_coords() {
        let mut t = s_track();
        t.to_image_coords((0.0, 0.0), (2.0, 1.0), (0.0, 100.0), (200.0, 0.0))
            .unwrap();
        assert_eq!(t.get_obs(3).unwrap().position, Coord::enu(200.0, 0.0, 0.0));
        assert_eq!(t.get_obs(0).unwrap().position, Coord::enu(0.0, 100.0, 0.0));
    }

    #[test]
    fn test_remove_idle_ends() {
        let mut pts = vec![(0.0, 0.0, 0.0); 6];
        pts.extend((1..=20).map(|i| (i as f64 * 10.0, 0.0, 0.0)));
        pts.extend(vec![(200.0, 0.0, 0.0); 6]);
        let mut t = enu_track(&pts, 1.0);
        let removed = t.remove_idle_ends(5.0, 1.0).unwrap();
        assert_eq!(removed, 9);
        assert_eq!(t.size() + removed, pts.len());
        assert_eq!(t.first_obs().unwrap().position.x(), 0.0);
        assert_eq!(t.get_obs(2).unwrap().position.x(), 10.0);
    }

    #[test]
    fn test_proj_round_trip() {
        let mut t = Track::from_observations(vec![Observation::new(
            Coord::geo(2.35, 48.85, 0.0),
            crate::time::GPSTime::zero(),
        )]);
        t.to_proj_coords(ProjSrid::Lambert93).unwrap();
        assert_eq!(t.srid().unwrap(), Srid::Enu);
        t.from_proj_coords(ProjSrid::Lambert93).unwrap();
        assert_abs_diff_eq!(t.get_x()[0], 2.35, epsilon = 1e-8);
    }
}
