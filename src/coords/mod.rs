//! # Coordinate kernel
//!
//! A single tagged [`Coord`] covers the three coordinate shapes handled by the engine:
//!
//! * [`Coord::Geo`]: geodetic longitude/latitude in **degrees**, height in meters,
//! * [`Coord::Enu`]: local tangent plane (East, North, Up) in meters relative to a base,
//! * [`Coord::Ecef`]: Earth-centered Earth-fixed cartesian coordinates in meters.
//!
//! Conversions use the WGS84 ellipsoid (see [`crate::constants`]):
//!
//! ```text
//!            to_ecef (closed form)            to_enu(base)
//!   Geo ─────────────────────────▶ ECEF ─────────────────────▶ ENU
//!       ◀─────────────────────────      ◀─────────────────────
//!            to_geo (Bowring)                 to_ecef(base)
//! ```
//!
//! Geo ↔ ENU honours the thread's [`ProjectionMode`]: the exact ECEF rotation (default),
//! an equirectangular *flat* approximation, or a spherical *stereographic* projection.
//!
//! Conventions
//! -----------------
//! * `x()/y()/z()` return `(lon, lat, hgt)`, `(E, N, U)` or `(X, Y, Z)`.
//! * Distances are in meters; azimuth and elevation in radians, the azimuth being
//!   measured clockwise from north (`+N` for ENU, `+lat` for Geo).
//! * Operations between coordinates of different variants fail with
//!   [`TrackError::WrongCoordinateSystem`].
pub mod bbox;
pub mod projection;

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::constants::{Degree, Meter, Radian, DPI, EARTH_RADIUS, WGS84_A, WGS84_B, WGS84_E2, WGS84_EP2};
use crate::settings::{with_settings, ProjectionMode};
use crate::track_errors::TrackError;

pub use bbox::BBox;
pub use projection::ProjSrid;

/// Coordinate variant tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Srid {
    Geo,
    Enu,
    Ecef,
}

impl fmt::Display for Srid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Srid::Geo => write!(f, "GEO"),
            Srid::Enu => write!(f, "ENU"),
            Srid::Ecef => write!(f, "ECEF"),
        }
    }
}

impl FromStr for Srid {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GEO" | "GEOCOORDS" => Ok(Srid::Geo),
            "ENU" | "ENUCOORDS" => Ok(Srid::Enu),
            "ECEF" | "ECEFCOORDS" => Ok(Srid::Ecef),
            other => Err(TrackError::WrongCoordinateSystem(format!(
                "unknown SRID '{other}'"
            ))),
        }
    }
}

/// Any SRID accepted by readers and the CLI: one of the native variants, or a
/// numeric projected system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crs {
    Native(Srid),
    Projected(ProjSrid),
}

impl Crs {
    /// Variant in which coordinates read under this CRS are stored.
    pub fn storage(&self) -> Srid {
        match self {
            Crs::Native(s) => *s,
            Crs::Projected(_) => Srid::Enu,
        }
    }
}

impl FromStr for Crs {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u32>() {
            Ok(code) => Ok(Crs::Projected(ProjSrid::from_code(code)?)),
            Err(_) => Ok(Crs::Native(s.parse()?)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Coord {
    Geo { lon: Degree, lat: Degree, hgt: Meter },
    Enu { e: Meter, n: Meter, u: Meter },
    Ecef { x: Meter, y: Meter, z: Meter },
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coord::Geo { lon, lat, hgt } => {
                write!(f, "[lon={lon:.9}, lat={lat:.9}, h={hgt:.3}]")
            }
            Coord::Enu { e, n, u } => write!(f, "[x={e:.3}, y={n:.3}, z={u:.3}]"),
            Coord::Ecef { x, y, z } => write!(f, "[X={x:.3}, Y={y:.3}, Z={z:.3}]"),
        }
    }
}

impl Coord {
    pub fn geo(lon: Degree, lat: Degree, hgt: Meter) -> Self {
        Coord::Geo { lon, lat, hgt }
    }

    pub fn enu(e: Meter, n: Meter, u: Meter) -> Self {
        Coord::Enu { e, n, u }
    }

    pub fn ecef(x: Meter, y: Meter, z: Meter) -> Self {
        Coord::Ecef { x, y, z }
    }

    /// Build a coordinate of variant `srid` from its three components.
    pub fn from_components(srid: Srid, x: f64, y: f64, z: f64) -> Self {
        match srid {
            Srid::Geo => Coord::geo(x, y, z),
            Srid::Enu => Coord::enu(x, y, z),
            Srid::Ecef => Coord::ecef(x, y, z),
        }
    }

    pub fn srid(&self) -> Srid {
        match self {
            Coord::Geo { .. } => Srid::Geo,
            Coord::Enu { .. } => Srid::Enu,
            Coord::Ecef { .. } => Srid::Ecef,
        }
    }

    pub fn components(&self) -> (f64, f64, f64) {
        match *self {
            Coord::Geo { lon, lat, hgt } => (lon, lat, hgt),
            Coord::Enu { e, n, u } => (e, n, u),
            Coord::Ecef { x, y, z } => (x, y, z),
        }
    }

    pub fn x(&self) -> f64 {
        self.components().0
    }

    pub fn y(&self) -> f64 {
        self.components().1
    }

    pub fn z(&self) -> f64 {
        self.components().2
    }

    pub fn set_x(&mut self, value: f64) {
        let (_, y, z) = self.components();
        *self = Coord::from_components(self.srid(), value, y, z);
    }

    pub fn set_y(&mut self, value: f64) {
        let (x, _, z) = self.components();
        *self = Coord::from_components(self.srid(), x, value, z);
    }

    pub fn set_z(&mut self, value: f64) {
        let (x, y, _) = self.components();
        *self = Coord::from_components(self.srid(), x, y, value);
    }

    fn same_variant(&self, other: &Coord) -> Result<(), TrackError> {
        if self.srid() != other.srid() {
            return Err(TrackError::WrongCoordinateSystem(format!(
                "cannot combine {} and {} coordinates",
                self.srid(),
                other.srid()
            )));
        }
        Ok(())
    }

    /// 3-D distance in meters.
    ///
    /// Geodetic coordinates use the haversine great-circle distance combined with the
    /// height difference.
    pub fn distance_to(&self, other: &Coord) -> Result<Meter, TrackError> {
        self.same_variant(other)?;
        let (x1, y1, z1) = self.components();
        let (x2, y2, z2) = other.components();
        Ok(match self {
            Coord::Geo { .. } => {
                let d = haversine(x1, y1, x2, y2);
                (d * d + (z2 - z1).powi(2)).sqrt()
            }
            _ => ((x2 - x1).powi(2) + (y2 - y1).powi(2) + (z2 - z1).powi(2)).sqrt(),
        })
    }

    /// Planar distance in meters.
    ///
    /// Errors
    /// ------
    /// * [`TrackError::WrongCoordinateSystem`] for ECEF coordinates, which have no
    ///   meaningful 2-D reduction.
    pub fn distance_2d_to(&self, other: &Coord) -> Result<Meter, TrackError> {
        self.same_variant(other)?;
        let (x1, y1, _) = self.components();
        let (x2, y2, _) = other.components();
        match self {
            Coord::Geo { .. } => Ok(haversine(x1, y1, x2, y2)),
            Coord::Enu { .. } => Ok(((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()),
            Coord::Ecef { .. } => Err(TrackError::WrongCoordinateSystem(
                "2-D distance is not defined for ECEF coordinates".into(),
            )),
        }
    }

    /// Azimuth of `other` seen from `self`, clockwise from north, in `[0, 2π)`.
    pub fn azimuth_to(&self, other: &Coord) -> Result<Radian, TrackError> {
        self.same_variant(other)?;
        let az = match self {
            Coord::Enu { .. } => (other.x() - self.x()).atan2(other.y() - self.y()),
            Coord::Geo { .. } => {
                let (l1, p1) = (self.x().to_radians(), self.y().to_radians());
                let (l2, p2) = (other.x().to_radians(), other.y().to_radians());
                let dl = l2 - l1;
                (dl.sin() * p2.cos()).atan2(p1.cos() * p2.sin() - p1.sin() * p2.cos() * dl.cos())
            }
            Coord::Ecef { .. } => {
                let local = other.to_enu_with(self, ProjectionMode::Ecef)?;
                local.x().atan2(local.y())
            }
        };
        Ok(az.rem_euclid(DPI))
    }

    /// Elevation angle of `other` above the local horizontal plane of `self`.
    pub fn elevation_to(&self, other: &Coord) -> Result<Radian, TrackError> {
        self.same_variant(other)?;
        let local = match self {
            Coord::Enu { .. } => Coord::enu(
                other.x() - self.x(),
                other.y() - self.y(),
                other.z() - self.z(),
            ),
            _ => other.to_enu_with(self, ProjectionMode::Ecef)?,
        };
        let (e, n, u) = local.components();
        Ok(u.atan2((e * e + n * n).sqrt()))
    }

    pub fn translate(&mut self, dx: f64, dy: f64, dz: f64) {
        let (x, y, z) = self.components();
        *self = Coord::from_components(self.srid(), x + dx, y + dy, z + dz);
    }

    /// Counter-clockwise planar rotation around the origin.
    pub fn rotate(&mut self, theta: Radian) {
        let (x, y, z) = self.components();
        let (s, c) = theta.sin_cos();
        *self = Coord::from_components(self.srid(), c * x - s * y, s * x + c * y, z);
    }

    /// Planar homothety around the origin.
    pub fn scale(&mut self, h: f64) {
        let (x, y, z) = self.components();
        *self = Coord::from_components(self.srid(), h * x, h * y, z);
    }

    pub fn scale_3d(&mut self, hx: f64, hy: f64, hz: f64) {
        let (x, y, z) = self.components();
        *self = Coord::from_components(self.srid(), hx * x, hy * y, hz * z);
    }

    /// Convert to ECEF. ENU coordinates need their `base`.
    pub fn to_ecef(&self, base: Option<&Coord>) -> Result<Coord, TrackError> {
        match *self {
            Coord::Ecef { .. } => Ok(*self),
            Coord::Geo { lon, lat, hgt } => Ok(geo_to_ecef(lon, lat, hgt)),
            Coord::Enu { .. } => self.to_geo(base)?.to_ecef(None),
        }
    }

    /// Convert to geodetic. ENU coordinates need their `base`.
    pub fn to_geo(&self, base: Option<&Coord>) -> Result<Coord, TrackError> {
        match *self {
            Coord::Geo { .. } => Ok(*self),
            Coord::Ecef { x, y, z } => Ok(ecef_to_geo(x, y, z)),
            Coord::Enu { .. } => {
                let base = base.ok_or_else(|| {
                    TrackError::WrongCoordinateSystem(
                        "ENU to Geo conversion requires a base point".into(),
                    )
                })?;
                let mode = with_settings(|s| s.projection);
                self.enu_to_geo_with(base, mode)
            }
        }
    }

    /// Convert to ENU around `base` with the thread's projection mode.
    pub fn to_enu(&self, base: &Coord) -> Result<Coord, TrackError> {
        let mode = with_settings(|s| s.projection);
        self.to_enu_with(base, mode)
    }

    /// Convert to ENU around `base` (Geo or ECEF) with an explicit projection mode.
    pub fn to_enu_with(&self, base: &Coord, mode: ProjectionMode) -> Result<Coord, TrackError> {
        let base_geo = base_as_geo(base)?;
        match self {
            Coord::Enu { .. } => Ok(*self),
            Coord::Ecef { .. } => {
                if mode == ProjectionMode::Ecef {
                    Ok(ecef_to_enu(self, &base_geo))
                } else {
                    self.to_geo(None)?.to_enu_with(&base_geo, mode)
                }
            }
            Coord::Geo { lon, lat, hgt } => match mode {
                ProjectionMode::Ecef => Ok(ecef_to_enu(&geo_to_ecef(*lon, *lat, *hgt), &base_geo)),
                ProjectionMode::Flat => Ok(geo_to_flat(*lon, *lat, *hgt, &base_geo)),
                ProjectionMode::Stereographic => Ok(geo_to_stereo(*lon, *lat, *hgt, &base_geo)),
            },
        }
    }

    /// Inverse of [`Coord::to_enu_with`].
    pub fn enu_to_geo_with(&self, base: &Coord, mode: ProjectionMode) -> Result<Coord, TrackError> {
        let Coord::Enu { e, n, u } = *self else {
            return self.to_geo(None);
        };
        let base_geo = base_as_geo(base)?;
        Ok(match mode {
            ProjectionMode::Ecef => {
                let Coord::Ecef { x, y, z } = enu_to_ecef(e, n, u, &base_geo) else {
                    unreachable!("enu_to_ecef always yields ECEF")
                };
                ecef_to_geo(x, y, z)
            }
            ProjectionMode::Flat => flat_to_geo(e, n, u, &base_geo),
            ProjectionMode::Stereographic => stereo_to_geo(e, n, u, &base_geo),
        })
    }

    /// Project a geodetic coordinate into a numeric SRID. The result is stored as
    /// an ENU-variant coordinate holding (easting, northing, height).
    pub fn to_proj(&self, srid: ProjSrid) -> Result<Coord, TrackError> {
        let Coord::Geo { lon, lat, hgt } = *self else {
            return Err(TrackError::WrongCoordinateSystem(format!(
                "projection to {srid} requires geodetic coordinates, got {}",
                self.srid()
            )));
        };
        let (e, n) = srid.forward(lon, lat)?;
        Ok(Coord::enu(e, n, hgt))
    }

    /// Inverse of [`Coord::to_proj`].
    pub fn from_proj(&self, srid: ProjSrid) -> Result<Coord, TrackError> {
        let Coord::Enu { e, n, u } = *self else {
            return Err(TrackError::WrongCoordinateSystem(format!(
                "inverse projection from {srid} requires projected coordinates, got {}",
                self.srid()
            )));
        };
        let (lon, lat) = srid.inverse(e, n)?;
        Ok(Coord::geo(lon, lat, u))
    }
}

fn base_as_geo(base: &Coord) -> Result<Coord, TrackError> {
    match base {
        Coord::Geo { .. } => Ok(*base),
        Coord::Ecef { x, y, z } => Ok(ecef_to_geo(*x, *y, *z)),
        Coord::Enu { .. } => Err(TrackError::WrongCoordinateSystem(
            "an ENU base point must be geodetic or ECEF".into(),
        )),
    }
}

/// Great-circle distance between two (lon, lat) pairs in degrees.
pub fn haversine(lon1: Degree, lat1: Degree, lon2: Degree, lat2: Degree) -> Meter {
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let dp = p2 - p1;
    let dl = (lon2 - lon1).to_radians();
    let a = (dp / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (dl / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS * a.sqrt().min(1.0).asin()
}

/// Closed-form geodetic → ECEF.
pub fn geo_to_ecef(lon: Degree, lat: Degree, hgt: Meter) -> Coord {
    let (sl, cl) = lon.to_radians().sin_cos();
    let (sp, cp) = lat.to_radians().sin_cos();
    let n = WGS84_A / (1.0 - WGS84_E2 * sp * sp).sqrt();
    Coord::ecef(
        (n + hgt) * cp * cl,
        (n + hgt) * cp * sl,
        (n * (1.0 - WGS84_E2) + hgt) * sp,
    )
}

/// ECEF → geodetic with Bowring's formula.
///
/// One pass is millimetric; a second pass, seeded with the reduced latitude of the
/// first estimate, brings ENU ↔ Geo round trips below the micrometer.
pub fn ecef_to_geo(x: Meter, y: Meter, z: Meter) -> Coord {
    let p = (x * x + y * y).sqrt();
    let lon = y.atan2(x);
    if p < 1e-9 {
        let lat = if z >= 0.0 { 90.0 } else { -90.0 };
        return Coord::geo(lon.to_degrees(), lat, z.abs() - WGS84_B);
    }
    let mut beta = (z * WGS84_A).atan2(p * WGS84_B);
    let mut lat = 0.0;
    for _ in 0..2 {
        let (sb, cb) = beta.sin_cos();
        lat = (z + WGS84_EP2 * WGS84_B * sb.powi(3)).atan2(p - WGS84_E2 * WGS84_A * cb.powi(3));
        beta = (WGS84_B / WGS84_A * lat.tan()).atan();
    }
    let (sp, cp) = lat.sin_cos();
    let n = WGS84_A / (1.0 - WGS84_E2 * sp * sp).sqrt();
    let hgt = if cp.abs() > 1e-10 {
        p / cp - n
    } else {
        z / sp - n * (1.0 - WGS84_E2)
    };
    Coord::geo(lon.to_degrees(), lat.to_degrees(), hgt)
}

fn ecef_to_enu(point: &Coord, base_geo: &Coord) -> Coord {
    let (x, y, z) = point.components();
    let (x0, y0, z0) = geo_to_ecef(base_geo.x(), base_geo.y(), base_geo.z()).components();
    let (sl, cl) = base_geo.x().to_radians().sin_cos();
    let (sp, cp) = base_geo.y().to_radians().sin_cos();
    let (dx, dy, dz) = (x - x0, y - y0, z - z0);
    Coord::enu(
        -sl * dx + cl * dy,
        -sp * cl * dx - sp * sl * dy + cp * dz,
        cp * cl * dx + cp * sl * dy + sp * dz,
    )
}

fn enu_to_ecef(e: Meter, n: Meter, u: Meter, base_geo: &Coord) -> Coord {
    let (x0, y0, z0) = geo_to_ecef(base_geo.x(), base_geo.y(), base_geo.z()).components();
    let (sl, cl) = base_geo.x().to_radians().sin_cos();
    let (sp, cp) = base_geo.y().to_radians().sin_cos();
    Coord::ecef(
        x0 - sl * e - sp * cl * n + cp * cl * u,
        y0 + cl * e - sp * sl * n + cp * sl * u,
        z0 + cp * n + sp * u,
    )
}

fn geo_to_flat(lon: Degree, lat: Degree, hgt: Meter, base: &Coord) -> Coord {
    let lat0 = base.y().to_radians();
    Coord::enu(
        EARTH_RADIUS * (lon - base.x()).to_radians() * lat0.cos(),
        EARTH_RADIUS * (lat - base.y()).to_radians(),
        hgt - base.z(),
    )
}

fn flat_to_geo(e: Meter, n: Meter, u: Meter, base: &Coord) -> Coord {
    let lat0 = base.y().to_radians();
    Coord::geo(
        base.x() + (e / (EARTH_RADIUS * lat0.cos())).to_degrees(),
        base.y() + (n / EARTH_RADIUS).to_degrees(),
        u + base.z(),
    )
}

fn geo_to_stereo(lon: Degree, lat: Degree, hgt: Meter, base: &Coord) -> Coord {
    let (sp0, cp0) = base.y().to_radians().sin_cos();
    let (sp, cp) = lat.to_radians().sin_cos();
    let (sdl, cdl) = (lon - base.x()).to_radians().sin_cos();
    let k = 2.0 * EARTH_RADIUS / (1.0 + sp0 * sp + cp0 * cp * cdl);
    Coord::enu(k * cp * sdl, k * (cp0 * sp - sp0 * cp * cdl), hgt - base.z())
}

fn stereo_to_geo(e: Meter, n: Meter, u: Meter, base: &Coord) -> Coord {
    let rho = (e * e + n * n).sqrt();
    if rho < 1e-12 {
        return Coord::geo(base.x(), base.y(), u + base.z());
    }
    let (sp0, cp0) = base.y().to_radians().sin_cos();
    let c = 2.0 * (rho / (2.0 * EARTH_RADIUS)).atan();
    let (sc, cc) = c.sin_cos();
    let lat = (cc * sp0 + n * sc * cp0 / rho).asin();
    let dlon = (e * sc).atan2(rho * cp0 * cc - n * sp0 * sc);
    Coord::geo(base.x() + dlon.to_degrees(), lat.to_degrees(), u + base.z())
}

#[cfg(test)]
mod coords_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_srid_parsing() {
        assert_eq!("GeoCoords".parse::<Srid>().unwrap(), Srid::Geo);
        assert_eq!("enu".parse::<Srid>().unwrap(), Srid::Enu);
        assert_eq!("ECEFCoords".parse::<Srid>().unwrap(), Srid::Ecef);
        assert!("WGS".parse::<Srid>().is_err());
        assert_eq!(
            "2154".parse::<Crs>().unwrap(),
            Crs::Projected(ProjSrid::Lambert93)
        );
    }

    #[test]
    fn test_geo_ecef_round_trip() {
        let p = Coord::geo(2.4246, 48.8447, 75.0);
        let ecef = p.to_ecef(None).unwrap();
        let back = ecef.to_geo(None).unwrap();
        assert_abs_diff_eq!(back.x(), p.x(), epsilon = 1e-8);
        assert_abs_diff_eq!(back.y(), p.y(), epsilon = 1e-8);
        assert_abs_diff_eq!(back.z(), p.z(), epsilon = 1e-3);
    }

    #[test]
    fn test_ecef_equator() {
        let ecef = Coord::geo(0.0, 0.0, 0.0).to_ecef(None).unwrap();
        assert_abs_diff_eq!(ecef.x(), WGS84_A, epsilon = 1e-6);
        assert_abs_diff_eq!(ecef.y(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(ecef.z(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_enu_round_trip_all_modes() {
        let base = Coord::geo(2.35, 48.85, 35.0);
        let p = Coord::geo(2.36, 48.86, 60.0);
        for mode in [
            ProjectionMode::Ecef,
            ProjectionMode::Flat,
            ProjectionMode::Stereographic,
        ] {
            let enu = p.to_enu_with(&base, mode).unwrap();
            let back = enu.enu_to_geo_with(&base, mode).unwrap();
            assert_abs_diff_eq!(back.x(), p.x(), epsilon = 1e-8);
            assert_abs_diff_eq!(back.y(), p.y(), epsilon = 1e-8);
            assert_abs_diff_eq!(back.z(), p.z(), epsilon = 1e-3);
        }
    }

    #[test]
    fn test_enu_to_geo_requires_base() {
        let p = Coord::enu(10.0, 10.0, 0.0);
        assert!(matches!(
            p.to_geo(None),
            Err(TrackError::WrongCoordinateSystem(_))
        ));
    }

    #[test]
    fn test_distances() {
        let a = Coord::enu(0.0, 0.0, 0.0);
        let b = Coord::enu(3.0, 4.0, 12.0);
        assert_eq!(a.distance_2d_to(&b).unwrap(), 5.0);
        assert_eq!(a.distance_to(&b).unwrap(), 13.0);

        let e1 = Coord::ecef(0.0, 0.0, 0.0);
        let e2 = Coord::ecef(1.0, 0.0, 0.0);
        assert_eq!(e1.distance_to(&e2).unwrap(), 1.0);
        assert!(e1.distance_2d_to(&e2).is_err());
        assert!(a.distance_to(&e1).is_err());

        // one degree of latitude on the sphere
        let g1 = Coord::geo(0.0, 0.0, 0.0);
        let g2 = Coord::geo(0.0, 1.0, 0.0);
        assert_abs_diff_eq!(
            g1.distance_2d_to(&g2).unwrap(),
            EARTH_RADIUS * 1f64.to_radians(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_azimuth_and_elevation() {
        let o = Coord::enu(0.0, 0.0, 0.0);
        assert_abs_diff_eq!(o.azimuth_to(&Coord::enu(0.0, 1.0, 0.0)).unwrap(), 0.0);
        assert_abs_diff_eq!(
            o.azimuth_to(&Coord::enu(1.0, 0.0, 0.0)).unwrap(),
            std::f64::consts::FRAC_PI_2
        );
        assert_abs_diff_eq!(
            o.azimuth_to(&Coord::enu(-1.0, 0.0, 0.0)).unwrap(),
            3.0 * std::f64::consts::FRAC_PI_2
        );
        assert_abs_diff_eq!(
            o.elevation_to(&Coord::enu(1.0, 0.0, 1.0)).unwrap(),
            std::f64::consts::FRAC_PI_4
        );
        let g = Coord::geo(0.0, 0.0, 0.0);
        assert_abs_diff_eq!(
            g.azimuth_to(&Coord::geo(1.0, 0.0, 0.0)).unwrap(),
            std::f64::consts::FRAC_PI_2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_rigid_transforms() {
        let mut p = Coord::enu(1.0, 0.0, 2.0);
        p.rotate(std::f64::consts::FRAC_PI_2);
        assert_abs_diff_eq!(p.x(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y(), 1.0, epsilon = 1e-12);
        p.scale(2.0);
        assert_abs_diff_eq!(p.y(), 2.0, epsilon = 1e-12);
        assert_eq!(p.z(), 2.0);
        p.translate(1.0, 1.0, 1.0);
        assert_abs_diff_eq!(p.x(), 1.0, epsilon = 1e-12);
        assert_eq!(p.z(), 3.0);
        p.set_z(0.0);
        assert_eq!(p.z(), 0.0);
    }
}
