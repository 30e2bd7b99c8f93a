//! Numeric SRIDs implemented by closed-form map projections.
//!
//! * `2154`: Lambert-93 (France, conformal conic on GRS80),
//! * `326xx` / `327xx`: UTM zone `xx`, northern / southern hemisphere, with the
//!   Krüger series (see <https://en.wikipedia.org/wiki/Universal_Transverse_Mercator_coordinate_system>).
//!
//! Eastings/northings are in meters, longitudes/latitudes in degrees.
#![allow(non_snake_case)]

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::fmt;

use crate::track_errors::TrackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjSrid {
    Lambert93,
    Utm { zone: u32, north: bool },
}

impl fmt::Display for ProjSrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.code())
    }
}

// Lambert-93 parameters
const L93_N: f64 = 0.725_607_765_0;
const L93_C: f64 = 11_754_255.426;
const L93_XS: f64 = 700_000.0;
const L93_YS: f64 = 12_655_612.050;
const L93_LON0: f64 = 3.0;
const GRS80_E: f64 = 0.081_819_191_042_815_8;

// UTM (Krüger series, meters)
const UTM_K0_A: f64 = 6_364_902.166_165_087;
const UTM_E0: f64 = 500_000.0;
const UTM_N0_SOUTH: f64 = 10_000_000.0;
const UTM_C: f64 = 0.081_819_190_842_621_49;
const ALPHA: [f64; 3] = [8.377_318_188_192_541e-4, 7.608_496_958_699_166e-7, 1.203_487_787_596_664_6e-9];
const BETA: [f64; 3] = [8.377_321_640_821_44e-4, 5.906_110_863_719_917e-8, 1.676_991_179_437_975_4e-10];
const DELTA: [f64; 3] = [3.356_551_448_628_875e-3, 6.571_913_193_172_695e-6, 1.767_745_996_207_56e-8];

impl ProjSrid {
    /// Decode an EPSG code.
    pub fn from_code(code: u32) -> Result<Self, TrackError> {
        match code {
            2154 => Ok(ProjSrid::Lambert93),
            32601..=32660 => Ok(ProjSrid::Utm {
                zone: code - 32600,
                north: true,
            }),
            32701..=32760 => Ok(ProjSrid::Utm {
                zone: code - 32700,
                north: false,
            }),
            _ => Err(TrackError::WrongCoordinateSystem(format!(
                "unsupported SRID {code}"
            ))),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            ProjSrid::Lambert93 => 2154,
            ProjSrid::Utm { zone, north: true } => 32600 + zone,
            ProjSrid::Utm { zone, north: false } => 32700 + zone,
        }
    }

    /// (lon, lat) in degrees → (easting, northing) in meters.
    pub fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TrackError> {
        match self {
            ProjSrid::Lambert93 => Ok(lambert93_forward(lon, lat)),
            ProjSrid::Utm { zone, north } => utm_forward(lon, lat, *zone, *north),
        }
    }

    /// (easting, northing) in meters → (lon, lat) in degrees.
    pub fn inverse(&self, e: f64, n: f64) -> Result<(f64, f64), TrackError> {
        match self {
            ProjSrid::Lambert93 => Ok(lambert93_inverse(e, n)),
            ProjSrid::Utm { zone, north } => Ok(utm_inverse(e, n, *zone, *north)),
        }
    }
}

fn isometric_latitude(phi: f64) -> f64 {
    let es = GRS80_E * phi.sin();
    ((FRAC_PI_4 + phi / 2.0).tan() * ((1.0 - es) / (1.0 + es)).powf(GRS80_E / 2.0)).ln()
}

fn lambert93_forward(lon: f64, lat: f64) -> (f64, f64) {
    let L = isometric_latitude(lat.to_radians());
    let R = L93_C * (-L93_N * L).exp();
    let gamma = L93_N * (lon - L93_LON0).to_radians();
    (L93_XS + R * gamma.sin(), L93_YS - R * gamma.cos())
}

fn lambert93_inverse(x: f64, y: f64) -> (f64, f64) {
    let dx = x - L93_XS;
    let dy = L93_YS - y;
    let R = (dx * dx + dy * dy).sqrt();
    let gamma = dx.atan2(dy);
    let lon = L93_LON0 + (gamma / L93_N).to_degrees();
    let L = -(R / L93_C).ln() / L93_N;

    let mut phi = 2.0 * L.exp().atan() - FRAC_PI_2;
    for _ in 0..20 {
        let es = GRS80_E * phi.sin();
        let next =
            2.0 * (((1.0 + es) / (1.0 - es)).powf(GRS80_E / 2.0) * L.exp()).atan() - FRAC_PI_2;
        if (next - phi).abs() < 1e-12 {
            phi = next;
            break;
        }
        phi = next;
    }
    (lon, phi.to_degrees())
}

fn central_meridian(zone: u32) -> f64 {
    (zone as f64) * 6.0 - 183.0
}

fn utm_forward(lon: f64, lat: f64, zone: u32, north: bool) -> Result<(f64, f64), TrackError> {
    if !(-80.0..=84.0).contains(&lat) {
        return Err(TrackError::WrongCoordinateSystem(format!(
            "latitude {lat} outside the UTM domain"
        )));
    }
    let phi = lat.to_radians();
    let dl = (lon - central_meridian(zone)).to_radians();
    let n0 = if north { 0.0 } else { UTM_N0_SOUTH };

    let s = phi.sin();
    let t = (s.atanh() - UTM_C * (UTM_C * s).atanh()).sinh();
    let xi = (t / dl.cos()).atan();
    let eta = (dl.sin() / (1.0 + t * t).sqrt()).atanh();

    let mut e = eta;
    let mut n = xi;
    for (j, a) in ALPHA.iter().enumerate() {
        let k = 2.0 * (j as f64 + 1.0);
        e += a * (k * xi).cos() * (k * eta).sinh();
        n += a * (k * xi).sin() * (k * eta).cosh();
    }
    Ok((UTM_E0 + UTM_K0_A * e, n0 + UTM_K0_A * n))
}

fn utm_inverse(easting: f64, northing: f64, zone: u32, north: bool) -> (f64, f64) {
    let n0 = if north { 0.0 } else { UTM_N0_SOUTH };
    let xi = (northing - n0) / UTM_K0_A;
    let eta = (easting - UTM_E0) / UTM_K0_A;

    let mut xi_p = xi;
    let mut eta_p = eta;
    for (j, b) in BETA.iter().enumerate() {
        let k = 2.0 * (j as f64 + 1.0);
        xi_p -= b * (k * xi).sin() * (k * eta).cosh();
        eta_p -= b * (k * xi).cos() * (k * eta).sinh();
    }

    let chi = (xi_p.sin() / eta_p.cosh()).asin();
    let mut phi = chi;
    for (j, d) in DELTA.iter().enumerate() {
        phi += d * (2.0 * (j as f64 + 1.0) * chi).sin();
    }
    let lon = central_meridian(zone) + eta_p.sinh().atan2(xi_p.cos()).to_degrees();
    (lon, phi.to_degrees())
}

#[cfg(test)]
mod projection_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_codes() {
        assert_eq!(ProjSrid::from_code(2154).unwrap(), ProjSrid::Lambert93);
        assert_eq!(
            ProjSrid::from_code(32631).unwrap(),
            ProjSrid::Utm {
                zone: 31,
                north: true
            }
        );
        assert_eq!(ProjSrid::from_code(32718).unwrap().code(), 32718);
        assert!(ProjSrid::from_code(4326).is_err());
    }

    #[test]
    fn test_lambert93_origin() {
        // the projection origin (3°E, 46.5°N) maps to (700000, 6600000)
        let (x, y) = ProjSrid::Lambert93.forward(3.0, 46.5).unwrap();
        assert_abs_diff_eq!(x, 700_000.0, epsilon = 1e-3);
        assert_abs_diff_eq!(y, 6_600_000.0, epsilon = 1.0);
    }

    #[test]
    fn test_round_trips() {
        for srid in [
            ProjSrid::Lambert93,
            ProjSrid::Utm {
                zone: 31,
                north: true,
            },
        ] {
            let (e, n) = srid.forward(2.35, 48.85).unwrap();
            let (lon, lat) = srid.inverse(e, n).unwrap();
            assert_abs_diff_eq!(lon, 2.35, epsilon = 1e-8);
            assert_abs_diff_eq!(lat, 48.85, epsilon = 1e-8);
        }
        let south = ProjSrid::Utm {
            zone: 23,
            north: false,
        };
        let (e, n) = south.forward(-46.63, -23.55).unwrap();
        let (lon, lat) = south.inverse(e, n).unwrap();
        assert_abs_diff_eq!(lon, -46.63, epsilon = 1e-8);
        assert_abs_diff_eq!(lat, -23.55, epsilon = 1e-8);
    }

    #[test]
    fn test_utm_central_meridian() {
        let (e, _) = ProjSrid::Utm {
            zone: 31,
            north: true,
        }
        .forward(3.0, 45.0)
        .unwrap();
        assert_abs_diff_eq!(e, 500_000.0, epsilon = 1e-6);
    }
}
