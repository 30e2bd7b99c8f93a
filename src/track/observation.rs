use serde::{Deserialize, Serialize};
use std::fmt;

use crate::coords::Coord;
use crate::time::GPSTime;

/// Value of an analytical feature on one observation.
///
/// Numeric operators read [`FeatureValue::Text`] as `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureValue {
    Num(f64),
    Text(String),
}

impl FeatureValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            FeatureValue::Num(v) => *v,
            FeatureValue::Text(_) => f64::NAN,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(s) => Some(s),
            FeatureValue::Num(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, FeatureValue::Text(_))
    }
}

impl Default for FeatureValue {
    fn default() -> Self {
        FeatureValue::Num(f64::NAN)
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Num(v)
    }
}

impl From<&str> for FeatureValue {
    fn from(s: &str) -> Self {
        FeatureValue::Text(s.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(s: String) -> Self {
        FeatureValue::Text(s)
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Num(v) => write!(f, "{v}"),
            FeatureValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Receiver quality fields attached to GNSS fixes (NMEA imports).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GnssQuality {
    pub hdop: Option<f64>,
    pub vdop: Option<f64>,
    pub pdop: Option<f64>,
    pub gdop: Option<f64>,
    pub nb_sats: Option<u32>,
    pub azimuth: Option<f64>,
    pub elevation: Option<f64>,
}

/// A timestamped position with its analytical feature values.
///
/// The `features` vector is parallel to the owning track's feature names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub position: Coord,
    pub timestamp: GPSTime,
    pub features: Vec<FeatureValue>,
    pub gnss: Option<GnssQuality>,
}

impl Observation {
    pub fn new(position: Coord, timestamp: GPSTime) -> Self {
        Observation {
            position,
            timestamp,
            features: Vec::new(),
            gnss: None,
        }
    }

    pub fn with_gnss(mut self, gnss: GnssQuality) -> Self {
        self.gnss = Some(gnss);
        self
    }

    pub fn distance_to(&self, other: &Observation) -> Result<f64, crate::track_errors::TrackError> {
        self.position.distance_to(&other.position)
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.timestamp, self.position)
    }
}

#[cfg(test)]
mod observation_test {
    use super::*;

    #[test]
    fn test_feature_value_numeric_view() {
        assert_eq!(FeatureValue::Num(2.5).as_f64(), 2.5);
        assert!(FeatureValue::from("car").as_f64().is_nan());
        assert_eq!(FeatureValue::from("car").as_text(), Some("car"));
        assert!(FeatureValue::default().as_f64().is_nan());
    }

    #[test]
    fn test_observation_distance() {
        let t = GPSTime::zero();
        let a = Observation::new(Coord::enu(0.0, 0.0, 0.0), t);
        let b = Observation::new(Coord::enu(3.0, 4.0, 0.0), t.add_sec(1.0));
        assert_eq!(a.distance_to(&b).unwrap(), 5.0);
    }
}
