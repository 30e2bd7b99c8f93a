//! KML export for viewing tracks in a virtual globe.
use std::fmt::Write as _;

use camino::Utf8Path;
use itertools::Itertools;
use quick_xml::escape::escape;

use crate::operator::reducer::UnaryReducer;
use crate::track::Track;
use crate::track_errors::TrackError;

use super::geodetic_copy;

/// Geometry written for a track.
#[derive(Debug, Clone, PartialEq)]
pub enum KmlStyle {
    /// A single `LineString` placemark
    LineString,
    /// One `Point` placemark per observation, colored from blue to red along the
    /// values of `af` over `range` (the AF min / max when `None`)
    Points { af: String, range: Option<(f64, f64)> },
}

/// KML `aabbggrr` color of `value` on a blue → red ramp over `[min, max]`, gray for
/// `NaN`.
pub fn ramp_color(value: f64, min: f64, max: f64) -> String {
    if value.is_nan() {
        return "ff808080".to_string();
    }
    let t = if max > min {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    } else {
        0.5
    };
    let red = (255.0 * t).round() as u8;
    let blue = 255 - red;
    format!("ff{blue:02x}00{red:02x}")
}

fn coordinates(track: &Track) -> String {
    track
        .iter()
        .map(|o| format!("{},{},{}", o.position.x(), o.position.y(), o.position.z()))
        .join(" ")
}

/// Render a track as a KML document.
pub fn to_kml_string(track: &Track, style: &KmlStyle) -> Result<String, TrackError> {
    let geo = geodetic_copy(track)?;
    let name = escape(geo.uid.as_str()).into_owned();
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n<Document>\n",
    );
    let _ = writeln!(out, "<name>{name}</name>");
    match style {
        KmlStyle::LineString => {
            let _ = writeln!(
                out,
                "<Placemark><name>{name}</name><LineString><altitudeMode>clampToGround</altitudeMode>\
                 <coordinates>{}</coordinates></LineString></Placemark>",
                coordinates(&geo)
            );
        }
        KmlStyle::Points { af, range } => {
            let values = geo.get_analytical_feature(af)?;
            let (min, max) = match range {
                Some(r) => *r,
                None => (UnaryReducer::Min.reduce(&values), UnaryReducer::Max.reduce(&values)),
            };
            for (obs, v) in geo.iter().zip(&values) {
                let _ = writeln!(
                    out,
                    "<Placemark><TimeStamp><when>{}</when></TimeStamp>\
                     <Style><IconStyle><color>{}</color></IconStyle></Style>\
                     <ExtendedData><Data name=\"{}\"><value>{v}</value></Data></ExtendedData>\
                     <Point><coordinates>{},{},{}</coordinates></Point></Placemark>",
                    obs.timestamp.format_with("4Y-2M-2DT2h:2m:2s1Z"),
                    ramp_color(*v, min, max),
                    escape(af.as_str()),
                    obs.position.x(),
                    obs.position.y(),
                    obs.position.z(),
                );
            }
        }
    }
    out.push_str("</Document>\n</kml>\n");
    Ok(out)
}

pub fn write_kml(track: &Track, path: &Utf8Path, style: &KmlStyle) -> Result<(), TrackError> {
    std::fs::write(path, to_kml_string(track, style)?)?;
    Ok(())
}

#[cfg(test)]
mod kml_test {
    use super::*;
    use crate::coords::Coord;

    fn geo_track() -> Track {
        let mut t = crate::track::enu_track(&[(0.0, 0.0, 0.0), (100.0, 0.0, 0.0), (100.0, 100.0, 0.0)], 1.0);
        t.base = Some(Coord::geo(2.35, 48.85, 0.0));
        t.create_analytical_feature("v", vec![0.0, 5.0, 10.0]).unwrap();
        t.with_ids("ride", "")
    }

    #[test]
    fn test_ramp() {
        assert_eq!(ramp_color(0.0, 0.0, 10.0), "ffff0000");
        assert_eq!(ramp_color(10.0, 0.0, 10.0), "ff0000ff");
        assert_eq!(ramp_color(20.0, 0.0, 10.0), "ff0000ff");
        assert_eq!(ramp_color(f64::NAN, 0.0, 10.0), "ff808080");
    }

    #[test]
    fn test_line_and_points() {
        let t = geo_track();
        let line = to_kml_string(&t, &KmlStyle::LineString).unwrap();
        assert_eq!(line.matches("<Placemark>").count(), 1);
        assert!(line.contains("<coordinates>2.3"));

        let points = to_kml_string(
            &t,
            &KmlStyle::Points {
                af: "v".into(),
                range: None,
            },
        )
        .unwrap();
        assert_eq!(points.matches("<Point>").count(), 3);
        assert!(points.contains("<color>ff7f0080</color>"));
        assert!(matches!(
            to_kml_string(&t, &KmlStyle::Points { af: "w".into(), range: None }),
            Err(TrackError::UnknownFeature(_))
        ));
    }
}
