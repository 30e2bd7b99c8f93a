//! GPX 1.1 tracks and routes.
//!
//! Every `<trk>` (all of its `<trkseg>` concatenated) and every `<rte>` becomes one
//! track of geodetic observations read from `<trkpt>` / `<rtept>`: `lat` and `lon`
//! attributes, `<ele>` height (0 when missing) and `<time>` (ISO 8601). With
//! `read_all`, the leaf elements found under a point's `<extensions>` become AFs,
//! numeric when every value parses as a number, text otherwise.
use std::fmt::Write as _;

use camino::Utf8Path;
use hifitime::Epoch;
use log::{debug, warn};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::collection::TrackCollection;
use crate::coords::{Coord, Srid};
use crate::time::GPSTime;
use crate::track::{FeatureValue, Observation, Track};
use crate::track_errors::TrackError;

use super::geodetic_copy;

const TIME_LAYOUTS: [&str; 5] = [
    "4Y-2M-2DT2h:2m:2s1Z",
    "4Y-2M-2DT2h:2m:2s.3z1Z",
    "4Y-2M-2DT2h:2m:2s.2z1Z",
    "4Y-2M-2DT2h:2m:2s.1z1Z",
    "4Y-2M-2DT2h:2m:2s",
];

fn xml_error(reader_pos: u64, e: impl std::fmt::Display) -> TrackError {
    TrackError::XmlError(format!("at byte {reader_pos}: {e}"))
}

/// Parse an ISO 8601 GPX timestamp.
pub fn parse_gpx_time(s: &str) -> Result<GPSTime, TrackError> {
    let s = s.trim();
    TIME_LAYOUTS
        .iter()
        .find_map(|layout| GPSTime::parse_with(s, layout).ok())
        .or_else(|| {
            s.parse::<Epoch>()
                .ok()
                .map(|e| GPSTime::read_unix_time(e.to_unix_seconds()))
        })
        .ok_or_else(|| TrackError::ParseError(format!("'{s}' is not an ISO 8601 timestamp")))
}

fn format_gpx_time(t: &GPSTime) -> String {
    if t.ms == 0 {
        t.format_with(TIME_LAYOUTS[0])
    } else {
        t.format_with(TIME_LAYOUTS[1])
    }
}

#[derive(Default)]
struct PointBuilder {
    lon: f64,
    lat: f64,
    ele: Option<f64>,
    time: Option<GPSTime>,
    extensions: Vec<(String, String)>,
}

#[derive(Default)]
struct TrackBuilder {
    name: Option<String>,
    points: Vec<PointBuilder>,
}

enum Target {
    None,
    Name,
    Ele,
    Time,
    Extension(String),
}

fn point_start(e: &BytesStart<'_>, pos: u64) -> Result<PointBuilder, TrackError> {
    let mut p = PointBuilder {
        lon: f64::NAN,
        lat: f64::NAN,
        ..PointBuilder::default()
    };
    for attr in e.attributes() {
        let attr = attr.map_err(|e| xml_error(pos, e))?;
        let value = attr.unescape_value().map_err(|e| xml_error(pos, e))?;
        let parsed = || {
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| TrackError::ParseError(format!("bad coordinate '{value}'")))
        };
        match attr.key.local_name().as_ref() {
            b"lat" => p.lat = parsed()?,
            b"lon" => p.lon = parsed()?,
            _ => {}
        }
    }
    if p.lat.is_nan() || p.lon.is_nan() {
        return Err(xml_error(pos, "point without lat/lon attributes"));
    }
    Ok(p)
}

fn is_point(name: &[u8]) -> bool {
    matches!(name, b"trkpt" | b"rtept")
}

fn is_track(name: &[u8]) -> bool {
    matches!(name, b"trk" | b"rte")
}

/// Parse GPX text into one track per `<trk>` / `<rte>`.
pub fn parse_gpx(content: &str, read_all: bool) -> Result<TrackCollection, TrackError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut builders: Vec<TrackBuilder> = Vec::new();
    let mut current: Option<TrackBuilder> = None;
    let mut point: Option<PointBuilder> = None;
    let mut in_extensions = false;
    let mut target = Target::None;

    loop {
        let pos = reader.buffer_position();
        match reader.read_event().map_err(|e| xml_error(pos, e))? {
            Event::Eof => break,
            Event::Start(e) => {
                let name = e.local_name();
                let name = name.as_ref();
                if is_track(name) {
                    current = Some(TrackBuilder::default());
                } else if is_point(name) {
                    point = Some(point_start(&e, pos)?);
                } else if point.is_some() {
                    match name {
                        b"extensions" => in_extensions = true,
                        b"ele" => target = Target::Ele,
                        b"time" => target = Target::Time,
                        other if in_extensions => {
                            target = Target::Extension(String::from_utf8_lossy(other).into_owned())
                        }
                        _ => {}
                    }
                } else if name == b"name" && current.is_some() {
                    target = Target::Name;
                }
            }
            Event::Empty(e) => {
                if is_point(e.local_name().as_ref()) {
                    let p = point_start(&e, pos)?;
                    if let Some(t) = current.as_mut() {
                        t.points.push(p);
                    }
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| xml_error(pos, e))?;
                match (&target, point.as_mut(), current.as_mut()) {
                    (Target::Ele, Some(p), _) => p.ele = text.trim().parse().ok(),
                    (Target::Time, Some(p), _) => {
                        let t = parse_gpx_time(&text)
                            .map_err(|e| TrackError::ParseError(format!("at byte {pos}: {e}")))?;
                        p.time = Some(t);
                    }
                    (Target::Extension(n), Some(p), _) => p.extensions.push((n.clone(), text.into_owned())),
                    (Target::Name, None, Some(t)) => t.name = Some(text.into_owned()),
                    _ => {}
                }
            }
            Event::End(e) => {
                let name = e.local_name();
                let name = name.as_ref();
                if is_point(name) {
                    if let (Some(p), Some(t)) = (point.take(), current.as_mut()) {
                        t.points.push(p);
                    }
                    in_extensions = false;
                } else if is_track(name) {
                    builders.extend(current.take());
                } else if name == b"extensions" {
                    in_extensions = false;
                }
                target = Target::None;
            }
            _ => {}
        }
    }

    builders
        .into_iter()
        .enumerate()
        .map(|(k, b)| build_track(b, k, read_all))
        .collect()
}

fn build_track(builder: TrackBuilder, k: usize, read_all: bool) -> Result<Track, TrackError> {
    let missing_time = builder.points.iter().filter(|p| p.time.is_none()).count();
    if missing_time > 0 {
        warn!("{missing_time} GPX points without time, numbered in seconds from 1970");
    }
    let observations = builder
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let t = p.time.unwrap_or_else(|| GPSTime::zero().add_sec(i as f64));
            Observation::new(Coord::geo(p.lon, p.lat, p.ele.unwrap_or(0.0)), t)
        })
        .collect();
    let uid = builder.name.clone().unwrap_or_else(|| format!("trk{k}"));
    let mut track = Track::from_observations(observations).with_ids(uid, k.to_string());

    if read_all {
        let mut names: Vec<&str> = Vec::new();
        for (n, _) in builder.points.iter().flat_map(|p| &p.extensions) {
            if !names.contains(&n.as_str()) {
                names.push(n);
            }
        }
        for name in names {
            let raw: Vec<Option<&str>> = builder
                .points
                .iter()
                .map(|p| p.extensions.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str()))
                .collect();
            let numeric = raw.iter().flatten().all(|v| v.trim().parse::<f64>().is_ok());
            let values = raw
                .into_iter()
                .map(|v| match (v, numeric) {
                    (Some(v), true) => FeatureValue::Num(v.trim().parse().unwrap_or(f64::NAN)),
                    (None, true) => FeatureValue::Num(f64::NAN),
                    (v, false) => FeatureValue::Text(v.unwrap_or_default().to_string()),
                })
                .collect();
            if let Err(e) = track.create_feature_values(name, values) {
                warn!("GPX extension '{name}' ignored: {e}");
            }
        }
    }
    Ok(track)
}

/// Read a GPX file, converting the tracks to `srid` (ENU tracks are centered on their
/// first observation).
pub fn read_gpx(path: &Utf8Path, srid: Srid, read_all: bool) -> Result<TrackCollection, TrackError> {
    let content = std::fs::read_to_string(path)?;
    let mut collection = parse_gpx(&content, read_all)?;
    collection.retain(|t| !t.is_empty());
    match srid {
        Srid::Geo => {}
        Srid::Enu => collection.try_for_each(|t| t.to_enu_coords(None))?,
        Srid::Ecef => collection.try_for_each(|t| t.to_ecef_coords())?,
    }
    debug!("{} GPX tracks read from {path}", collection.size());
    Ok(collection)
}

/// Render a collection as GPX, one `<trk>` per track, AFs as `<extensions>` when
/// `with_afs` is set.
pub fn to_gpx_string(collection: &TrackCollection, with_afs: bool) -> Result<String, TrackError> {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <gpx version=\"1.1\" creator=\"tracklib\" xmlns=\"http://www.topografix.com/GPX/1/1\">\n",
    );
    for track in collection {
        let geo = geodetic_copy(track)?;
        let _ = writeln!(out, "  <trk>");
        if !geo.uid.is_empty() {
            let _ = writeln!(out, "    <name>{}</name>", escape(geo.uid.as_str()));
        }
        let _ = writeln!(out, "    <trkseg>");
        for obs in &geo {
            let _ = write!(
                out,
                "      <trkpt lat=\"{}\" lon=\"{}\"><ele>{}</ele><time>{}</time>",
                obs.position.y(),
                obs.position.x(),
                obs.position.z(),
                format_gpx_time(&obs.timestamp)
            );
            if with_afs && !geo.feature_names().is_empty() {
                out.push_str("<extensions>");
                for (name, value) in geo.feature_names().iter().zip(&obs.features) {
                    if matches!(value, FeatureValue::Num(v) if v.is_nan()) {
                        continue;
                    }
                    let _ = write!(out, "<{name}>{}</{name}>", escape(value.to_string().as_str()));
                }
                out.push_str("</extensions>");
            }
            out.push_str("</trkpt>\n");
        }
        let _ = writeln!(out, "    </trkseg>\n  </trk>");
    }
    out.push_str("</gpx>\n");
    Ok(out)
}

pub fn write_gpx(collection: &TrackCollection, path: &Utf8Path, with_afs: bool) -> Result<(), TrackError> {
    std::fs::write(path, to_gpx_string(collection, with_afs)?)?;
    Ok(())
}
