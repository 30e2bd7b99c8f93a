//! Well-known-text geometries stored in a CSV column, one track per line.
//!
//! `LINESTRING`, `POLYGON` (outer ring) and `MULTIPOLYGON` (outer ring of the first
//! polygon) are read; an optional `Z` dimension gives the height. Geometries carry no
//! time: observations are one second apart from 1970-01-01.
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::collection::TrackCollection;
use crate::coords::{Coord, Crs, Srid};
use crate::time::GPSTime;
use crate::track::{Observation, Track};
use crate::track_errors::TrackError;

use super::at_line;
use super::csv_reader::CsvFormat;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WktFormat {
    /// Column of the geometry
    pub id_geom: usize,
    /// Column used as the track uid, the line number when `None`
    pub id_uid: Option<usize>,
    pub separator: char,
    pub header: usize,
    pub comment: Option<char>,
    pub srid: String,
}

impl Default for WktFormat {
    fn default() -> Self {
        WktFormat {
            id_geom: 0,
            id_uid: None,
            separator: ';',
            header: 0,
            comment: Some('#'),
            srid: "ENU".to_string(),
        }
    }
}

/// Bare `.wkt` files: one geometry per line, with the SRID, header count and comment
/// prefix of a CSV description.
impl From<&CsvFormat> for WktFormat {
    fn from(csv: &CsvFormat) -> Self {
        WktFormat {
            header: csv.header,
            comment: csv.comment,
            srid: csv.srid.clone(),
            ..WktFormat::default()
        }
    }
}

/// Vertices of a WKT geometry.
///
/// Errors
/// ------
/// * [`TrackError::ParseError`] for an unsupported geometry type or a malformed
///   vertex list.
pub fn parse_wkt_geometry(wkt: &str, srid: Srid) -> Result<Vec<Coord>, TrackError> {
    let wkt = wkt.trim();
    let open = wkt
        .find('(')
        .ok_or_else(|| TrackError::ParseError(format!("no vertex list in '{wkt}'")))?;
    let kind = wkt[..open]
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    if !matches!(kind.as_str(), "LINESTRING" | "POLYGON" | "MULTIPOLYGON") {
        return Err(TrackError::ParseError(format!("unsupported WKT geometry '{kind}'")));
    }
    let body = wkt[open..].trim_start_matches(|c: char| c == '(' || c.is_whitespace());
    let close = body
        .find(')')
        .ok_or_else(|| TrackError::ParseError(format!("unclosed vertex list in '{wkt}'")))?;

    body[..close]
        .split(',')
        .map(|vertex| {
            let values = vertex
                .split_whitespace()
                .map(|v| v.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| TrackError::ParseError(format!("bad WKT vertex '{vertex}'")))?;
            match values[..] {
                [x, y] => Ok(Coord::from_components(srid, x, y, 0.0)),
                [x, y, z] => Ok(Coord::from_components(srid, x, y, z)),
                _ => Err(TrackError::ParseError(format!("bad WKT vertex '{vertex}'"))),
            }
        })
        .collect()
}

/// Track from the vertices of a WKT geometry.
pub fn wkt_track(wkt: &str, srid: Srid) -> Result<Track, TrackError> {
    let t0 = GPSTime::zero();
    let observations = parse_wkt_geometry(wkt, srid)?
        .into_iter()
        .enumerate()
        .map(|(i, c)| Observation::new(c, t0.add_sec(i as f64)))
        .collect();
    Ok(Track::from_observations(observations))
}

fn read_from<R: std::io::Read>(reader: csv::Reader<R>, format: &WktFormat) -> Result<TrackCollection, TrackError> {
    let srid = format.srid.parse::<Crs>()?.storage();
    let mut collection = TrackCollection::new();
    for (row, record) in reader.into_records().enumerate().skip(format.header) {
        let record = record?;
        let line = row as u64 + 1;
        let geom = record.get(format.id_geom).ok_or_else(|| {
            at_line(line, TrackError::OutOfRange { index: format.id_geom, len: record.len() })
        })?;
        let track = wkt_track(geom, srid).map_err(|e| at_line(line, e))?;
        let uid = format
            .id_uid
            .and_then(|k| record.get(k))
            .map(str::to_string)
            .unwrap_or_else(|| row.to_string());
        collection.add_track(track.with_ids(uid, row.to_string()));
    }
    Ok(collection)
}

fn csv_format(format: &WktFormat) -> CsvFormat {
    CsvFormat {
        separator: format.separator,
        comment: format.comment,
        ..CsvFormat::default()
    }
}

/// Read every geometry of a WKT CSV file.
pub fn read_wkt(path: &Utf8Path, format: &WktFormat) -> Result<TrackCollection, TrackError> {
    let reader = csv_format(format).reader_builder()?.from_path(path)?;
    read_from(reader, format)
}

pub fn parse_wkt(content: &str, format: &WktFormat) -> Result<TrackCollection, TrackError> {
    let reader = csv_format(format).reader_builder()?.from_reader(content.as_bytes());
    read_from(reader, format)
}
