//! # Track file formats
//!
//! Readers and writers for the external formats exchanged with GIS tools.
//!
//! | Module               | Read                         | Write                      |
//! |----------------------|------------------------------|----------------------------|
//! | [`csv_reader`]       | [`read_csv`], collections    |                            |
//! | [`csv_writer`]       |                              | [`write_csv`]              |
//! | [`gpx`]              | `<trkpt>` / `<rtept>`        | one `<trk>` per track      |
//! | [`wkt`]              | `LINESTRING`, `POLYGON`, … in a CSV column |              |
//! | [`nmea`]             | `$GxGGA` frames              |                            |
//! | [`ascii_raster`]     | ESRI ASCII grid              | ESRI ASCII grid            |
//! | [`kml`]              |                              | `LineString` or `Point`s   |
//! | [`geojson`]          |                              | `FeatureCollection`        |
//! | [`network_reader`]   | one edge per CSV line        |                            |
//!
//! [`TrackFormat`] picks a format from a file extension, which is what the `trcvt`
//! binary relies on through [`read_collection`] and [`write_collection`].
pub mod ascii_raster;
pub mod csv_reader;
pub mod csv_writer;
pub mod geojson;
pub mod gpx;
pub mod kml;
pub mod network_reader;
pub mod nmea;
pub mod wkt;

use std::fmt;

use camino::Utf8Path;
use log::info;

use crate::collection::TrackCollection;
use crate::coords::Srid;
use crate::track::Track;
use crate::track_errors::TrackError;

pub use csv_reader::{read_csv, read_csv_collection, read_csv_dir, CsvFormat};
pub use csv_writer::write_csv;

/// File formats known to the extension dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackFormat {
    Csv,
    Gpx,
    Nmea,
    Wkt,
    Kml,
    GeoJson,
}

impl fmt::Display for TrackFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackFormat::Csv => "csv",
            TrackFormat::Gpx => "gpx",
            TrackFormat::Nmea => "nmea",
            TrackFormat::Wkt => "wkt",
            TrackFormat::Kml => "kml",
            TrackFormat::GeoJson => "geojson",
        };
        write!(f, "{name}")
    }
}

impl TrackFormat {
    /// Format of a file from its (case-insensitive) extension.
    pub fn from_path(path: &Utf8Path) -> Result<Self, TrackError> {
        let ext = path
            .extension()
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "txt" | "dat" => Ok(TrackFormat::Csv),
            "gpx" => Ok(TrackFormat::Gpx),
            "nmea" | "nma" => Ok(TrackFormat::Nmea),
            "wkt" => Ok(TrackFormat::Wkt),
            "kml" => Ok(TrackFormat::Kml),
            "geojson" | "json" => Ok(TrackFormat::GeoJson),
            _ => Err(TrackError::ConfigError(format!(
                "cannot infer a track format from '{path}'"
            ))),
        }
    }
}

/// Read a file as a collection, the format being chosen from its extension.
///
/// `csv` describes the columns of CSV and WKT inputs; GPX and NMEA files are always
/// geodetic, GPX extensions being read as AFs when `csv.read_all` is set.
pub fn read_collection(path: &Utf8Path, csv: &CsvFormat) -> Result<TrackCollection, TrackError> {
    let collection = match TrackFormat::from_path(path)? {
        TrackFormat::Csv => TrackCollection::from_tracks(vec![read_csv(path, csv)?]),
        TrackFormat::Gpx => gpx::read_gpx(path, Srid::Geo, csv.read_all)?,
        TrackFormat::Nmea => TrackCollection::from_tracks(vec![nmea::read_nmea(path)?]),
        TrackFormat::Wkt => wkt::read_wkt(path, &wkt::WktFormat::from(csv))?,
        other => {
            return Err(TrackError::ConfigError(format!(
                "{other} is an output-only format"
            )))
        }
    };
    info!(
        "read {} tracks ({} observations) from {path}",
        collection.size(),
        collection.nb_observations()
    );
    Ok(collection)
}

/// Write a collection, the format being chosen from the extension of `path`.
///
/// Single-track formats (CSV, KML) receive one file per track when the collection
/// holds several: the file stem is suffixed with the track index.
pub fn write_collection(
    collection: &TrackCollection,
    path: &Utf8Path,
    csv: &CsvFormat,
) -> Result<(), TrackError> {
    let format = TrackFormat::from_path(path)?;
    match format {
        TrackFormat::Gpx => gpx::write_gpx(collection, path, true),
        TrackFormat::GeoJson => geojson::write_geojson(collection, path, geojson::GeometryKind::LineString),
        TrackFormat::Csv | TrackFormat::Kml => {
            for (k, track) in collection.iter().enumerate() {
                let target = if collection.size() == 1 {
                    path.to_owned()
                } else {
                    indexed_path(path, &k.to_string())
                };
                match format {
                    TrackFormat::Csv => write_csv(track, &target, csv)?,
                    _ => kml::write_kml(track, &target, &kml::KmlStyle::LineString)?,
                }
            }
            Ok(())
        }
        other => Err(TrackError::ConfigError(format!("{other} is an input-only format"))),
    }
}

/// `dir/stem_suffix.ext` from `dir/stem.ext`.
pub fn indexed_path(path: &Utf8Path, suffix: &str) -> camino::Utf8PathBuf {
    let stem = path.file_stem().unwrap_or("out");
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{suffix}.{ext}"),
        None => format!("{stem}_{suffix}"),
    };
    path.with_file_name(name)
}

/// Copy of `track` in geodetic coordinates, for formats that only speak lon/lat.
///
/// ENU tracks need a base point; projected tracks (ENU without base) are rejected.
pub(crate) fn geodetic_copy(track: &Track) -> Result<Track, TrackError> {
    let mut copy = track.clone();
    if !copy.is_empty() && copy.srid()? != Srid::Geo {
        copy.to_geo_coords(None)?;
    }
    Ok(copy)
}

/// Error of a rejected record, tagged with its 1-based line number.
pub(crate) fn at_line(line: u64, e: TrackError) -> TrackError {
    TrackError::ParseError(format!("line {line}: {e}"))
}

/// File stem used as the uid of tracks read from `path`.
pub(crate) fn stem_of(path: &Utf8Path) -> String {
    path.file_stem().unwrap_or_default().to_string()
}

#[cfg(test)]
mod io_test {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(TrackFormat::from_path(Utf8Path::new("a/b.GPX")).unwrap(), TrackFormat::Gpx);
        assert_eq!(TrackFormat::from_path(Utf8Path::new("b.csv")).unwrap(), TrackFormat::Csv);
        assert_eq!(
            TrackFormat::from_path(Utf8Path::new("b.geojson")).unwrap(),
            TrackFormat::GeoJson
        );
        assert!(matches!(
            TrackFormat::from_path(Utf8Path::new("b.shp")),
            Err(TrackError::ConfigError(_))
        ));
    }

    #[test]
    fn test_indexed_path() {
        assert_eq!(indexed_path(Utf8Path::new("out/r.asc"), "speed#avg").as_str(), "out/r_speed#avg.asc");
        assert_eq!(indexed_path(Utf8Path::new("r"), "1").as_str(), "r_1");
    }

    #[test]
    fn test_geodetic_copy_needs_base() {
        let t = crate::track::enu_track(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0)], 1.0);
        assert!(geodetic_copy(&t).is_err());
    }
}
