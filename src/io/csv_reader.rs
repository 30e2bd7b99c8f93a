//! Delimited text tracks.
//!
//! One observation per record. The position columns (`id_e`, `id_n`, optional `id_u`)
//! and the time column (`id_t`) are addressed by index; with `read_all` every other
//! column becomes an analytical feature named after the last header line. Header
//! names ending in `&` mark text columns (the `&` is dropped from the AF name).
//!
//! Timestamps are either parsed with `time_format` (or the thread's read format),
//! or, when `time_ini` is set, read as numbers of `time_unit` seconds elapsed since
//! that epoch. Without a time column observations are `time_unit` seconds apart.
//!
//! Records whose position equals the no-data value are skipped. Any other record whose
//! position or time cannot be read fails the whole read with its line number.
use camino::{Utf8Path, Utf8PathBuf};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::collection::TrackCollection;
use crate::constants::{is_reserved, NO_DATA_VALUE};
use crate::coords::{Coord, Crs};
use crate::settings::with_settings;
use crate::time::GPSTime;
use crate::track::{FeatureValue, Observation, Track};
use crate::track_errors::TrackError;

use super::{at_line, stem_of};

/// Column layout of a CSV track file.
///
/// # Fields
///
/// * `id_e`, `id_n`, `id_u` - columns of the first, second and third coordinate
///   (`id_u = None` reads a zero height)
/// * `id_t` - timestamp column, `None` for untimed files
/// * `time_ini` - epoch of numeric time columns
/// * `time_unit` - seconds per unit of numeric time columns
/// * `time_format` - timestamp layout, the thread's `read_format` when `None`
/// * `separator` - single ASCII field separator
/// * `header` - number of header lines, the last one naming the columns
/// * `comment` - lines starting with this character are ignored
/// * `no_data` - missing value sentinel, read as `NaN` in AF columns
/// * `srid` - `GEO`, `ENU`, `ECEF` or a numeric projected system
/// * `read_all` - register the other columns as AFs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvFormat {
    pub id_e: usize,
    pub id_n: usize,
    pub id_u: Option<usize>,
    pub id_t: Option<usize>,
    pub time_ini: Option<GPSTime>,
    pub time_unit: f64,
    pub time_format: Option<String>,
    pub separator: char,
    pub header: usize,
    pub comment: Option<char>,
    pub no_data: f64,
    pub srid: String,
    pub read_all: bool,
}

impl Default for CsvFormat {
    fn default() -> Self {
        CsvFormat {
            id_e: 0,
            id_n: 1,
            id_u: Some(2),
            id_t: Some(3),
            time_ini: None,
            time_unit: 1.0,
            time_format: None,
            separator: ',',
            header: 1,
            comment: Some('#'),
            no_data: NO_DATA_VALUE,
            srid: "ENU".to_string(),
            read_all: false,
        }
    }
}

impl CsvFormat {
    pub(crate) fn separator_byte(&self) -> Result<u8, TrackError> {
        if self.separator.is_ascii() {
            Ok(self.separator as u8)
        } else {
            Err(TrackError::ConfigError(format!(
                "separator '{}' is not a single ASCII character",
                self.separator
            )))
        }
    }

    pub(crate) fn reader_builder(&self) -> Result<ReaderBuilder, TrackError> {
        let comment = match self.comment {
            Some(c) if c.is_ascii() => Some(c as u8),
            Some(c) => {
                return Err(TrackError::ConfigError(format!(
                    "comment prefix '{c}' is not ASCII"
                )))
            }
            None => None,
        };
        let mut builder = ReaderBuilder::new();
        builder
            .delimiter(self.separator_byte()?)
            .comment(comment)
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All);
        Ok(builder)
    }

    pub(crate) fn layout(&self) -> String {
        self.time_format
            .clone()
            .unwrap_or_else(|| with_settings(|s| s.read_format.clone()))
    }

    fn is_special(&self, k: usize) -> bool {
        k == self.id_e || k == self.id_n || self.id_u == Some(k) || self.id_t == Some(k)
    }
}

/// Read one track from a CSV file. The track uid is the file stem.
///
/// Errors
/// ------
/// * [`TrackError::IoError`] / [`TrackError::CsvError`] when the file cannot be read,
/// * [`TrackError::ConfigError`] for a non-ASCII separator,
/// * [`TrackError::WrongCoordinateSystem`] for an unknown SRID.
pub fn read_csv(path: &Utf8Path, format: &CsvFormat) -> Result<Track, TrackError> {
    let reader = format.reader_builder()?.from_path(path)?;
    let track = read_records(reader.into_records(), format)?;
    Ok(track.with_ids(stem_of(path), ""))
}

/// Read one track from in-memory CSV text.
pub fn parse_csv(content: &str, format: &CsvFormat) -> Result<Track, TrackError> {
    let reader = format.reader_builder()?.from_reader(content.as_bytes());
    read_records(reader.into_records(), format)
}

/// One track per file, in the order given.
pub fn read_csv_collection<P: AsRef<Utf8Path>>(
    paths: &[P],
    format: &CsvFormat,
) -> Result<TrackCollection, TrackError> {
    paths.iter().map(|p| read_csv(p.as_ref(), format)).collect()
}

/// Every `*.csv` file of `dir`, sorted by name.
pub fn read_csv_dir(dir: &Utf8Path, format: &CsvFormat) -> Result<TrackCollection, TrackError> {
    let mut paths: Vec<Utf8PathBuf> = dir
        .read_dir_utf8()?
        .filter_map(|entry| entry.ok().map(|e| e.into_path()))
        .filter(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case("csv")))
        .collect();
    paths.sort();
    debug!("{} csv files found in {dir}", paths.len());
    read_csv_collection(&paths, format)
}

enum Column {
    Number(Vec<f64>),
    Text(Vec<String>),
}

fn read_records<R: std::io::Read>(
    records: csv::StringRecordsIntoIter<R>,
    format: &CsvFormat,
) -> Result<Track, TrackError> {
    let crs: Crs = format.srid.parse()?;
    let layout = format.layout();

    let mut header: Option<StringRecord> = None;
    let mut observations = Vec::new();
    let mut columns: Vec<(String, usize, Column)> = Vec::new();
    let mut skipped = 0usize;

    for (row, record) in records.enumerate() {
        let record = record?;
        if row < format.header {
            header = Some(record);
            continue;
        }
        if format.read_all && columns.is_empty() {
            columns = af_columns(header.as_ref(), &record, format);
        }
        let line = record.position().map(|p| p.line()).unwrap_or(row as u64 + 1);
        let obs = match read_observation(&record, format, crs, &layout, observations.len()) {
            Ok(Some(obs)) => obs,
            Ok(None) => {
                skipped += 1;
                continue;
            }
            Err(e) => return Err(at_line(line, e)),
        };
        observations.push(obs);
        for (_, k, column) in columns.iter_mut() {
            let raw = record.get(*k).unwrap_or_default();
            match column {
                Column::Text(v) => v.push(raw.to_string()),
                Column::Number(v) => v.push(match raw.parse::<f64>() {
                    Ok(x) if x != format.no_data => x,
                    _ => f64::NAN,
                }),
            }
        }
    }
    if skipped > 0 {
        debug!("{skipped} no-data records skipped");
    }

    let mut track = Track::from_observations(observations);
    for (name, _, column) in columns {
        let values = match column {
            Column::Number(v) => v.into_iter().map(FeatureValue::Num).collect(),
            Column::Text(v) => v.into_iter().map(FeatureValue::Text).collect(),
        };
        track.create_feature_values(&name, values)?;
    }
    track.no_data = format.no_data;
    debug!(
        "csv track of {} observations and {} AFs",
        track.size(),
        track.feature_names().len()
    );
    Ok(track)
}

/// AF columns registered by `read_all`, named after the header when present.
fn af_columns(
    header: Option<&StringRecord>,
    first: &StringRecord,
    format: &CsvFormat,
) -> Vec<(String, usize, Column)> {
    let width = header.map_or(first.len(), |h| h.len().max(first.len()));
    let mut columns = Vec::new();
    for k in (0..width).filter(|k| !format.is_special(*k)) {
        let raw = header
            .and_then(|h| h.get(k))
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("col{k}"));
        let (name, text) = match raw.strip_suffix('&') {
            Some(stripped) => (stripped.to_string(), true),
            None => (raw, false),
        };
        if is_reserved(&name) || columns.iter().any(|(n, _, _)| *n == name) {
            warn!("column {k} ('{name}') cannot be stored as an AF and is ignored");
            continue;
        }
        let column = if text {
            Column::Text(Vec::new())
        } else {
            Column::Number(Vec::new())
        };
        columns.push((name, k, column));
    }
    columns
}

fn field(record: &StringRecord, k: usize) -> Result<f64, TrackError> {
    let raw = record
        .get(k)
        .ok_or(TrackError::OutOfRange { index: k, len: record.len() })?;
    raw.parse::<f64>()
        .map_err(|_| TrackError::ParseError(format!("'{raw}' in column {k} is not a number")))
}

fn read_observation(
    record: &StringRecord,
    format: &CsvFormat,
    crs: Crs,
    layout: &str,
    n: usize,
) -> Result<Option<Observation>, TrackError> {
    let e = field(record, format.id_e)?;
    let n_coord = field(record, format.id_n)?;
    if e == format.no_data || n_coord == format.no_data {
        return Ok(None);
    }
    let u = match format.id_u {
        Some(k) => match field(record, k)? {
            v if v == format.no_data => 0.0,
            v => v,
        },
        None => 0.0,
    };
    let origin = format.time_ini.unwrap_or_else(GPSTime::zero);
    let timestamp = match format.id_t {
        Some(k) => {
            let raw = record
                .get(k)
                .ok_or(TrackError::OutOfRange { index: k, len: record.len() })?;
            match format.time_ini {
                Some(t0) => {
                    let v: f64 = raw
                        .parse()
                        .map_err(|_| TrackError::ParseError(format!("'{raw}' is not a time offset")))?;
                    t0.add_sec(v * format.time_unit)
                }
                None => GPSTime::parse_with(raw, layout)?,
            }
        }
        None => origin.add_sec(n as f64 * format.time_unit),
    };
    let position = Coord::from_components(crs.storage(), e, n_coord, u);
    Ok(Some(Observation::new(position, timestamp)))
}
