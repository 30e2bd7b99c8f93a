//! CSV output mirroring [`CsvFormat`].
//!
//! Position and time columns are written at the indices named by the format, the
//! AFs filling the remaining columns in table order, so that a file read with
//! `read_all` and written back keeps its column order. A single header line is
//! written when `format.header > 0`; text AFs are marked with a trailing `&`.
use camino::Utf8Path;
use csv::WriterBuilder;

use crate::settings::with_settings;
use crate::track::{FeatureValue, Track};
use crate::track_errors::TrackError;

use super::csv_reader::CsvFormat;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Column {
    E,
    N,
    U,
    T,
    Af(usize),
}

fn columns(track: &Track, format: &CsvFormat) -> Result<Vec<Option<Column>>, TrackError> {
    let specials: Vec<(usize, Column)> = [
        Some((format.id_e, Column::E)),
        Some((format.id_n, Column::N)),
        format.id_u.map(|k| (k, Column::U)),
        format.id_t.map(|k| (k, Column::T)),
    ]
    .into_iter()
    .flatten()
    .collect();

    let n_af = track.feature_names().len();
    let width = (specials.len() + n_af).max(specials.iter().map(|(k, _)| k + 1).max().unwrap_or(0));
    let mut layout: Vec<Option<Column>> = vec![None; width];
    for (k, c) in specials {
        if layout[k].is_some() {
            return Err(TrackError::ConfigError(format!("column {k} is assigned twice")));
        }
        layout[k] = Some(c);
    }
    let mut afs = (0..n_af).map(Column::Af);
    for slot in layout.iter_mut().filter(|s| s.is_none()) {
        *slot = afs.next();
    }
    Ok(layout)
}

/// Render `track` as CSV text.
pub fn to_csv_string(track: &Track, format: &CsvFormat) -> Result<String, TrackError> {
    let layout = columns(track, format)?;
    let time_layout = format
        .time_format
        .clone()
        .unwrap_or_else(|| with_settings(|s| s.print_format.clone()));
    let text_afs: Vec<bool> = track
        .feature_names()
        .iter()
        .map(|n| track.is_text_feature(n))
        .collect::<Result<_, _>>()?;

    let mut writer = WriterBuilder::new()
        .delimiter(format.separator_byte()?)
        .flexible(true)
        .from_writer(Vec::new());

    if format.header > 0 {
        let names = layout.iter().map(|c| match c {
            Some(Column::E) => "x".to_string(),
            Some(Column::N) => "y".to_string(),
            Some(Column::U) => "z".to_string(),
            Some(Column::T) => "timestamp".to_string(),
            Some(Column::Af(k)) if text_afs[*k] => format!("{}&", track.feature_names()[*k]),
            Some(Column::Af(k)) => track.feature_names()[*k].clone(),
            None => String::new(),
        });
        writer.write_record(names)?;
    }

    let no_data = |v: f64| if v.is_nan() { format.no_data } else { v };
    for obs in track {
        let row = layout.iter().map(|c| match c {
            Some(Column::E) => obs.position.x().to_string(),
            Some(Column::N) => obs.position.y().to_string(),
            Some(Column::U) => obs.position.z().to_string(),
            Some(Column::T) => match format.time_ini {
                Some(t0) => ((obs.timestamp - t0) / format.time_unit).to_string(),
                None => obs.timestamp.format_with(&time_layout),
            },
            Some(Column::Af(k)) => match &obs.features[*k] {
                FeatureValue::Num(v) => no_data(*v).to_string(),
                FeatureValue::Text(s) => s.clone(),
            },
            None => String::new(),
        });
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| TrackError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| TrackError::ParseError(e.to_string()))
}

/// Write `track` to `path` with the layout of `format`.
pub fn write_csv(track: &Track, path: &Utf8Path, format: &CsvFormat) -> Result<(), TrackError> {
    std::fs::write(path, to_csv_string(track, format)?)?;
    Ok(())
}
