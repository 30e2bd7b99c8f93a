//! NMEA 0183 receiver logs.
//!
//! Positions come from `$GxGGA` fix frames (`GP`, `GL`, `GA`, `GN`, … talkers). The
//! frames only carry the time of day, the date is taken from the last `$GxRMC` frame
//! seen, 1970-01-01 before any. A day is added whenever the time of day goes
//! backwards. GGA frames without a valid fix (quality 0) are skipped; any other frame
//! that cannot be read, a wrong checksum included, fails the read with its line number.
//!
//! Each observation gets the AFs `alt`, `nb_sats` and `hdop`, mirrored in its
//! [`GnssQuality`].
use camino::Utf8Path;
use log::debug;

use crate::coords::Coord;
use crate::time::GPSTime;
use crate::track::{GnssQuality, Observation, Track};
use crate::track_errors::TrackError;

use super::{at_line, stem_of};

/// XOR of the bytes between `$` and `*`.
pub fn checksum(payload: &str) -> u8 {
    payload.bytes().fold(0, |acc, b| acc ^ b)
}

/// Split a sentence into its fields, verifying the checksum when present.
fn fields(line: &str) -> Result<Vec<&str>, TrackError> {
    let body = line
        .trim()
        .strip_prefix('$')
        .ok_or_else(|| TrackError::ParseError(format!("'{line}' is not an NMEA sentence")))?;
    let payload = match body.split_once('*') {
        Some((payload, sum)) => {
            let expected = u8::from_str_radix(sum.trim(), 16)
                .map_err(|_| TrackError::ParseError(format!("bad checksum field '{sum}'")))?;
            let actual = checksum(payload);
            if actual != expected {
                return Err(TrackError::ParseError(format!(
                    "checksum {actual:02X} differs from {expected:02X}"
                )));
            }
            payload
        }
        None => body,
    };
    Ok(payload.split(',').collect())
}

/// `DDMM.mmmm` (or `DDDMM.mmmm`) and hemisphere to signed decimal degrees.
fn degrees(value: &str, hemisphere: &str) -> Result<f64, TrackError> {
    let bad = || TrackError::ParseError(format!("bad NMEA angle '{value}{hemisphere}'"));
    let raw: f64 = value.parse().map_err(|_| bad())?;
    let deg = (raw / 100.0).trunc();
    let angle = deg + (raw - deg * 100.0) / 60.0;
    match hemisphere {
        "N" | "E" => Ok(angle),
        "S" | "W" => Ok(-angle),
        _ => Err(bad()),
    }
}

/// `hhmmss.ss` to seconds of the day.
fn time_of_day(value: &str) -> Result<f64, TrackError> {
    let bad = || TrackError::ParseError(format!("bad NMEA time '{value}'"));
    if value.len() < 6 || !value.is_char_boundary(2) || !value.is_char_boundary(4) {
        return Err(bad());
    }
    let h: f64 = value[0..2].parse().map_err(|_| bad())?;
    let m: f64 = value[2..4].parse().map_err(|_| bad())?;
    let s: f64 = value[4..].parse().map_err(|_| bad())?;
    Ok(h * 3600.0 + m * 60.0 + s)
}

/// `ddmmyy` of an RMC frame, years counted from 2000.
fn date(value: &str) -> Result<GPSTime, TrackError> {
    GPSTime::parse_with(value, "2D2M2Y")
}

fn optional<T: std::str::FromStr>(value: Option<&&str>) -> Option<T> {
    value.and_then(|v| v.parse().ok())
}

struct Fix {
    lon: f64,
    lat: f64,
    alt: f64,
    seconds: f64,
    quality: GnssQuality,
}

fn gga(f: &[&str]) -> Result<Option<Fix>, TrackError> {
    if f.len() < 10 {
        return Err(TrackError::ParseError(format!("GGA frame of {} fields", f.len())));
    }
    if f[6].trim().is_empty() || f[6] == "0" {
        return Ok(None);
    }
    Ok(Some(Fix {
        seconds: time_of_day(f[1])?,
        lat: degrees(f[2], f[3])?,
        lon: degrees(f[4], f[5])?,
        alt: f[9].parse().unwrap_or(f64::NAN),
        quality: GnssQuality {
            nb_sats: optional(f.get(7)),
            hdop: optional(f.get(8)),
            ..GnssQuality::default()
        },
    }))
}

/// Sentence type of a `Gx???` talker, empty for anything else.
fn sentence_kind<'a>(f: &[&'a str]) -> &'a str {
    f.first()
        .filter(|t| t.len() == 5 && t.starts_with('G'))
        .and_then(|t| t.get(2..))
        .unwrap_or("")
}

/// Build a track from the text of an NMEA log.
pub fn parse_nmea(content: &str) -> Result<Track, TrackError> {
    let mut day = GPSTime::zero();
    let mut last_seconds = f64::NEG_INFINITY;
    let mut observations = Vec::new();
    let (mut alt, mut nb_sats, mut hdop) = (Vec::new(), Vec::new(), Vec::new());
    let mut skipped = 0usize;

    for (k, line) in content.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
        let line_no = k as u64 + 1;
        let f = fields(line).map_err(|e| at_line(line_no, e))?;
        match sentence_kind(&f) {
            "RMC" => {
                if let Some(d) = f.get(9) {
                    day = date(d).map_err(|e| at_line(line_no, e))?;
                    last_seconds = f64::NEG_INFINITY;
                }
            }
            "GGA" => match gga(&f).map_err(|e| at_line(line_no, e))? {
                Some(fix) => {
                    if fix.seconds < last_seconds {
                        day = day.add_day(1.0);
                    }
                    last_seconds = fix.seconds;
                    let t = day.add_sec(fix.seconds);
                    alt.push(fix.alt);
                    nb_sats.push(fix.quality.nb_sats.map_or(f64::NAN, f64::from));
                    hdop.push(fix.quality.hdop.unwrap_or(f64::NAN));
                    // a missing altitude reads as a zero height, the AF keeps the NaN
                    let hgt = if fix.alt.is_nan() { 0.0 } else { fix.alt };
                    observations.push(Observation::new(Coord::geo(fix.lon, fix.lat, hgt), t).with_gnss(fix.quality));
                }
                None => skipped += 1,
            },
            _ => {}
        }
    }
    if skipped > 0 {
        debug!("{skipped} GGA frames without fix skipped");
    }

    let mut track = Track::from_observations(observations);
    track.create_analytical_feature("alt", alt)?;
    track.create_analytical_feature("nb_sats", nb_sats)?;
    track.create_analytical_feature("hdop", hdop)?;
    Ok(track)
}

/// Read an NMEA log file as one track, named after the file.
pub fn read_nmea(path: &Utf8Path) -> Result<Track, TrackError> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_nmea(&content)?.with_ids(stem_of(path), ""))
}
