//! # Timestamp kernel
//!
//! [`GPSTime`] is a calendar timestamp `{year, month, day, hour, min, sec, ms, zone}`
//! with configurable parse/print layouts and a conversion to **absolute time**, the
//! number of seconds since `1970-01-01 00:00:00 UTC` (leap seconds ignored).
//! Calendar arithmetic is delegated to [`hifitime`].
//!
//! ## Layout tokens
//!
//! A layout is a string mixing literal characters and `<width><kind>` tokens:
//!
//! | Token            | Field                                                   |
//! |------------------|---------------------------------------------------------|
//! | `1Y` `2Y` `4Y`   | year (`2Y` is relative to 2000, `1Y` has free width)    |
//! | `1M` `2M`        | month                                                   |
//! | `1D` `2D`        | day                                                     |
//! | `1h` `2h`        | hour                                                    |
//! | `1m` `2m`        | minute                                                  |
//! | `1s` `2s`        | second                                                  |
//! | `1z` `2z` `3z`   | sub-second digits (tenths, hundredths, milliseconds)    |
//! | `1Z`             | zone suffix: `Z` for UTC, `±HH:00` otherwise            |
//! | `n*`             | skip `n` arbitrary characters (prints `n` blanks)       |
//!
//! Width `1` reads a free-width digit run and prints without padding; larger widths
//! read exactly that many digits and print zero-padded. Parsing never guesses: any
//! mismatch with the layout is a [`TrackError::ParseError`].
//!
//! ## Example
//!
//! ```rust
//! use tracklib::time::GPSTime;
//!
//! let t = GPSTime::parse_with("2018-01-01 10:00:00", "4Y-2M-2D 2h:2m:2s").unwrap();
//! let later = t.add_sec(3600.0);
//! assert_eq!(later.format_with("2D/2M/4Y 2h:2m:2s"), "01/01/2018 11:00:00");
//! assert_eq!(later - t, 3600.0);
//! ```
use hifitime::{Duration, Epoch};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, ops::Sub, str::FromStr};

use crate::constants::Seconds;
use crate::settings::with_settings;
use crate::track_errors::TrackError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GPSTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub min: u8,
    pub sec: u8,
    pub ms: u16,
    /// Offset to UTC in hours
    pub zone: i8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Literal(char),
    Field { width: usize, kind: char },
}

fn tokenize(layout: &str) -> Result<Vec<Token>, TrackError> {
    let chars: Vec<char> = layout.chars().collect();
    let mut tokens = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if let (Some(width), Some(&kind)) = (c.to_digit(10), chars.get(i + 1)) {
            if "YMDhmszZ*".contains(kind) {
                let width = width as usize;
                let valid = match kind {
                    'Y' => matches!(width, 1 | 2 | 4),
                    'M' | 'D' | 'h' | 'm' | 's' => matches!(width, 1 | 2),
                    'z' => (1..=3).contains(&width),
                    'Z' => width == 1,
                    _ => width > 0,
                };
                if !valid {
                    return Err(TrackError::ParseError(format!(
                        "invalid layout token '{width}{kind}' in '{layout}'"
                    )));
                }
                tokens.push(Token::Field { width, kind });
                i += 2;
                continue;
            }
        }
        tokens.push(Token::Literal(c));
        i += 1;
    }
    Ok(tokens)
}

impl GPSTime {
    /// Build and validate a UTC timestamp.
    pub fn new(
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        min: u8,
        sec: u8,
        ms: u16,
    ) -> Result<Self, TrackError> {
        let t = GPSTime {
            year,
            month,
            day,
            hour,
            min,
            sec,
            ms,
            zone: 0,
        };
        t.validate()?;
        Ok(t)
    }

    /// `1970-01-01 00:00:00`, the origin of absolute time.
    pub fn zero() -> Self {
        GPSTime {
            year: 1970,
            month: 1,
            day: 1,
            hour: 0,
            min: 0,
            sec: 0,
            ms: 0,
            zone: 0,
        }
    }

    /// Current system time (UTC).
    pub fn now() -> Self {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        GPSTime::read_unix_time(secs)
    }

    pub fn with_zone(mut self, zone: i8) -> Self {
        self.zone = zone;
        self
    }

    fn validate(&self) -> Result<(), TrackError> {
        Epoch::maybe_from_gregorian_utc(
            self.year, self.month, self.day, self.hour, self.min, self.sec, 0,
        )
        .map_err(|e| TrackError::ParseError(format!("invalid calendar date {self:?}: {e}")))?;
        if self.ms > 999 {
            return Err(TrackError::ParseError(format!(
                "invalid millisecond field {}",
                self.ms
            )));
        }
        Ok(())
    }

    fn epoch(&self) -> Epoch {
        Epoch::from_gregorian_utc(
            self.year,
            self.month,
            self.day,
            self.hour,
            self.min,
            self.sec,
            self.ms as u32 * 1_000_000,
        ) - Duration::from_seconds(self.zone as f64 * 3600.0)
    }

    fn from_epoch(epoch: Epoch, zone: i8) -> Self {
        let local = epoch.round(Duration::from_milliseconds(1.0))
            + Duration::from_seconds(zone as f64 * 3600.0);
        let (year, month, day, hour, min, sec, nanos) = local.to_gregorian_utc();
        GPSTime {
            year,
            month,
            day,
            hour,
            min,
            sec,
            ms: (nanos / 1_000_000) as u16,
            zone,
        }
    }

    /// Build a timestamp from UTC seconds since 1970-01-01.
    pub fn read_unix_time(seconds: Seconds) -> Self {
        GPSTime::from_epoch(Epoch::from_unix_seconds(seconds), 0)
    }

    /// Seconds since 1970-01-01 00:00:00 UTC.
    pub fn to_abs_time(&self) -> Seconds {
        self.epoch().to_unix_seconds()
    }

    pub fn add_sec(&self, seconds: Seconds) -> Self {
        GPSTime::from_epoch(self.epoch() + Duration::from_seconds(seconds), self.zone)
    }

    pub fn add_min(&self, minutes: f64) -> Self {
        self.add_sec(minutes * 60.0)
    }

    pub fn add_hour(&self, hours: f64) -> Self {
        self.add_sec(hours * 3600.0)
    }

    pub fn add_day(&self, days: f64) -> Self {
        self.add_sec(days * 86_400.0)
    }

    /// Snap to the nearest multiple of `unit` seconds of absolute time.
    pub fn round(&self, unit: Seconds) -> Self {
        if unit <= 0.0 {
            return *self;
        }
        let abs = self.to_abs_time();
        let snapped = (abs / unit).round() * unit;
        GPSTime::read_unix_time(snapped).with_zone(0).shift_zone(self.zone)
    }

    fn shift_zone(self, zone: i8) -> Self {
        GPSTime::from_epoch(self.epoch(), zone)
    }

    /// Parse with the thread's read format.
    pub fn parse(s: &str) -> Result<Self, TrackError> {
        let layout = with_settings(|st| st.read_format.clone());
        GPSTime::parse_with(s, &layout)
    }

    /// Parse `s` against an explicit layout.
    pub fn parse_with(s: &str, layout: &str) -> Result<Self, TrackError> {
        let tokens = tokenize(layout)?;
        let input: Vec<char> = s.chars().collect();
        let mut pos = 0;
        let mut t = GPSTime::zero();
        let mismatch = |what: &str| {
            TrackError::ParseError(format!("'{s}' does not match layout '{layout}': {what}"))
        };

        for token in tokens {
            match token {
                Token::Literal(c) => {
                    if input.get(pos) != Some(&c) {
                        return Err(mismatch(&format!("expected '{c}' at position {pos}")));
                    }
                    pos += 1;
                }
                Token::Field { width, kind: '*' } => {
                    if pos + width > input.len() {
                        return Err(mismatch("input too short"));
                    }
                    pos += width;
                }
                Token::Field { kind: 'Z', .. } => match input.get(pos) {
                    Some('Z') => {
                        t.zone = 0;
                        pos += 1;
                    }
                    Some(sign @ ('+' | '-')) => {
                        let sign = if *sign == '-' { -1 } else { 1 };
                        let digits: String = input.iter().skip(pos + 1).take(2).collect();
                        if digits.len() != 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
                            return Err(mismatch("invalid zone"));
                        }
                        t.zone = sign * digits.parse::<i8>().map_err(|_| mismatch("zone"))?;
                        pos += 3;
                        // optional ":MM"
                        if input.get(pos) == Some(&':') {
                            pos += 3;
                        }
                    }
                    _ => return Err(mismatch("expected zone suffix")),
                },
                Token::Field { width, kind } => {
                    let start = pos;
                    if width == 1 && kind != 'z' {
                        while pos < input.len() && input[pos].is_ascii_digit() {
                            pos += 1;
                        }
                    } else {
                        pos += width;
                    }
                    if pos > input.len() || pos == start {
                        return Err(mismatch(&format!("missing field '{width}{kind}'")));
                    }
                    let digits: String = input[start..pos].iter().collect();
                    if !digits.chars().all(|c| c.is_ascii_digit()) {
                        return Err(mismatch(&format!("'{digits}' is not numeric")));
                    }
                    let value: i64 = digits.parse().map_err(|_| mismatch("number"))?;
                    let out_of_range = || mismatch(&format!("'{digits}' out of range for '{width}{kind}'"));
                    let small = || u8::try_from(value).map_err(|_| out_of_range());
                    match kind {
                        'Y' => {
                            let year = i32::try_from(value).map_err(|_| out_of_range())?;
                            t.year = if width == 2 { 2000 + year } else { year };
                        }
                        'M' => t.month = small()?,
                        'D' => t.day = small()?,
                        'h' => t.hour = small()?,
                        'm' => t.min = small()?,
                        's' => t.sec = small()?,
                        'z' => {
                            t.ms = u16::try_from(value * 10i64.pow(3 - width as u32))
                                .map_err(|_| out_of_range())?
                        }
                        _ => unreachable!("token kinds are validated by tokenize"),
                    }
                }
            }
        }
        if pos != input.len() {
            return Err(mismatch("trailing characters"));
        }
        t.validate()?;
        Ok(t)
    }

    /// Print with an explicit layout.
    pub fn format_with(&self, layout: &str) -> String {
        let Ok(tokens) = tokenize(layout) else {
            return layout.to_string();
        };
        let mut out = String::with_capacity(layout.len() + 4);
        for token in tokens {
            match token {
                Token::Literal(c) => out.push(c),
                Token::Field { width, kind: '*' } => out.push_str(&" ".repeat(width)),
                Token::Field { kind: 'Z', .. } => {
                    if self.zone == 0 {
                        out.push('Z');
                    } else {
                        let sign = if self.zone < 0 { '-' } else { '+' };
                        out.push_str(&format!("{sign}{:02}:00", self.zone.unsigned_abs()));
                    }
                }
                Token::Field { width, kind } => {
                    let value: i64 = match kind {
                        'Y' if width == 2 => (self.year - 2000).rem_euclid(100) as i64,
                        'Y' => self.year as i64,
                        'M' => self.month as i64,
                        'D' => self.day as i64,
                        'h' => self.hour as i64,
                        'm' => self.min as i64,
                        's' => self.sec as i64,
                        'z' => self.ms as i64 / 10i64.pow(3 - width as u32),
                        _ => 0,
                    };
                    if width == 1 && kind != 'z' {
                        out.push_str(&value.to_string());
                    } else {
                        out.push_str(&format!("{value:0width$}"));
                    }
                }
            }
        }
        out
    }

    /// UTC fields, so that comparisons follow absolute time whatever the zones.
    fn key(&self) -> (i32, u8, u8, u8, u8, u8, u16) {
        let u = if self.zone == 0 { *self } else { self.shift_zone(0) };
        (u.year, u.month, u.day, u.hour, u.min, u.sec, u.ms)
    }
}

impl PartialEq for GPSTime {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for GPSTime {}

impl PartialOrd for GPSTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GPSTime {
    /// Chronological order of the instants, zones included.
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl Sub for GPSTime {
    type Output = Seconds;

    fn sub(self, rhs: Self) -> Seconds {
        self.to_abs_time() - rhs.to_abs_time()
    }
}

impl fmt::Display for GPSTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = with_settings(|s| s.print_format.clone());
        write!(f, "{}", self.format_with(&layout))
    }
}

impl FromStr for GPSTime {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GPSTime::parse(s)
    }
}
