//! # Tabular display for tracks
//!
//! [`TrackDisplay`] borrows a [`Track`] and renders it as a table when used with Rust
//! formatting (`{}`), without cloning observations.
//!
//! Two layouts are available:
//!
//! - **Compact** (fixed-width lines): `# | timestamp | x | y | z`
//! - **Features** (uses `comfy-table`): adds one column per AF
//!
//! `impl Display for Track` prints a one-line header followed by the compact table of
//! the first observations. [`Track::summary`] renders track-level measures and
//! per-AF statistics (min, max, mean, NaN count) with `comfy-table`.
//!
//! ```rust
//! use tracklib::track::{display::TrackDisplayExt, enu_track};
//!
//! let t = enu_track(&[(0., 0., 0.), (1., 0., 0.)], 1.0);
//! let s = format!("{}", t.show().with_features(true).head(10));
//! assert!(s.contains("timestamp"));
//! ```
use std::fmt;

use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Row, Table};

use crate::operator::reducer::nan_mean;
use crate::track::Track;

/// Number of observations printed by `Display for Track`.
const DEFAULT_HEAD: usize = 10;

pub struct TrackDisplay<'a> {
    track: &'a Track,
    features: bool,
    head: Option<usize>,
    precision: usize,
}

impl<'a> TrackDisplay<'a> {
    pub fn new(track: &'a Track) -> Self {
        TrackDisplay {
            track,
            features: false,
            head: None,
            precision: 3,
        }
    }

    /// Add one column per AF (comfy-table layout).
    pub fn with_features(mut self, yes: bool) -> Self {
        self.features = yes;
        self
    }

    /// Print only the first `n` observations.
    pub fn head(mut self, n: usize) -> Self {
        self.head = Some(n);
        self
    }

    /// Fixed-point digits of the coordinate columns.
    pub fn with_precision(mut self, p: usize) -> Self {
        self.precision = p;
        self
    }

    fn rows(&self) -> usize {
        self.head.map_or(self.track.size(), |n| n.min(self.track.size()))
    }

    fn write_compact(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.precision;
        writeln!(
            f,
            "{:>5}  {:>23}  {:>16}  {:>16}  {:>12}",
            "#", "timestamp", "x", "y", "z"
        )?;
        for (i, o) in self.track.iter().take(self.rows()).enumerate() {
            let (x, y, z) = o.position.components();
            writeln!(
                f,
                "{i:>5}  {:>23}  {x:>16.p$}  {y:>16.p$}  {z:>12.p$}",
                o.timestamp.to_string()
            )?;
        }
        Ok(())
    }

    fn render_features(&self) -> String {
        let p = self.precision;
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        let mut header = vec![
            Cell::new("#"),
            Cell::new("timestamp"),
            Cell::new("x"),
            Cell::new("y"),
            Cell::new("z"),
        ];
        header.extend(self.track.feature_names().iter().map(Cell::new));
        table.set_header(header);

        for (i, o) in self.track.iter().take(self.rows()).enumerate() {
            let (x, y, z) = o.position.components();
            let mut row = vec![
                Cell::new(i).set_alignment(CellAlignment::Right),
                Cell::new(o.timestamp.to_string()),
                Cell::new(format!("{x:.p$}")).set_alignment(CellAlignment::Right),
                Cell::new(format!("{y:.p$}")).set_alignment(CellAlignment::Right),
                Cell::new(format!("{z:.p$}")).set_alignment(CellAlignment::Right),
            ];
            row.extend(
                o.features
                    .iter()
                    .map(|v| Cell::new(v.to_string()).set_alignment(CellAlignment::Right)),
            );
            table.add_row(Row::from(row));
        }
        table.to_string()
    }
}

impl fmt::Display for TrackDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.features {
            writeln!(f, "{}", self.render_features())
        } else {
            self.write_compact(f)
        }
    }
}

pub trait TrackDisplayExt {
    fn show(&self) -> TrackDisplay<'_>;
}

impl TrackDisplayExt for Track {
    fn show(&self) -> TrackDisplay<'_> {
        TrackDisplay::new(self)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let srid = self
            .srid()
            .map_or_else(|_| "-".to_string(), |s| s.to_string());
        writeln!(
            f,
            "Track [uid={}, tid={}] {} observations, {srid}, {} features",
            self.uid,
            self.tid,
            self.size(),
            self.feature_names().len()
        )?;
        write!(f, "{}", self.show().head(DEFAULT_HEAD))?;
        if self.size() > DEFAULT_HEAD {
            writeln!(f, "  ... {} more", self.size() - DEFAULT_HEAD)?;
        }
        Ok(())
    }
}

impl Track {
    /// Track measures and AF statistics as a table.
    pub fn summary(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("feature"),
            Cell::new("min"),
            Cell::new("max"),
            Cell::new("mean"),
            Cell::new("NaN"),
        ]);

        let right = |s: String| Cell::new(s).set_alignment(CellAlignment::Right);
        for name in self.feature_names() {
            let Ok(values) = self.get_analytical_feature(name) else {
                continue;
            };
            let nan = values.iter().filter(|v| v.is_nan()).count();
            let finite = values.iter().copied().filter(|v| !v.is_nan());
            let min = finite.clone().fold(f64::INFINITY, f64::min);
            let max = finite.fold(f64::NEG_INFINITY, f64::max);
            let (min, max) = if nan == values.len() {
                (f64::NAN, f64::NAN)
            } else {
                (min, max)
            };
            table.add_row(Row::from(vec![
                Cell::new(name),
                right(format!("{min:.4}")),
                right(format!("{max:.4}")),
                right(format!("{:.4}", nan_mean(&values))),
                right(nan.to_string()),
            ]));
        }

        let length = self
            .length()
            .map_or_else(|e| format!("n/a ({e})"), |l| format!("{l:.3} m"));
        let bbox = self.bbox().map_or_else(
            |_| "-".to_string(),
            |b| format!("[{:.3}, {:.3}] x [{:.3}, {:.3}]", b.xmin, b.xmax, b.ymin, b.ymax),
        );
        let span = match (self.first_obs(), self.last_obs()) {
            (Ok(a), Ok(b)) => format!("{} → {}", a.timestamp, b.timestamp),
            _ => "-".to_string(),
        };
        format!(
            "Track [uid={}, tid={}]\n  observations : {}\n  time span    : {span}\n  duration     : {:.3} s\n  length       : {length}\n  bbox         : {bbox}\n{table}",
            self.uid,
            self.tid,
            self.size(),
            self.duration(),
        )
    }
}
