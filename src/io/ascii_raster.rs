//! ESRI ASCII grids.
//!
//! ```text
//! ncols        4
//! nrows        3
//! xllcorner    0.0
//! yllcorner    0.0
//! cellsize     10.0
//! NODATA_value -9999
//! 1 2 3 4
//! ...
//! ```
//!
//! Header keys are case-insensitive. `xllcenter` / `yllcenter` are accepted, and
//! rectangular cells use `dx` / `dy` instead of `cellsize`. Rows are written from the
//! top, which is also the row order of [`AFMap`](crate::raster::AFMap).
use std::fmt::Write as _;

use camino::Utf8Path;
use itertools::Itertools;
use nalgebra::DMatrix;

use crate::coords::bbox::BBox;
use crate::raster::Raster;
use crate::settings::with_settings;
use crate::spatial_index::Grid;
use crate::track_errors::TrackError;

#[derive(Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<(f64, bool)>,
    yll: Option<(f64, bool)>,
    dx: Option<f64>,
    dy: Option<f64>,
    no_data: Option<f64>,
}

fn parse_header_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, TrackError> {
    value
        .parse()
        .map_err(|_| TrackError::ParseError(format!("bad value '{value}' for header '{key}'")))
}

/// Parse an ASCII grid into a one-band raster.
pub fn parse_ascii_raster(content: &str, band: &str) -> Result<Raster, TrackError> {
    let mut header = Header::default();
    let mut lines = content.lines().filter(|l| !l.trim().is_empty()).peekable();

    while let Some(line) = lines.peek() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            break;
        };
        let key_lc = key.to_ascii_lowercase();
        match key_lc.as_str() {
            "ncols" => header.ncols = Some(parse_header_value(key, value)?),
            "nrows" => header.nrows = Some(parse_header_value(key, value)?),
            "xllcorner" => header.xll = Some((parse_header_value(key, value)?, false)),
            "yllcorner" => header.yll = Some((parse_header_value(key, value)?, false)),
            "xllcenter" => header.xll = Some((parse_header_value(key, value)?, true)),
            "yllcenter" => header.yll = Some((parse_header_value(key, value)?, true)),
            "cellsize" => {
                let size = parse_header_value(key, value)?;
                header.dx = Some(size);
                header.dy = Some(size);
            }
            "dx" => header.dx = Some(parse_header_value(key, value)?),
            "dy" => header.dy = Some(parse_header_value(key, value)?),
            "nodata_value" => header.no_data = Some(parse_header_value(key, value)?),
            _ => break,
        }
        lines.next();
    }

    let missing = |k: &str| TrackError::ParseError(format!("ASCII grid without '{k}' header"));
    let ncol = header.ncols.ok_or_else(|| missing("ncols"))?;
    let nrow = header.nrows.ok_or_else(|| missing("nrows"))?;
    let dx = header.dx.ok_or_else(|| missing("cellsize"))?;
    let dy = header.dy.ok_or_else(|| missing("cellsize"))?;
    let (xll, x_center) = header.xll.ok_or_else(|| missing("xllcorner"))?;
    let (yll, y_center) = header.yll.ok_or_else(|| missing("yllcorner"))?;
    let xmin = if x_center { xll - dx / 2.0 } else { xll };
    let ymin = if y_center { yll - dy / 2.0 } else { yll };
    let no_data = header.no_data.unwrap_or_else(|| with_settings(|s| s.no_data));

    let values = lines
        .flat_map(str::split_whitespace)
        .map(|v| parse_header_value::<f64>("data", v))
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() != nrow * ncol {
        return Err(TrackError::SizeError(format!(
            "{} values for a {nrow}×{ncol} grid",
            values.len()
        )));
    }

    let bbox = BBox::new(xmin, xmin + ncol as f64 * dx, ymin, ymin + nrow as f64 * dy);
    let grid = Grid::with_dims(bbox, dx, dy, ncol, nrow)?;
    let mut raster = Raster::from_grid(grid, no_data);
    raster.add_af_map(band, Some(DMatrix::from_row_slice(nrow, ncol, &values)))?;
    Ok(raster)
}

/// Read an ASCII grid file into a raster holding one band named `band`.
pub fn read_ascii_raster(path: &Utf8Path, band: &str) -> Result<Raster, TrackError> {
    parse_ascii_raster(&std::fs::read_to_string(path)?, band)
}

/// Render one band as an ASCII grid.
pub fn to_ascii_raster_string(raster: &Raster, band: &str) -> Result<String, TrackError> {
    let map = raster.get_af_map(band)?;
    let g = &raster.grid;
    let mut out = String::new();
    let _ = writeln!(out, "ncols {}", g.ncol);
    let _ = writeln!(out, "nrows {}", g.nrow);
    let _ = writeln!(out, "xllcorner {}", g.bbox.xmin);
    let _ = writeln!(out, "yllcorner {}", g.bbox.ymin);
    if g.dx == g.dy {
        let _ = writeln!(out, "cellsize {}", g.dx);
    } else {
        let _ = writeln!(out, "dx {}\ndy {}", g.dx, g.dy);
    }
    let _ = writeln!(out, "NODATA_value {}", map.no_data());
    for row in map.values().row_iter() {
        let line = row
            .iter()
            .map(|v| if v.is_nan() { map.no_data() } else { *v })
            .join(" ");
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

pub fn write_ascii_raster(raster: &Raster, band: &str, path: &Utf8Path) -> Result<(), TrackError> {
    std::fs::write(path, to_ascii_raster_string(raster, band)?)?;
    Ok(())
}

#[cfg(test)]
mod ascii_raster_test {
    use super::*;

    const GRID: &str = "\
NCOLS 3
nrows 2
XLLCORNER 100.0
yllcorner 200
CellSize 10
nodata_value -1
1 2 3
4 -1 6
";

    #[test]
    fn test_read() {
        let r = parse_ascii_raster(GRID, "h").unwrap();
        assert_eq!((r.nrow(), r.ncol()), (2, 3));
        assert_eq!(r.no_data, -1.0);
        let band = r.get_af_map("h").unwrap();
        assert_eq!(band.get(0, 2).unwrap(), 3.0);
        assert_eq!(band.count_data(), 5);
        // top-left cell spans x ∈ [100, 110], y ∈ [210, 220]
        assert_eq!(r.get_cell(105.0, 215.0), Some((0, 0)));
        assert_eq!(r.cell_center(1, 2).unwrap(), (125.0, 205.0));
    }

    #[test]
    fn test_write_back() {
        let r = parse_ascii_raster(GRID, "h").unwrap();
        let text = to_ascii_raster_string(&r, "h").unwrap();
        assert!(text.starts_with("ncols 3\nnrows 2\nxllcorner 100\nyllcorner 200\ncellsize 10\n"));
        assert_eq!(parse_ascii_raster(&text, "h").unwrap(), r);
        assert!(matches!(to_ascii_raster_string(&r, "nope"), Err(TrackError::UnknownFeature(_))));
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            parse_ascii_raster("ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2 3\n", "h"),
            Err(TrackError::SizeError(_))
        ));
        assert!(matches!(
            parse_ascii_raster("ncols 2\nxllcorner 0\n1 2\n", "h"),
            Err(TrackError::ParseError(_))
        ));
    }
}
