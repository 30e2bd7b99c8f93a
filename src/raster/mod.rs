//! # Raster and analytical-feature maps
//!
//! A [`Raster`] owns named bands ([`AFMap`]) sharing one grid: a bounding box, pixel
//! sizes `(dx, dy)`, dimensions `(nrow, ncol)` and a no-data sentinel.
//!
//! Cells are addressed as `(i, j)` with `i` the row **from the top** (image convention)
//! and `j` the column from the left:
//!
//! ```text
//!            j →
//!        ┌────┬────┬────┐ ymax
//!   i  0 │    │    │    │
//!   ↓  1 │    │    │    │
//!        └────┴────┴────┘ ymin
//!      xmin             xmax
//! ```
//!
//! During summarization every band carries a per-cell accumulator, allocated on first
//! use and consumed by [`AFMap::aggregate`].
pub mod aggregator;

use log::debug;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::coords::bbox::BBox;
use crate::raster::aggregator::Aggregator;
use crate::settings::with_settings;
use crate::spatial_index::Grid;
use crate::track_errors::TrackError;

/// Default margin added around the bbox of a new raster.
pub const DEFAULT_MARGIN: f64 = 0.05;

/// Default number of cells along the widest side when no resolution is given.
pub const DEFAULT_CELLS: f64 = 100.0;

/// Side of the bbox kept fixed when the grid extent is rounded up to whole cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Alignment {
    #[default]
    LowerLeft,
    Center,
    UpperRight,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AFMap {
    pub name: String,
    grid: Grid,
    no_data: f64,
    values: DMatrix<f64>,
    accumulators: Option<Vec<Vec<f64>>>,
}

impl AFMap {
    fn check(&self, i: usize, j: usize) -> Result<(), TrackError> {
        if i >= self.grid.nrow {
            return Err(TrackError::OutOfRange {
                index: i,
                len: self.grid.nrow,
            });
        }
        if j >= self.grid.ncol {
            return Err(TrackError::OutOfRange {
                index: j,
                len: self.grid.ncol,
            });
        }
        Ok(())
    }

    pub fn nrow(&self) -> usize {
        self.grid.nrow
    }

    pub fn ncol(&self) -> usize {
        self.grid.ncol
    }

    pub fn no_data(&self) -> f64 {
        self.no_data
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn get(&self, i: usize, j: usize) -> Result<f64, TrackError> {
        self.check(i, j)?;
        Ok(self.values[(i, j)])
    }

    pub fn set(&mut self, i: usize, j: usize, value: f64) -> Result<(), TrackError> {
        self.check(i, j)?;
        self.values[(i, j)] = value;
        Ok(())
    }

    /// Cell `(i, j)` containing `(x, y)`, `None` outside the raster.
    pub fn get_cell(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        cell_of(&self.grid, x, y)
    }

    fn data(&self) -> impl Iterator<Item = f64> + '_ {
        let nd = self.no_data;
        self.values.iter().copied().filter(move |v| *v != nd && !v.is_nan())
    }

    /// Smallest data value, `None` when every cell is no-data.
    pub fn min(&self) -> Option<f64> {
        self.data().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.data().reduce(f64::max)
    }

    pub fn mean(&self) -> Option<f64> {
        let (s, n) = self.data().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        (n > 0).then(|| s / n as f64)
    }

    /// Number of cells holding data.
    pub fn count_data(&self) -> usize {
        self.data().count()
    }

    /// Push a value into the accumulator of cell `(i, j)`.
    pub fn accumulate(&mut self, i: usize, j: usize, value: f64) -> Result<(), TrackError> {
        self.check(i, j)?;
        let ncol = self.grid.ncol;
        let cells = self.grid.nrow * ncol;
        let acc = self.accumulators.get_or_insert_with(|| vec![Vec::new(); cells]);
        acc[i * ncol + j].push(value);
        Ok(())
    }

    /// Replace every cell by `aggregator` applied to its accumulator (no-data when the
    /// accumulator is empty) and release the accumulators.
    pub fn aggregate(&mut self, aggregator: Aggregator) {
        let acc = self.accumulators.take().unwrap_or_default();
        let ncol = self.grid.ncol;
        for i in 0..self.grid.nrow {
            for j in 0..ncol {
                let cell = acc.get(i * ncol + j).map(Vec::as_slice).unwrap_or(&[]);
                self.values[(i, j)] = aggregator.aggregate(cell).unwrap_or(self.no_data);
            }
        }
    }
}

fn cell_of(grid: &Grid, x: f64, y: f64) -> Option<(usize, usize)> {
    grid.cell_of(x, y).map(|(col, row)| (grid.nrow - 1 - row, col))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub grid: Grid,
    pub no_data: f64,
    bands: Vec<AFMap>,
}

impl Raster {
    /// Raster over `bbox` inflated by `margin` (default +5 %).
    ///
    /// Arguments
    /// ---------
    /// * `resolution` – cell size `(dx, dy)`; by default square cells splitting the
    ///   widest side in 100
    /// * `margin` – inflation ratio of the bbox, [`DEFAULT_MARGIN`] when `None`
    /// * `align` – side kept fixed when the extent is rounded up to whole cells
    ///
    /// Errors
    /// ------
    /// * [`TrackError::ConfigError`] on a non-positive resolution or a degenerate bbox
    pub fn new(
        bbox: BBox,
        resolution: Option<(f64, f64)>,
        margin: Option<f64>,
        align: Alignment,
    ) -> Result<Self, TrackError> {
        let inflated = bbox.add_margin(margin.unwrap_or(DEFAULT_MARGIN));
        let (dx, dy) = match resolution {
            Some(r) => r,
            None => {
                let side = inflated.width().max(inflated.height()) / DEFAULT_CELLS;
                if side <= 0.0 {
                    return Err(TrackError::ConfigError(
                        "cannot infer a resolution for a point-like bbox".into(),
                    ));
                }
                (side, side)
            }
        };
        let g = Grid::new(inflated, dx, dy)?;
        let (w, h) = (g.ncol as f64 * dx, g.nrow as f64 * dy);
        let (ew, eh) = (w - inflated.width(), h - inflated.height());
        let bbox = match align {
            Alignment::LowerLeft => BBox::new(inflated.xmin, inflated.xmin + w, inflated.ymin, inflated.ymin + h),
            Alignment::UpperRight => BBox::new(inflated.xmax - w, inflated.xmax, inflated.ymax - h, inflated.ymax),
            Alignment::Center => BBox::new(
                inflated.xmin - ew / 2.0,
                inflated.xmax + ew / 2.0,
                inflated.ymin - eh / 2.0,
                inflated.ymax + eh / 2.0,
            ),
        };
        debug!("raster {}×{} cells of {dx}×{dy}", g.nrow, g.ncol);
        Ok(Raster {
            grid: Grid { bbox, ..g },
            no_data: with_settings(|s| s.no_data),
            bands: Vec::new(),
        })
    }

    /// Raster on an existing grid, without margin.
    pub fn from_grid(grid: Grid, no_data: f64) -> Self {
        Raster {
            grid,
            no_data,
            bands: Vec::new(),
        }
    }

    pub fn nrow(&self) -> usize {
        self.grid.nrow
    }

    pub fn ncol(&self) -> usize {
        self.grid.ncol
    }

    /// Add a band filled with `values`, or with the no-data sentinel when `None`.
    ///
    /// Errors
    /// ------
    /// * [`TrackError::FeatureAlreadyExists`] when the name is taken,
    /// * [`TrackError::SizeError`] when `values` is not `nrow × ncol`
    pub fn add_af_map(&mut self, name: &str, values: Option<DMatrix<f64>>) -> Result<&mut AFMap, TrackError> {
        if self.bands.iter().any(|b| b.name == name) {
            return Err(TrackError::FeatureAlreadyExists(name.to_string()));
        }
        let (nrow, ncol) = (self.grid.nrow, self.grid.ncol);
        let values = match values {
            Some(v) if v.shape() != (nrow, ncol) => {
                return Err(TrackError::SizeError(format!(
                    "band {name} is {:?}, raster is {nrow}×{ncol}",
                    v.shape()
                )))
            }
            Some(v) => v,
            None => DMatrix::from_element(nrow, ncol, self.no_data),
        };
        self.bands.push(AFMap {
            name: name.to_string(),
            grid: self.grid,
            no_data: self.no_data,
            values,
            accumulators: None,
        });
        let last = self.bands.len() - 1;
        Ok(&mut self.bands[last])
    }

    pub fn get_af_map(&self, name: &str) -> Result<&AFMap, TrackError> {
        self.bands
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| TrackError::UnknownFeature(name.to_string()))
    }

    pub fn get_af_map_mut(&mut self, name: &str) -> Result<&mut AFMap, TrackError> {
        self.bands
            .iter_mut()
            .find(|b| b.name == name)
            .ok_or_else(|| TrackError::UnknownFeature(name.to_string()))
    }

    pub fn bands(&self) -> &[AFMap] {
        &self.bands
    }

    pub(crate) fn bands_mut(&mut self) -> &mut [AFMap] {
        &mut self.bands
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    /// Cell `(i, j)` containing `(x, y)`, `None` outside the raster.
    pub fn get_cell(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        cell_of(&self.grid, x, y)
    }

    /// Center of cell `(i, j)`.
    pub fn cell_center(&self, i: usize, j: usize) -> Result<(f64, f64), TrackError> {
        if i >= self.grid.nrow {
            return Err(TrackError::OutOfRange {
                index: i,
                len: self.grid.nrow,
            });
        }
        if j >= self.grid.ncol {
            return Err(TrackError::OutOfRange {
                index: j,
                len: self.grid.ncol,
            });
        }
        Ok(self.grid.cell_center(j, self.grid.nrow - 1 - i))
    }

    /// Raster of `ratio × ratio` blocks, each cell being the mean of the data cells of
    /// its block (no-data when the block holds none).
    ///
    /// Errors
    /// ------
    /// * [`TrackError::SizeError`] when `ratio` is zero or does not divide both
    ///   dimensions
    pub fn coarsen(&self, ratio: usize) -> Result<Raster, TrackError> {
        let (nrow, ncol) = (self.grid.nrow, self.grid.ncol);
        if ratio == 0 || nrow % ratio != 0 || ncol % ratio != 0 {
            return Err(TrackError::SizeError(format!(
                "coarsening ratio {ratio} does not divide {nrow}×{ncol}"
            )));
        }
        let grid = Grid {
            dx: self.grid.dx * ratio as f64,
            dy: self.grid.dy * ratio as f64,
            nrow: nrow / ratio,
            ncol: ncol / ratio,
            ..self.grid
        };
        let mut out = Raster::from_grid(grid, self.no_data);
        for band in &self.bands {
            let values = DMatrix::from_fn(grid.nrow, grid.ncol, |bi, bj| {
                let (s, n) = (0..ratio * ratio)
                    .map(|k| band.values[(bi * ratio + k / ratio, bj * ratio + k % ratio)])
                    .filter(|v| *v != self.no_data && !v.is_nan())
                    .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                if n == 0 {
                    self.no_data
                } else {
                    s / n as f64
                }
            });
            out.add_af_map(&band.name, Some(values))?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod raster_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn raster() -> Raster {
        Raster::new(BBox::new(0.0, 40.0, 0.0, 20.0), Some((10.0, 10.0)), Some(0.0), Alignment::LowerLeft).unwrap()
    }

    #[test]
    fn test_cells_are_numbered_from_the_top() {
        let r = raster();
        assert_eq!((r.nrow(), r.ncol()), (2, 4));
        assert_eq!(r.get_cell(1.0, 19.0), Some((0, 0)));
        assert_eq!(r.get_cell(1.0, 1.0), Some((1, 0)));
        assert_eq!(r.get_cell(39.0, 1.0), Some((1, 3)));
        assert_eq!(r.get_cell(41.0, 1.0), None);
        assert_eq!(r.cell_center(0, 1).unwrap(), (15.0, 15.0));
        assert!(r.cell_center(2, 0).is_err());
    }

    #[test]
    fn test_margin_and_alignment() {
        let bbox = BBox::new(0.0, 95.0, 0.0, 95.0);
        let ll = Raster::new(bbox, Some((10.0, 10.0)), None, Alignment::LowerLeft).unwrap();
        assert_abs_diff_eq!(ll.grid.bbox.xmin, -4.75, epsilon = 1e-12);
        assert_eq!(ll.ncol(), 11);
        assert_abs_diff_eq!(ll.grid.bbox.xmax, 105.25, epsilon = 1e-12);
        let ur = Raster::new(bbox, Some((10.0, 10.0)), None, Alignment::UpperRight).unwrap();
        assert_abs_diff_eq!(ur.grid.bbox.xmax, 99.75, epsilon = 1e-12);
        let c = Raster::new(bbox, Some((10.0, 10.0)), None, Alignment::Center).unwrap();
        assert_abs_diff_eq!(c.grid.bbox.center().0, 47.5, epsilon = 1e-12);
    }

    #[test]
    fn test_bands() {
        let mut r = raster();
        let band = r.add_af_map("speed", None).unwrap();
        assert_eq!(band.get(1, 3).unwrap(), band.no_data());
        r.get_af_map_mut("speed").unwrap().set(0, 0, 4.0).unwrap();
        r.get_af_map_mut("speed").unwrap().set(1, 1, 2.0).unwrap();
        let band = r.get_af_map("speed").unwrap();
        assert_eq!(band.min(), Some(2.0));
        assert_eq!(band.max(), Some(4.0));
        assert_eq!(band.mean(), Some(3.0));
        assert!(band.get(2, 0).is_err());
        assert!(matches!(r.add_af_map("speed", None), Err(TrackError::FeatureAlreadyExists(_))));
        assert!(matches!(
            r.add_af_map("bad", Some(DMatrix::zeros(3, 3))),
            Err(TrackError::SizeError(_))
        ));
        assert!(r.get_af_map("nope").is_err());
    }

    #[test]
    fn test_accumulate_then_aggregate() {
        let mut r = raster();
        let band = r.add_af_map("n", None).unwrap();
        band.accumulate(0, 1, 1.0).unwrap();
        band.accumulate(0, 1, 3.0).unwrap();
        band.aggregate(Aggregator::Avg);
        assert_eq!(band.get(0, 1).unwrap(), 2.0);
        assert_eq!(band.get(0, 0).unwrap(), band.no_data());
        assert_eq!(band.count_data(), 1);
    }

    #[test]
    fn test_coarsen() {
        let mut r = raster();
        let values = DMatrix::from_row_slice(2, 4, &[1.0, 3.0, -9999.0, 5.0, 2.0, 2.0, -9999.0, -9999.0]);
        r.add_af_map("v", Some(values)).unwrap();
        let c = r.coarsen(2).unwrap();
        assert_eq!((c.nrow(), c.ncol()), (1, 2));
        let v = c.get_af_map("v").unwrap();
        assert_eq!(v.get(0, 0).unwrap(), 2.0);
        assert_eq!(v.get(0, 1).unwrap(), 5.0);
        assert!(matches!(r.coarsen(3), Err(TrackError::SizeError(_))));
        assert!(matches!(r.coarsen(0), Err(TrackError::SizeError(_))));
    }
}
