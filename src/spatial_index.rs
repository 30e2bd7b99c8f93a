//! # Grid spatial index
//!
//! A [`SpatialIndex`] covers a bounding box with a regular grid of `ncol × nrow` cells of
//! size `dx × dy`. Every segment `(segment, member)` of the indexed polylines (tracks of a
//! [`TrackCollection`](crate::collection::TrackCollection) or edges of a
//! [`Network`](crate::network::Network)) is registered in each cell its grid traversal
//! visits.
//!
//! Cells are addressed as `(i, j)`: `i` is the column from the left (x axis), `j` the row
//! from the bottom (y axis).
//!
//! ## Queries
//!
//! | Method                          | Result                                                |
//! |---------------------------------|-------------------------------------------------------|
//! | [`SpatialIndex::request_cell`]   | references stored in one cell                         |
//! | [`SpatialIndex::request_point`]  | references of the cell containing a point             |
//! | [`SpatialIndex::request_segment`]| union over the cells crossed by a segment             |
//! | [`SpatialIndex::request_track`]  | union over all segments of a track                    |
//! | [`SpatialIndex::neighborhood`]   | union over a square ring of cells around a point      |
//!
//! Unions are returned sorted by `(member, segment)` without duplicates.
use std::collections::BTreeSet;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::coords::bbox::BBox;
use crate::geometry::Pt;
use crate::progress_bar::Progress;
use crate::track::Track;
use crate::track_errors::TrackError;

/// Reference to segment `segment` (between vertices `segment` and `segment + 1`) of
/// polyline `member`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentRef {
    pub member: usize,
    pub segment: usize,
}

/// Anything made of indexable polylines.
pub trait Indexable {
    /// Polylines in a stable order; the position is the `member` of [`SegmentRef`].
    fn polylines(&self) -> Vec<Vec<Pt>>;

    /// Planar extent of all the polylines.
    fn extent(&self) -> Result<BBox, TrackError>;
}

/// Regular grid over a bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub bbox: BBox,
    pub dx: f64,
    pub dy: f64,
    pub ncol: usize,
    pub nrow: usize,
}

impl Grid {
    /// Grid of `dx × dy` cells covering `bbox` (at least one cell per axis).
    ///
    /// Errors
    /// ------
    /// * [`TrackError::ConfigError`] when a cell size is not strictly positive
    pub fn new(bbox: BBox, dx: f64, dy: f64) -> Result<Self, TrackError> {
        if !(dx > 0.0 && dy > 0.0) {
            return Err(TrackError::ConfigError(format!(
                "grid cell size must be positive, got ({dx}, {dy})"
            )));
        }
        let ncol = ((bbox.width() / dx).ceil() as usize).max(1);
        let nrow = ((bbox.height() / dy).ceil() as usize).max(1);
        Ok(Grid {
            bbox,
            dx,
            dy,
            ncol,
            nrow,
        })
    }

    /// Grid with explicit dimensions.
    ///
    /// Errors
    /// ------
    /// * [`TrackError::ConfigError`] when `ncol` or `nrow` differs from the extent
    ///   divided by the cell size by more than one unit
    pub fn with_dims(bbox: BBox, dx: f64, dy: f64, ncol: usize, nrow: usize) -> Result<Self, TrackError> {
        let grid = Grid::new(bbox, dx, dy)?;
        let (ex, ey) = (bbox.width() / dx, bbox.height() / dy);
        if (ncol as f64 - ex).abs() > 1.0 || (nrow as f64 - ey).abs() > 1.0 {
            return Err(TrackError::ConfigError(format!(
                "grid dimensions {ncol}×{nrow} do not match extent {ex:.2}×{ey:.2} cells"
            )));
        }
        Ok(Grid { ncol, nrow, ..grid })
    }

    /// Floating-point cell coordinates of a point.
    pub fn continuous_cell(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.bbox.xmin) / self.dx, (y - self.bbox.ymin) / self.dy)
    }

    /// Cell `(i, j)` containing `(x, y)`, `None` outside the box.
    pub fn cell_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if !self.bbox.contains(x, y) {
            return None;
        }
        let (cx, cy) = self.continuous_cell(x, y);
        Some(self.clamp(cx.floor() as i64, cy.floor() as i64))
    }

    fn clamp(&self, i: i64, j: i64) -> (usize, usize) {
        (
            i.clamp(0, self.ncol as i64 - 1) as usize,
            j.clamp(0, self.nrow as i64 - 1) as usize,
        )
    }

    /// Cells visited by the segment `a → b`, in traversal order.
    ///
    /// The walk starts in the cell of `a` and steps to the neighbouring cell whose
    /// boundary the segment crosses first, until the cell of `b` is reached.
    pub fn traverse(&self, a: (f64, f64), b: (f64, f64)) -> Vec<(usize, usize)> {
        let (x0, y0) = self.continuous_cell(a.0, a.1);
        let (x1, y1) = self.continuous_cell(b.0, b.1);
        let (mut i, mut j) = self.clamp(x0.floor() as i64, y0.floor() as i64);
        let (i1, j1) = self.clamp(x1.floor() as i64, y1.floor() as i64);

        let (vx, vy) = (x1 - x0, y1 - y0);
        let step_i: i64 = if vx > 0.0 { 1 } else { -1 };
        let step_j: i64 = if vy > 0.0 { 1 } else { -1 };
        let next_boundary = |c: f64, v: f64, cell: usize| {
            if v > 0.0 {
                (cell as f64 + 1.0 - c) / v
            } else if v < 0.0 {
                (cell as f64 - c) / v
            } else {
                f64::INFINITY
            }
        };
        let mut t_max_x = next_boundary(x0, vx, i);
        let mut t_max_y = next_boundary(y0, vy, j);
        let t_delta_x = if vx != 0.0 { 1.0 / vx.abs() } else { f64::INFINITY };
        let t_delta_y = if vy != 0.0 { 1.0 / vy.abs() } else { f64::INFINITY };

        let mut cells = vec![(i, j)];
        let budget = i.abs_diff(i1) + j.abs_diff(j1);
        for _ in 0..budget {
            if (i, j) == (i1, j1) {
                break;
            }
            if (t_max_x < t_max_y && i != i1) || j == j1 {
                t_max_x += t_delta_x;
                (i, j) = self.clamp(i as i64 + step_i, j as i64);
            } else {
                t_max_y += t_delta_y;
                (i, j) = self.clamp(i as i64, j as i64 + step_j);
            }
            cells.push((i, j));
        }
        cells
    }

    /// Center of cell `(i, j)`.
    pub fn cell_center(&self, i: usize, j: usize) -> (f64, f64) {
        (
            self.bbox.xmin + (i as f64 + 0.5) * self.dx,
            self.bbox.ymin + (j as f64 + 0.5) * self.dy,
        )
    }
}

/// Grid of segment references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialIndex {
    pub grid: Grid,
    cells: Vec<Vec<SegmentRef>>,
}

impl SpatialIndex {
    /// Index every segment of `source` on a grid of `resolution = (dx, dy)` cells over
    /// its extent inflated by `margin` (ratio, e.g. `0.05`).
    ///
    /// Errors
    /// ------
    /// * [`TrackError::ConfigError`] on a non-positive resolution,
    /// * [`TrackError::EmptyTrack`] when the source has no point
    pub fn new(source: &impl Indexable, resolution: (f64, f64), margin: f64) -> Result<Self, TrackError> {
        let bbox = source.extent()?.add_margin(margin);
        let mut index = SpatialIndex::empty(Grid::new(bbox, resolution.0, resolution.1)?);
        let polylines = source.polylines();
        let mut progress = Progress::new("spatial index", polylines.len());
        for (member, line) in polylines.iter().enumerate() {
            index.insert_polyline(member, line);
            progress.tick();
        }
        progress.finish();
        debug!(
            "spatial index {}×{} built over {} members",
            index.grid.ncol,
            index.grid.nrow,
            polylines.len()
        );
        Ok(index)
    }

    pub fn empty(grid: Grid) -> Self {
        SpatialIndex {
            cells: vec![Vec::new(); grid.ncol * grid.nrow],
            grid,
        }
    }

    fn slot(&self, i: usize, j: usize) -> usize {
        j * self.grid.ncol + i
    }

    /// Register every segment of `line` as belonging to `member`.
    pub fn insert_polyline(&mut self, member: usize, line: &[Pt]) {
        if line.len() == 1 {
            if let Some((i, j)) = self.grid.cell_of(line[0].x, line[0].y) {
                let k = self.slot(i, j);
                self.cells[k].push(SegmentRef { member, segment: 0 });
            }
        }
        for (segment, w) in line.windows(2).enumerate() {
            for (i, j) in self.grid.traverse((w[0].x, w[0].y), (w[1].x, w[1].y)) {
                let r = SegmentRef { member, segment };
                let k = self.slot(i, j);
                if self.cells[k].last() != Some(&r) {
                    self.cells[k].push(r);
                }
            }
        }
    }

    /// References stored in cell `(i, j)`.
    pub fn request_cell(&self, i: usize, j: usize) -> Result<&[SegmentRef], TrackError> {
        if i >= self.grid.ncol {
            return Err(TrackError::OutOfRange {
                index: i,
                len: self.grid.ncol,
            });
        }
        if j >= self.grid.nrow {
            return Err(TrackError::OutOfRange {
                index: j,
                len: self.grid.nrow,
            });
        }
        Ok(&self.cells[self.slot(i, j)])
    }

    /// References of the cell containing `(x, y)`; empty (with a warning) outside the grid.
    pub fn request_point(&self, x: f64, y: f64) -> Vec<SegmentRef> {
        match self.grid.cell_of(x, y) {
            Some((i, j)) => self.cells[self.slot(i, j)].clone(),
            None => {
                warn!("point ({x}, {y}) is outside of the spatial index bounding box");
                Vec::new()
            }
        }
    }

    pub fn request_segment(&self, a: (f64, f64), b: (f64, f64)) -> Vec<SegmentRef> {
        self.union(self.grid.traverse(a, b))
    }

    pub fn request_track(&self, track: &Track) -> Vec<SegmentRef> {
        let points = track.planar_points();
        if points.len() == 1 {
            return self.request_point(points[0].x, points[0].y);
        }
        let cells = points
            .windows(2)
            .flat_map(|w| self.grid.traverse((w[0].x, w[0].y), (w[1].x, w[1].y)));
        self.union(cells)
    }

    /// Cells within Chebyshev distance `k` of `anchor`'s cell.
    pub fn ring_cells(&self, anchor: (usize, usize), k: usize) -> Vec<(usize, usize)> {
        let (ci, cj) = anchor;
        let imin = ci.saturating_sub(k);
        let jmin = cj.saturating_sub(k);
        let imax = (ci + k).min(self.grid.ncol - 1);
        let jmax = (cj + k).min(self.grid.nrow - 1);
        (jmin..=jmax)
            .flat_map(|j| (imin..=imax).map(move |i| (i, j)))
            .collect()
    }

    /// References within `unit` rings of cells around `(x, y)`.
    ///
    /// With `unit = -1` the ring grows until it holds at least one reference, then one
    /// extra ring is added so that the nearest segment is not missed across a cell
    /// border. Outside the grid the result is empty (with a warning).
    pub fn neighborhood(&self, x: f64, y: f64, unit: i64) -> Vec<SegmentRef> {
        let Some(anchor) = self.grid.cell_of(x, y) else {
            warn!("point ({x}, {y}) is outside of the spatial index bounding box");
            return Vec::new();
        };
        if unit >= 0 {
            return self.union(self.ring_cells(anchor, unit as usize));
        }
        let max_k = self.grid.ncol.max(self.grid.nrow);
        let mut k = 0;
        while k <= max_k {
            if !self.union(self.ring_cells(anchor, k)).is_empty() {
                break;
            }
            k += 1;
        }
        self.union(self.ring_cells(anchor, k + 1))
    }

    fn union(&self, cells: impl IntoIterator<Item = (usize, usize)>) -> Vec<SegmentRef> {
        let set: BTreeSet<SegmentRef> = cells
            .into_iter()
            .flat_map(|(i, j)| self.cells[self.slot(i, j)].iter().copied())
            .collect();
        set.into_iter().collect()
    }

    /// Number of stored references (a segment counts once per cell).
    pub fn len(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod spatial_index_test {
    use super::*;

    struct Lines(Vec<Vec<Pt>>);

    impl Indexable for Lines {
        fn polylines(&self) -> Vec<Vec<Pt>> {
            self.0.clone()
        }

        fn extent(&self) -> Result<BBox, TrackError> {
            BBox::from_points(self.0.iter().flatten().map(|p| (p.x, p.y))).ok_or(TrackError::EmptyTrack)
        }
    }

    fn grid10() -> Grid {
        Grid::new(BBox::new(0.0, 10.0, 0.0, 10.0), 1.0, 1.0).unwrap()
    }

    #[test]
    fn test_grid_dimensions() {
        let g = Grid::new(BBox::new(0.0, 10.0, 0.0, 4.5), 2.0, 2.0).unwrap();
        assert_eq!((g.ncol, g.nrow), (5, 3));
        assert!(Grid::with_dims(g.bbox, 2.0, 2.0, 6, 3).is_ok());
        assert!(matches!(
            Grid::with_dims(g.bbox, 2.0, 2.0, 8, 3),
            Err(TrackError::ConfigError(_))
        ));
        assert!(Grid::new(g.bbox, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_traverse_horizontal_and_diagonal() {
        let g = grid10();
        assert_eq!(
            g.traverse((0.5, 0.5), (3.5, 0.5)),
            vec![(0, 0), (1, 0), (2, 0), (3, 0)]
        );
        let cells = g.traverse((0.5, 0.2), (2.5, 1.2));
        assert_eq!(cells.first(), Some(&(0, 0)));
        assert_eq!(cells.last(), Some(&(2, 1)));
        // 4-connected walk
        for w in cells.windows(2) {
            assert_eq!(w[0].0.abs_diff(w[1].0) + w[0].1.abs_diff(w[1].1), 1);
        }
        assert_eq!(g.traverse((9.5, 9.5), (0.5, 9.5)).len(), 10);
    }

    #[test]
    fn test_requests() {
        let lines = Lines(vec![
            vec![Pt::new(0.0, 0.0), Pt::new(10.0, 0.0)],
            vec![Pt::new(0.0, 10.0), Pt::new(5.0, 10.0), Pt::new(5.0, 5.0)],
        ]);
        let index = SpatialIndex::new(&lines, (1.0, 1.0), 0.0).unwrap();
        assert_eq!(index.grid.ncol, 10);
        assert_eq!(index.request_cell(3, 0).unwrap(), &[SegmentRef { member: 0, segment: 0 }]);
        assert!(index.request_cell(10, 0).is_err());
        assert_eq!(index.request_point(2.5, 0.5), vec![SegmentRef { member: 0, segment: 0 }]);
        assert!(index.request_point(20.0, 0.5).is_empty());
        let hits = index.request_segment((5.5, 9.5), (5.5, 0.5));
        assert!(hits.contains(&SegmentRef { member: 0, segment: 0 }));
        assert!(hits.contains(&SegmentRef { member: 1, segment: 1 }));
    }

    #[test]
    fn test_neighborhood_expands() {
        let lines = Lines(vec![vec![Pt::new(0.0, 0.0), Pt::new(0.0, 10.0)]]);
        let mut index = SpatialIndex::empty(grid10());
        index.insert_polyline(0, &lines.0[0]);
        assert!(index.neighborhood(8.5, 5.5, 1).is_empty());
        assert_eq!(
            index.neighborhood(8.5, 5.5, -1),
            vec![SegmentRef { member: 0, segment: 0 }]
        );
        assert_eq!(index.ring_cells((0, 0), 1).len(), 4);
        assert_eq!(index.ring_cells((5, 5), 1).len(), 9);
    }
}
