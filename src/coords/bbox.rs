use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in the components of a coordinate variant
/// (`x` = lon/E/X, `y` = lat/N/Y).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl BBox {
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
        BBox {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    /// Smallest box containing every `(x, y)` pair, `None` for an empty input.
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        points.into_iter().fold(None, |acc, (x, y)| {
            Some(match acc {
                None => BBox::new(x, x, y, y),
                Some(b) => BBox::new(b.xmin.min(x), b.xmax.max(x), b.ymin.min(y), b.ymax.max(y)),
            })
        })
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn center(&self) -> (f64, f64) {
        (
            0.5 * (self.xmin + self.xmax),
            0.5 * (self.ymin + self.ymax),
        )
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox::new(
            self.xmin.min(other.xmin),
            self.xmax.max(other.xmax),
            self.ymin.min(other.ymin),
            self.ymax.max(other.ymax),
        )
    }

    /// Inflate each side by `ratio` of the box extent (`0.05` → +5 % on both sides).
    pub fn add_margin(&self, ratio: f64) -> BBox {
        let dx = ratio * self.width();
        let dy = ratio * self.height();
        BBox::new(self.xmin - dx, self.xmax + dx, self.ymin - dy, self.ymax + dy)
    }
}
