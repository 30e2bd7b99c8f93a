//! # Planar geometry utilities
//!
//! Algorithms on `(x, y)` points ([`nalgebra::Point2`]) used by the track, network and
//! spatial index layers.
//!
//! | Function                          | Algorithm                                        |
//! |-----------------------------------|--------------------------------------------------|
//! | [`proj_point_on_segment`]         | orthogonal projection clamped to the endpoints   |
//! | [`proj_on_polyline`]              | all segments within `ε` of the minimum distance  |
//! | [`detect_side`]                   | side of each projection candidate                |
//! | [`convex_hull`]                   | Jarvis march, `O(n·h)`                           |
//! | [`minimum_enclosing_circle`]      | Welzl, randomized, recursive                     |
//! | [`segment_intersection`]          | parametric line intersection                     |
//! | [`point_in_polygon`]              | crossing number                                  |
//! | [`triangle_area`]                 | signed cross product                             |
//!
//! Sides follow the orientation of the segment: `+1` on the left, `-1` on the right,
//! `0` on the supporting line.
pub mod simplification;

use nalgebra::Point2;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::settings::with_settings;
use crate::track_errors::TrackError;

pub type Pt = Point2<f64>;

/// Closest point of a segment to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    pub point: Pt,
    /// Distance from the query point to `point`
    pub distance: f64,
    /// Position of `point` along the segment, in `[0, 1]`
    pub t: f64,
    /// `+1` left, `-1` right, `0` aligned
    pub side: i8,
}

/// Projection candidate on a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolylineProjection {
    pub segment: usize,
    pub projection: SegmentProjection,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: (f64, f64),
    pub radius: f64,
}

impl Circle {
    pub fn contains(&self, p: &Pt) -> bool {
        let d = ((p.x - self.center.0).powi(2) + (p.y - self.center.1).powi(2)).sqrt();
        d <= self.radius * (1.0 + 1e-10) + 1e-12
    }
}

fn cross(o: &Pt, a: &Pt, b: &Pt) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn side_of(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// Half of the cross product: positive for counter-clockwise triangles.
pub fn triangle_area(a: &Pt, b: &Pt, c: &Pt) -> f64 {
    0.5 * cross(a, b, c)
}

/// Signed area of a simple polygon (shoelace formula).
pub fn polygon_area(polygon: &[Pt]) -> f64 {
    let n = polygon.len();
    (0..n)
        .map(|i| {
            let (a, b) = (&polygon[i], &polygon[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        * 0.5
}

/// Project `p` on segment `[a, b]`.
pub fn proj_point_on_segment(p: &Pt, a: &Pt, b: &Pt) -> SegmentProjection {
    let ab = b - a;
    let len2 = ab.norm_squared();
    let t = if len2 == 0.0 {
        0.0
    } else {
        ((p - a).dot(&ab) / len2).clamp(0.0, 1.0)
    };
    let point = a + ab * t;
    SegmentProjection {
        point,
        distance: (p - point).norm(),
        t,
        side: side_of(cross(a, b, p)),
    }
}

/// Project `p` on every segment of `polyline` and keep each candidate whose distance
/// is within `eps` of the minimum.
///
/// A point equidistant from two successive segments (e.g. facing a vertex) therefore
/// yields two candidates.
pub fn proj_on_polyline(p: &Pt, polyline: &[Pt], eps: f64) -> Vec<PolylineProjection> {
    let all: Vec<PolylineProjection> = polyline
        .windows(2)
        .enumerate()
        .map(|(segment, w)| PolylineProjection {
            segment,
            projection: proj_point_on_segment(p, &w[0], &w[1]),
        })
        .collect();
    let Some(dmin) = all
        .iter()
        .map(|c| c.projection.distance)
        .min_by(|a, b| a.total_cmp(b))
    else {
        return Vec::new();
    };
    all.into_iter()
        .filter(|c| c.projection.distance <= dmin + eps)
        .collect()
}

/// Side of `p` relative to each nearest segment of `polyline`.
pub fn detect_side(p: &Pt, polyline: &[Pt], eps: f64) -> Vec<(usize, i8)> {
    proj_on_polyline(p, polyline, eps)
        .into_iter()
        .map(|c| (c.segment, c.projection.side))
        .collect()
}

/// Distance from `p` to the closest point of `polyline`.
pub fn distance_to_polyline(p: &Pt, polyline: &[Pt]) -> f64 {
    match polyline.len() {
        0 => f64::INFINITY,
        1 => (p - polyline[0]).norm(),
        _ => polyline
            .windows(2)
            .map(|w| proj_point_on_segment(p, &w[0], &w[1]).distance)
            .fold(f64::INFINITY, f64::min),
    }
}

/// Intersection of segments `[a, b]` and `[c, d]`.
///
/// Return
/// ------
/// * `Some((point, t, u))` with `point = a + t(b − a) = c + u(d − c)`, `None` for
///   disjoint or parallel segments
pub fn segment_intersection(a: &Pt, b: &Pt, c: &Pt, d: &Pt) -> Option<(Pt, f64, f64)> {
    let r = b - a;
    let s = d - c;
    let denom = r.x * s.y - r.y * s.x;
    if denom.abs() < 1e-15 {
        return None;
    }
    let ac = c - a;
    let t = (ac.x * s.y - ac.y * s.x) / denom;
    let u = (ac.x * r.y - ac.y * r.x) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some((a + r * t, t, u))
    } else {
        None
    }
}

pub fn segments_intersect(a: &Pt, b: &Pt, c: &Pt, d: &Pt) -> bool {
    segment_intersection(a, b, c, d).is_some()
}

/// Crossing-number inclusion test; the polygon may be open or closed.
pub fn point_in_polygon(p: &Pt, polygon: &[Pt]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (&polygon[i], &polygon[j]);
        if (pi.y > p.y) != (pj.y > p.y) {
            let x = pj.x + (p.y - pj.y) * (pi.x - pj.x) / (pi.y - pj.y);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Convex hull by Jarvis march, counter-clockwise, starting from the leftmost point.
pub fn convex_hull(points: &[Pt]) -> Vec<Pt> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let start = points
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)))
        .map_or(0, |(i, _)| i);

    let mut hull = Vec::new();
    let mut current = start;
    loop {
        hull.push(points[current]);
        let mut candidate = (current + 1) % points.len();
        for (i, p) in points.iter().enumerate() {
            let c = cross(&points[current], &points[candidate], p);
            let farther = (p - points[current]).norm_squared()
                > (points[candidate] - points[current]).norm_squared();
            if c < 0.0 || (c == 0.0 && farther) {
                candidate = i;
            }
        }
        current = candidate;
        if current == start || hull.len() > points.len() {
            break;
        }
    }
    hull
}

fn circle_from(boundary: &[Pt]) -> Circle {
    match boundary {
        [] => Circle {
            center: (0.0, 0.0),
            radius: 0.0,
        },
        [a] => Circle {
            center: (a.x, a.y),
            radius: 0.0,
        },
        [a, b] => Circle {
            center: ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0),
            radius: (a - b).norm() / 2.0,
        },
        [a, b, c, ..] => {
            let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
            if d.abs() < 1e-15 {
                // aligned: the farthest pair spans the circle
                let pairs = [(a, b), (a, c), (b, c)];
                let (p, q) = pairs
                    .into_iter()
                    .max_by(|(p1, q1), (p2, q2)| (*p1 - *q1).norm().total_cmp(&(*p2 - *q2).norm()))
                    .unwrap_or((a, b));
                return circle_from(&[*p, *q]);
            }
            let (a2, b2, c2) = (a.coords.norm_squared(), b.coords.norm_squared(), c.coords.norm_squared());
            let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
            let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
            Circle {
                center: (ux, uy),
                radius: ((a.x - ux).powi(2) + (a.y - uy).powi(2)).sqrt(),
            }
        }
    }
}

fn welzl(points: &[Pt], boundary: &mut Vec<Pt>) -> Circle {
    if boundary.len() == 3 {
        return circle_from(boundary);
    }
    let Some((p, rest)) = points.split_last() else {
        return circle_from(boundary);
    };
    let circle = welzl(rest, boundary);
    if circle.contains(p) {
        return circle;
    }
    boundary.push(*p);
    let circle = welzl(rest, boundary);
    boundary.pop();
    circle
}

/// Smallest circle enclosing every point (Welzl's algorithm).
///
/// Errors
/// ------
/// * [`TrackError::RecursionLimit`] when the number of points exceeds half of the
///   configured `recursion_budget`
pub fn minimum_enclosing_circle(points: &[Pt]) -> Result<Circle, TrackError> {
    let budget = with_settings(|s| s.recursion_budget);
    if points.len() > budget / 2 {
        return Err(TrackError::RecursionLimit(points.len()));
    }
    if points.is_empty() {
        return Err(TrackError::EmptyTrack);
    }
    let mut shuffled = points.to_vec();
    shuffled.shuffle(&mut StdRng::seed_from_u64(0x5eed));
    Ok(welzl(&shuffled, &mut Vec::with_capacity(3)))
}

#[cfg(test)]
mod geometry_test {
    use super::*;
    use crate::settings::{reset_settings, update_settings};
    use approx::assert_relative_eq;
    use rand::Rng;

    fn pt(x: f64, y: f64) -> Pt {
        Pt::new(x, y)
    }

    #[test]
    fn test_segment_projection() {
        let r = proj_point_on_segment(&pt(0.5, 1.0), &pt(0., 0.), &pt(1., 0.));
        assert_eq!(r.point, pt(0.5, 0.0));
        assert_eq!(r.distance, 1.0);
        assert_eq!(r.side, 1);

        let r = proj_point_on_segment(&pt(2.0, -1.0), &pt(0., 0.), &pt(1., 0.));
        assert_eq!(r.point, pt(1.0, 0.0));
        assert_eq!(r.t, 1.0);
        assert_eq!(r.side, -1);
    }

    #[test]
    fn test_detect_side_at_vertex() {
        // a right-angle turn; the query point faces the corner from outside
        let line = vec![pt(0., 0.), pt(1., 0.), pt(1., 1.)];
        let sides = detect_side(&pt(2.0, -1.0), &line, 1e-9);
        assert_eq!(sides.len(), 2);
        assert_eq!(sides[0], (0, -1));
        assert_eq!(sides[1], (1, -1));

        // facing the corner from the inside of the turn
        let sides = detect_side(&pt(0.5, 0.5), &line, 1e-9);
        assert_eq!(sides.len(), 2);
        assert!(sides.iter().all(|(_, s)| *s == 1));

        // on the bisector past the vertex: opposite sides
        let line = vec![pt(0., 0.), pt(1., 0.), pt(2., 0.)];
        let sides = detect_side(&pt(1.0, 0.0), &line, 1e-9);
        assert_eq!(sides.len(), 2);

        let zigzag = vec![pt(0., 0.), pt(1., 1.), pt(2., 0.)];
        let sides = detect_side(&pt(1.0, 2.0), &zigzag, 1e-9);
        assert_eq!(sides.len(), 2);
        assert_eq!(sides[0].1, 1);
        assert_eq!(sides[1].1, 1);
    }

    #[test]
    fn test_intersection_and_inclusion() {
        let (p, t, u) =
            segment_intersection(&pt(0., 0.), &pt(2., 2.), &pt(0., 2.), &pt(2., 0.)).unwrap();
        assert_relative_eq!(p.x, 1.0);
        assert_relative_eq!(t, 0.5);
        assert_relative_eq!(u, 0.5);
        assert!(!segments_intersect(&pt(0., 0.), &pt(1., 0.), &pt(0., 1.), &pt(1., 1.)));

        let square = vec![pt(0., 0.), pt(2., 0.), pt(2., 2.), pt(0., 2.)];
        assert!(point_in_polygon(&pt(1., 1.), &square));
        assert!(!point_in_polygon(&pt(3., 1.), &square));
        assert_eq!(polygon_area(&square), 4.0);
        assert_eq!(triangle_area(&pt(0., 0.), &pt(1., 0.), &pt(0., 1.)), 0.5);
        assert_eq!(triangle_area(&pt(0., 0.), &pt(0., 1.), &pt(1., 0.)), -0.5);
    }

    #[test]
    fn test_convex_hull() {
        let pts = vec![
            pt(0., 0.),
            pt(1., 1.),
            pt(2., 0.),
            pt(2., 2.),
            pt(0., 2.),
            pt(1., 0.5),
        ];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        for p in &pts {
            assert!(point_in_polygon(p, &hull) || hull.contains(p));
        }
    }

    #[test]
    fn test_min_circle() {
        let c = minimum_enclosing_circle(&[pt(3., 4.)]).unwrap();
        assert_eq!(c.center, (3.0, 4.0));
        assert_eq!(c.radius, 0.0);

        let square = vec![pt(0., 0.), pt(2., 0.), pt(2., 2.), pt(0., 2.), pt(1., 1.)];
        let c = minimum_enclosing_circle(&square).unwrap();
        assert_relative_eq!(c.center.0, 1.0, epsilon = 1e-12);
        assert_relative_eq!(c.radius, 2f64.sqrt(), epsilon = 1e-12);

        let mut rng = StdRng::seed_from_u64(7);
        let cloud: Vec<Pt> = (0..300)
            .map(|_| pt(rng.random_range(-10.0..10.0), rng.random_range(-5.0..5.0)))
            .collect();
        let c = minimum_enclosing_circle(&cloud).unwrap();
        assert!(cloud.iter().all(|p| c.contains(p)));
    }

    #[test]
    fn test_min_circle_recursion_limit() {
        update_settings(|s| s.recursion_budget = 10);
        let pts: Vec<Pt> = (0..6).map(|i| pt(i as f64, 0.0)).collect();
        assert_eq!(
            minimum_enclosing_circle(&pts).unwrap_err(),
            TrackError::RecursionLimit(6)
        );
        reset_settings();
    }
}
