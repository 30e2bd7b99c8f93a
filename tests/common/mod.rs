#![allow(dead_code)]

use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::Rng;

use tracklib::coords::Coord;
use tracklib::network::{Edge, Network, Node};
use tracklib::time::GPSTime;
use tracklib::track::{Observation, Track};

/// ENU track through `points`, one observation every `dt` seconds from `t0`.
pub fn enu_track_from(points: &[(f64, f64)], t0: GPSTime, dt: f64) -> Track {
    Track::from_observations(
        points
            .iter()
            .enumerate()
            .map(|(k, (e, n))| Observation::new(Coord::enu(*e, *n, 0.0), t0.add_sec(k as f64 * dt)))
            .collect(),
    )
}

/// Random walk of `n` observations, 1 s apart.
pub fn random_walk(rng: &mut StdRng, n: usize, step: f64) -> Track {
    let mut points = Vec::with_capacity(n);
    let (mut e, mut u) = (0.0, 0.0);
    for _ in 0..n {
        points.push((e, u));
        e += rng.random_range(-step..step);
        u += rng.random_range(-step..step);
    }
    enu_track_from(&points, GPSTime::zero(), 1.0)
}

pub fn node_id(i: usize, j: usize) -> String {
    format!("{i}_{j}")
}

fn segment(id: &str, a: (f64, f64), b: (f64, f64)) -> Edge {
    let geom = enu_track_from(&[a, b], GPSTime::zero(), 1.0);
    Edge::new(id, geom).expect("two-point geometry")
}

/// `n × n` lattice of unit spacing with both diagonals in every cell.
///
/// Edges weigh their length, scaled by a random factor in `[1, 2)` when `rng` is
/// given. Diagonals weigh `diagonal_weight` instead when it is set.
pub fn lattice(n: usize, diagonal_weight: Option<f64>, rng: Option<&mut StdRng>) -> Network {
    let mut rng = rng;
    let mut net = Network::new();
    let node = |i: usize, j: usize| Node::new(node_id(i, j), Coord::enu(i as f64, j as f64, 0.0));
    let mut add = |net: &mut Network, id: String, a: (usize, usize), b: (usize, usize), weight: Option<f64>| {
        let pa = (a.0 as f64, a.1 as f64);
        let pb = (b.0 as f64, b.1 as f64);
        let edge = segment(&id, pa, pb);
        let factor = rng.as_deref_mut().map_or(1.0, |r| r.random_range(1.0..2.0));
        let w = weight.unwrap_or(edge.weight * factor);
        let edge = edge.with_weight(w);
        net.add_edge(edge, node(a.0, a.1), node(b.0, b.1)).expect("unique edge ids");
    };
    for i in 0..n {
        for j in 0..n {
            if i + 1 < n {
                add(&mut net, format!("h{i}_{j}"), (i, j), (i + 1, j), None);
            }
            if j + 1 < n {
                add(&mut net, format!("v{i}_{j}"), (i, j), (i, j + 1), None);
            }
            if i + 1 < n && j + 1 < n {
                add(&mut net, format!("d{i}_{j}"), (i, j), (i + 1, j + 1), diagonal_weight);
                add(&mut net, format!("a{i}_{j}"), (i + 1, j), (i, j + 1), diagonal_weight);
            }
        }
    }
    net
}

pub fn assert_columns_close(actual: &[f64], expected: &[f64], epsilon: f64) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        if e.is_nan() {
            assert!(a.is_nan(), "expected NaN, got {a}");
        } else {
            assert_abs_diff_eq!(*a, *e, epsilon = epsilon);
        }
    }
}
