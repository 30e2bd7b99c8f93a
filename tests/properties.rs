mod common;

use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tracklib::collection::TrackCollection;
use tracklib::coords::Coord;
use tracklib::interpolation::{synchronize, ResampleAlgo, ResampleMode, ResampleTarget};
use tracklib::kernel::Kernel;
use tracklib::operator::filter::filter;
use tracklib::operator::unary::UnaryOperator;
use tracklib::operator::Operation;
use tracklib::raster::aggregator::Aggregator;
use tracklib::summarize::{summarize, Indicator};
use tracklib::time::GPSTime;
use tracklib::track::{Observation, Track};

use common::{assert_columns_close, enu_track_from, lattice, node_id, random_walk};

#[test]
fn test_feature_columns_match_size() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut t = random_walk(&mut rng, 37, 5.0);
    t.compute_speed().unwrap();
    t.compute_heading().unwrap();
    t.eval("w = speed * 2").unwrap();
    for name in ["x", "y", "z", "t", "idx", "abs_curv", "speed", "heading", "w"] {
        assert_eq!(t.get_analytical_feature(name).unwrap().len(), t.size(), "{name}");
    }
}

#[test]
fn test_enu_geo_round_trip() {
    let mut rng = StdRng::seed_from_u64(7);
    let base = Coord::geo(2.35, 48.85, 35.0);
    let t0 = GPSTime::zero();
    let original = Track::from_observations(
        (0..20)
            .map(|k| {
                let c = Coord::geo(
                    2.35 + rng.random_range(-0.05..0.05),
                    48.85 + rng.random_range(-0.05..0.05),
                    rng.random_range(0.0..200.0),
                );
                Observation::new(c, t0.add_sec(k as f64))
            })
            .collect(),
    );
    let mut t = original.clone();
    t.to_enu_coords(Some(base)).unwrap();
    t.to_geo_coords(Some(base)).unwrap();
    for (a, b) in t.iter().zip(original.iter()) {
        // 1e-6 m is far below 1e-9 degree
        assert!(a.position.distance_to(&b.position).unwrap() < 1e-6);
    }
}

#[test]
fn test_abs_curv_is_monotonic() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut t = random_walk(&mut rng, 100, 10.0);
    let s = t.compute_abs_curv().unwrap();
    assert_eq!(s[0], 0.0);
    assert!(s.windows(2).all(|w| w[1] >= w[0]));
}

#[test]
fn test_uniform_filter_is_moving_average() {
    let mut rng = StdRng::seed_from_u64(11);
    let x: Vec<f64> = (0..50).map(|_| rng.random_range(-1.0..1.0)).collect();
    let y = filter(&x, &Kernel::uniform(5.0)).unwrap();
    for i in 2..x.len() - 2 {
        let mean = x[i - 2..=i + 2].iter().sum::<f64>() / 5.0;
        assert_abs_diff_eq!(y[i], mean, epsilon = 1e-12);
    }
}

#[test]
fn test_differentiate_then_integrate() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut t = random_walk(&mut rng, 30, 2.0);
    let a: Vec<f64> = (0..t.size()).map(|_| rng.random_range(0.0..100.0)).collect();
    t.create_analytical_feature("a", a.clone()).unwrap();
    t.operate(Operation::Unary(UnaryOperator::Differentiator, "a"), Some("da")).unwrap();
    let back = t.operate(Operation::Unary(UnaryOperator::Integrator, "da"), None).unwrap();

    let mut expected: Vec<f64> = a.iter().map(|v| v - a[0]).collect();
    expected[0] = f64::NAN;
    assert_columns_close(&back, &expected, 1e-9);
}

#[test]
fn test_undirected_distances_are_symmetric() {
    let mut rng = StdRng::seed_from_u64(17);
    let net = lattice(5, None, Some(&mut rng));
    for _ in 0..20 {
        let a = node_id(rng.random_range(0..5), rng.random_range(0..5));
        let b = node_id(rng.random_range(0..5), rng.random_range(0..5));
        assert_eq!(net.shortest_distance(&a, &a).unwrap(), Some(0.0));
        let ab = net.shortest_distance(&a, &b).unwrap().unwrap();
        let ba = net.shortest_distance(&b, &a).unwrap().unwrap();
        assert_abs_diff_eq!(ab, ba, epsilon = 1e-9);
    }
}

#[test]
fn test_astar_matches_dijkstra() {
    let mut rng = StdRng::seed_from_u64(23);
    // every weight is at least the straight-line length, so a unit heuristic is admissible
    let net = lattice(6, None, Some(&mut rng));
    for _ in 0..20 {
        let a = node_id(rng.random_range(0..6), rng.random_range(0..6));
        let b = node_id(rng.random_range(0..6), rng.random_range(0..6));
        let dijkstra = net.shortest_distance(&a, &b).unwrap().unwrap();
        let astar = net.shortest_distance_astar(&a, &b, 1.0).unwrap().unwrap();
        assert_abs_diff_eq!(dijkstra, astar, epsilon = 1e-9);
    }
}

#[test]
fn test_count_band_sums_to_observations() {
    let mut rng = StdRng::seed_from_u64(29);
    let tc: TrackCollection = (0..6).map(|k| random_walk(&mut rng, 10 + 5 * k, 20.0)).collect();
    let raster = summarize(&tc, &[Indicator::Feature("idx")], &[Aggregator::Count], Some((15.0, 15.0))).unwrap();
    let band = raster.get_af_map("idx#count").unwrap();
    let total: f64 = band.values().iter().filter(|v| **v != band.no_data()).sum();
    assert_eq!(total as usize, tc.nb_observations());

    // every observation is counted in its own cell
    let mut expected = std::collections::HashMap::new();
    for track in &tc {
        for obs in track {
            let cell = raster.get_cell(obs.position.x(), obs.position.y()).unwrap();
            *expected.entry(cell).or_insert(0.0) += 1.0;
        }
    }
    for ((i, j), count) in expected {
        assert_eq!(band.get(i, j).unwrap(), count);
    }
}

#[test]
fn test_synchronize_is_idempotent() {
    let t0 = GPSTime::zero();
    let mut t1 = enu_track_from(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 0.0)], t0, 2.0);
    let mut t2 = enu_track_from(&[(0.0, 5.0), (0.0, 10.0), (0.0, 15.0)], t0.add_sec(1.0), 3.0);
    synchronize(&mut t1, &mut t2).unwrap();
    assert_eq!(t1.get_timestamps(), t2.get_timestamps());
    assert_eq!(t1.get_t().first().copied(), Some(1.0));
    assert_eq!(t1.get_t().last().copied(), Some(6.0));

    let (before1, before2) = (t1.clone(), t2.clone());
    synchronize(&mut t1, &mut t2).unwrap();
    assert_eq!(t1.get_timestamps(), before1.get_timestamps());
    assert_columns_close(&t1.get_x(), &before1.get_x(), 1e-9);
    assert_columns_close(&t2.get_y(), &before2.get_y(), 1e-9);
}

#[test]
fn test_spatial_resampling_of_straight_track() {
    let mut t = enu_track_from(&[(0.0, 0.0), (10.0, 0.0), (25.0, 0.0)], GPSTime::zero(), 1.0);
    t.resample(&ResampleTarget::Interval(2.0), ResampleMode::Spatial, ResampleAlgo::Linear)
        .unwrap();
    // ⌊25 / 2⌋ + 1
    assert_eq!(t.size(), 13);
    for (k, x) in t.get_x().iter().enumerate() {
        assert_abs_diff_eq!(*x, 2.0 * k as f64, epsilon = 1e-9);
    }
}

#[test]
fn test_count_query_on_empty_selection() {
    let mut rng = StdRng::seed_from_u64(31);
    let t = random_walk(&mut rng, 10, 1.0);
    let r = t.query("SELECT COUNT(x) WHERE idx < 0").unwrap();
    assert_eq!(r.as_scalar(), Some(0.0));
}
