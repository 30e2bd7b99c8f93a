mod common;

use approx::assert_abs_diff_eq;

use tracklib::collection::TrackCollection;
use tracklib::constants::SPEED;
use tracklib::raster::aggregator::Aggregator;
use tracklib::summarize::{summarize, Indicator};
use tracklib::time::GPSTime;
use tracklib::track::enu_track;

use common::{enu_track_from, lattice, node_id};

#[test]
fn test_track_measures() {
    let mut t = enu_track(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (1.0, 1.0, 0.0), (2.0, 1.0, 0.0)], 1.0);
    assert_abs_diff_eq!(t.length().unwrap(), 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(t.duration(), 3.0, epsilon = 1e-12);
    let speed = t.compute_speed().unwrap();
    assert_abs_diff_eq!(speed[1], 1.0, epsilon = 1e-9);
    assert_eq!(t.get_analytical_feature(SPEED).unwrap(), speed);
}

#[test]
fn test_lattice_diagonal_shortcut() {
    let net = lattice(4, Some(1.0), None);
    assert_eq!(net.nb_nodes(), 16);
    let d = net.shortest_distance(&node_id(0, 0), &node_id(1, 1)).unwrap();
    assert_eq!(d, Some(1.0));
    // three diagonal hops across the lattice
    let d = net.shortest_distance(&node_id(0, 0), &node_id(3, 3)).unwrap().unwrap();
    assert_abs_diff_eq!(d, 3.0, epsilon = 1e-12);
}

#[test]
fn test_summarize_count_and_mean_speed() {
    let t0 = GPSTime::zero();
    let mut t1 = enu_track_from(&[(0.0, 0.0), (100.0, 0.0), (100.0, 90.0), (200.0, 90.0)], t0, 1.0);
    let mut t2 = enu_track_from(&[(5.0, 5.0), (70.0, 90.0), (150.0, 90.0)], t0, 1.0);
    let v1 = t1.compute_speed().unwrap()[0];
    let v2 = t2.compute_speed().unwrap()[0];
    let tc = TrackCollection::from_tracks(vec![t1, t2]);

    let raster = summarize(
        &tc,
        &[Indicator::Feature("idx"), Indicator::Feature(SPEED)],
        &[Aggregator::Count, Aggregator::Avg],
        Some((60.0, 60.0)),
    )
    .unwrap();
    let (i, j) = raster.get_cell(0.0, 0.0).unwrap();
    assert_eq!(raster.get_cell(5.0, 5.0), Some((i, j)));
    assert_eq!(raster.get_af_map("idx#count").unwrap().get(i, j).unwrap(), 2.0);
    assert_abs_diff_eq!(
        raster.get_af_map("speed#avg").unwrap().get(i, j).unwrap(),
        (v1 + v2) / 2.0,
        epsilon = 1e-9
    );
}

#[test]
fn test_timestamp_arithmetic() {
    let t = GPSTime::parse_with("2018-01-01 10:00:00", "4Y-2M-2D 2h:2m:2s").unwrap();
    let later = t.add_sec(3600.0);
    assert_eq!(later.format_with("2D/2M/4Y 2h:2m:2s"), "01/01/2018 11:00:00");
    assert_eq!(later - t, 3600.0);
}

#[test]
fn test_query_selects_fast_observations() {
    let mut t = enu_track(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (2.0, 0.0, 0.0), (3.0, 0.0, 0.0)], 1.0);
    t.create_analytical_feature(SPEED, vec![0.7, 0.2, 0.7, 0.2]).unwrap();
    let selected = t.query("SELECT * WHERE speed > 0.5").unwrap().into_track().unwrap();
    assert_eq!(selected.size(), 2);
    assert_eq!(selected.get_analytical_feature(SPEED).unwrap(), vec![0.7, 0.7]);
    // the source track is left untouched
    assert_eq!(t.size(), 4);
}

#[test]
fn test_expression_speed_in_kmh() {
    // 5 m per step in changing directions, 2 s apart
    let mut t = enu_track(
        &[(0.0, 0.0, 0.0), (3.0, 4.0, 0.0), (3.0, 9.0, 0.0), (8.0, 9.0, 0.0), (11.0, 13.0, 0.0)],
        2.0,
    );
    t.compute_abs_curv().unwrap();
    t.eval("v = 3.6 * D{s} / D{t}").unwrap();
    let v = t.get_analytical_feature("v").unwrap();
    let speed = t.compute_speed().unwrap();
    assert!(v[0].is_nan());
    for i in 1..t.size() - 1 {
        assert_abs_diff_eq!(v[i], 3.6 * speed[i], epsilon = 1e-6);
    }
}
