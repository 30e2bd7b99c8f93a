mod common;

use approx::assert_abs_diff_eq;
use camino::Utf8PathBuf;

use tracklib::collection::TrackCollection;
use tracklib::io::ascii_raster::{read_ascii_raster, write_ascii_raster};
use tracklib::io::network_reader::{read_network_csv, NetworkFormat};
use tracklib::io::{indexed_path, read_collection, read_csv, write_collection, write_csv, CsvFormat};
use tracklib::raster::aggregator::Aggregator;
use tracklib::summarize::{summarize, Indicator};
use tracklib::time::GPSTime;

use common::enu_track_from;

/// Fresh scratch directory for one test.
fn scratch(name: &str) -> Utf8PathBuf {
    let dir = std::env::temp_dir().join(format!("tracklib_{}_{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    Utf8PathBuf::from_path_buf(dir).unwrap()
}

const GEO_TRACK: &str = "\
lon,lat,hgt,time,hr,mode&
2.350000,48.850000,35.5,2020-06-01 08:00:00,92,walk
2.350100,48.850050,36,2020-06-01 08:00:05,-9999,walk
2.350250,48.850100,36.5,2020-06-01 08:00:10,97.5,run
";

#[test]
fn test_csv_file_round_trip() {
    let dir = scratch("csv");
    let fmt = CsvFormat {
        srid: "GEO".into(),
        read_all: true,
        ..CsvFormat::default()
    };
    let input = dir.join("in.csv");
    std::fs::write(&input, GEO_TRACK).unwrap();

    let t = read_csv(&input, &fmt).unwrap();
    assert_eq!(t.size(), 3);
    assert_eq!(t.uid, "in");
    assert_eq!(t.feature_names(), ["hr", "mode"]);
    assert!(t.get_analytical_feature("hr").unwrap()[1].is_nan());

    let output = dir.join("out.csv");
    write_csv(&t, &output, &fmt).unwrap();
    let back = read_csv(&output, &fmt).unwrap();
    assert_eq!(back.feature_names(), t.feature_names());
    assert_eq!(back.get_timestamps(), t.get_timestamps());
    for name in ["x", "y", "z"] {
        let (a, b) = (back.get_analytical_feature(name).unwrap(), t.get_analytical_feature(name).unwrap());
        for (u, v) in a.iter().zip(&b) {
            assert_abs_diff_eq!(*u, *v, epsilon = 1e-12);
        }
    }
    assert_eq!(
        back.get_feature_values("mode").unwrap(),
        t.get_feature_values("mode").unwrap()
    );

    // rewriting the copy gives the same bytes
    let again = dir.join("again.csv");
    write_csv(&back, &again, &fmt).unwrap();
    assert_eq!(std::fs::read_to_string(&again).unwrap(), std::fs::read_to_string(&output).unwrap());
}

#[test]
fn test_csv_to_gpx_and_back() {
    let dir = scratch("gpx");
    let fmt = CsvFormat {
        srid: "GEO".into(),
        read_all: true,
        ..CsvFormat::default()
    };
    let input = dir.join("walk.csv");
    std::fs::write(&input, GEO_TRACK).unwrap();
    let tc = read_collection(&input, &fmt).unwrap();

    let gpx = dir.join("walk.gpx");
    write_collection(&tc, &gpx, &fmt).unwrap();
    let back = read_collection(&gpx, &fmt).unwrap();
    assert_eq!(back.size(), 1);
    let (a, b) = (tc.get(0).unwrap(), back.get(0).unwrap());
    assert_eq!(a.get_timestamps(), b.get_timestamps());
    for (p, q) in a.iter().zip(b.iter()) {
        assert_abs_diff_eq!(p.position.x(), q.position.x(), epsilon = 1e-9);
        assert_abs_diff_eq!(p.position.y(), q.position.y(), epsilon = 1e-9);
    }
    assert_eq!(b.get_analytical_feature("hr").unwrap()[2], 97.5);
}

#[test]
fn test_multi_track_outputs_are_indexed() {
    let dir = scratch("multi");
    let t0 = GPSTime::new(2021, 3, 1, 12, 0, 0, 0).unwrap();
    let tc = TrackCollection::from_tracks(vec![
        enu_track_from(&[(0.0, 0.0), (1.0, 1.0)], t0, 1.0),
        enu_track_from(&[(5.0, 0.0), (6.0, 1.0), (7.0, 2.0)], t0, 1.0),
    ]);
    let out = dir.join("tracks.csv");
    write_collection(&tc, &out, &CsvFormat::default()).unwrap();
    assert!(!out.exists());
    let second = indexed_path(&out, "1");
    assert_eq!(second.file_name(), Some("tracks_1.csv"));
    assert_eq!(read_csv(&second, &CsvFormat::default()).unwrap().size(), 3);

    assert!(write_collection(&tc, &dir.join("tracks.nmea"), &CsvFormat::default()).is_err());
}

#[test]
fn test_summary_raster_file() {
    let dir = scratch("raster");
    let t0 = GPSTime::zero();
    let tc = TrackCollection::from_tracks(vec![
        enu_track_from(&[(0.0, 0.0), (40.0, 10.0), (90.0, 70.0)], t0, 1.0),
        enu_track_from(&[(10.0, 60.0), (80.0, 20.0)], t0, 1.0),
    ]);
    let raster = summarize(&tc, &[Indicator::Feature("idx")], &[Aggregator::Count], Some((25.0, 25.0))).unwrap();
    let path = dir.join("count.asc");
    write_ascii_raster(&raster, "idx#count", &path).unwrap();
    let back = read_ascii_raster(&path, "idx#count").unwrap();
    assert_eq!(back.grid, raster.grid);
    assert_eq!(
        back.get_af_map("idx#count").unwrap().values(),
        raster.get_af_map("idx#count").unwrap().values()
    );
}

#[test]
fn test_route_from_network_file() {
    let dir = scratch("network");
    let path = dir.join("roads.csv");
    std::fs::write(
        &path,
        "\
id;from;to;dir;geom
r1;A;B;0;LINESTRING (0 0, 50 0)
r2;B;C;0;LINESTRING (50 0, 50 50)
r3;A;C;1;LINESTRING (0 0, 0 200, 50 50)
",
    )
    .unwrap();
    let net = read_network_csv(&path, &NetworkFormat::default()).unwrap();
    let route = net.shortest_path("A", "C").unwrap().unwrap();
    assert_abs_diff_eq!(route.length().unwrap(), 100.0, epsilon = 1e-9);
    // r3 only runs from A to C
    let back = net.shortest_path("C", "A").unwrap().unwrap();
    assert_abs_diff_eq!(back.length().unwrap(), 100.0, epsilon = 1e-9);
    assert!(net.shortest_path("A", "Z").is_err());

    let out = dir.join("route.csv");
    write_collection(&TrackCollection::from_tracks(vec![route]), &out, &CsvFormat::default()).unwrap();
    let written = read_csv(&out, &CsvFormat::default()).unwrap();
    assert_eq!(written.first_obs().unwrap().position.x(), 0.0);
    assert_eq!(written.last_obs().unwrap().position.y(), 50.0);
}
