//! `trcvt`: command line front end of `tracklib`.
mod cli;

use std::process::ExitCode;

use camino::Utf8Path;
use env_logger::{Builder, Target};
use log::{error, info, LevelFilter};

use tracklib::collection::TrackCollection;
use tracklib::constants::{ACCELERATION, ABS_CURV, HEADING, SPEED};
use tracklib::io::ascii_raster::write_ascii_raster;
use tracklib::io::network_reader::read_network_csv;
use tracklib::io::{indexed_path, read_collection, write_collection, CsvFormat};
use tracklib::summarize::{summarize, Indicator};
use tracklib::track::Track;
use tracklib::track_errors::TrackError;

use cli::{Action, Cli};

/// Exit status of a route request whose target cannot be reached: the request is bad input.
const NO_ROUTE: u8 = 2;

/// Kinematic AFs are computed on demand when a band asks for them.
fn ensure_feature(track: &mut Track, name: &str) -> Result<(), TrackError> {
    if track.has_analytical_feature(name) {
        return Ok(());
    }
    match name {
        ABS_CURV => track.compute_abs_curv().map(|_| ()),
        SPEED => track.compute_speed().map(|_| ()),
        HEADING => track.compute_heading().map(|_| ()),
        ACCELERATION => track.compute_acceleration().map(|_| ()),
        _ => Ok(()),
    }
}

fn run_summarize(
    inputs: &[camino::Utf8PathBuf],
    output: &Utf8Path,
    csv: &CsvFormat,
    resolution: Option<f64>,
    features: &[String],
    aggregators: &[tracklib::raster::aggregator::Aggregator],
) -> Result<(), TrackError> {
    let mut collection = TrackCollection::new();
    for input in inputs {
        for track in read_collection(input, csv)? {
            collection.add_track(track);
        }
    }
    for name in features {
        collection.try_for_each(|t| ensure_feature(t, name))?;
    }
    let indicators: Vec<Indicator<'_>> = features.iter().map(|f| Indicator::Feature(f)).collect();
    let raster = summarize(&collection, &indicators, aggregators, resolution.map(|r| (r, r)))?;

    let names = raster.band_names();
    for band in &names {
        let path = if names.len() == 1 {
            output.to_owned()
        } else {
            indexed_path(output, &band.replace('#', "_"))
        };
        write_ascii_raster(&raster, band, &path)?;
        info!("band {band} written to {path}");
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<ExitCode, TrackError> {
    match cli.action()? {
        Action::Convert { input, output, csv } => {
            let collection = read_collection(&input, &csv)?;
            write_collection(&collection, &output, &csv)?;
        }
        Action::Resample {
            input,
            output,
            csv,
            target,
            mode,
            algo,
        } => {
            let mut collection = read_collection(&input, &csv)?;
            collection.resample(&target, mode, algo)?;
            write_collection(&collection, &output, &csv)?;
        }
        Action::Summarize {
            inputs,
            output,
            csv,
            resolution,
            features,
            aggregators,
        } => run_summarize(&inputs, &output, &csv, resolution, &features, &aggregators)?,
        Action::Route {
            network,
            format,
            source,
            target,
            astar,
            output,
            csv,
        } => {
            let net = read_network_csv(&network, &format)?;
            let path = match astar {
                Some(w) => net.shortest_path_astar(&source, &target, w)?,
                None => net.shortest_path(&source, &target)?,
            };
            let Some(path) = path else {
                error!("no route from {source} to {target}");
                return Ok(ExitCode::from(NO_ROUTE));
            };
            info!("route of {:.1} m through {} points", path.length()?, path.size());
            write_collection(&TrackCollection::from_tracks(vec![path]), &output, &csv)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::new();

    let level = match cli.verbosity() {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = Builder::from_default_env();
    builder
        .target(Target::Stdout)
        .format_timestamp_secs()
        .format_module_path(false)
        .filter_level(level)
        .init();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

#[cfg(test)]
mod main_test {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn test_unreachable_target_is_bad_input() {
        let dir = std::env::temp_dir().join(format!("trcvt_{}_no_route", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let dir = Utf8PathBuf::from_path_buf(dir).unwrap();
        let network = dir.join("islands.csv");
        std::fs::write(
            &network,
            "id;from;to;dir;geom\nr1;A;B;0;LINESTRING (0 0, 10 0)\nr2;C;D;0;LINESTRING (50 0, 60 0)\n",
        )
        .unwrap();
        let output = dir.join("route.csv");
        let _ = std::fs::remove_file(&output);
        let args = |target: &str| {
            Cli::try_from_args([
                "trcvt", "route", "--network", network.as_str(), "--source", "A", "--target", target, "-o",
                output.as_str(),
            ])
            .unwrap()
        };

        assert_eq!(run(&args("C")).unwrap(), ExitCode::from(2));
        assert!(!output.exists());
        assert_eq!(run(&args("B")).unwrap(), ExitCode::SUCCESS);
        assert!(output.exists());
        // an unknown node is an error of its own, also reported as bad input
        assert_eq!(run(&args("Z")).unwrap_err().exit_code(), 2);
    }
}
