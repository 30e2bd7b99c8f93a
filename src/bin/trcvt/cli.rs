use camino::Utf8PathBuf;
use clap::{value_parser, Arg, ArgAction, ArgGroup, ArgMatches, ColorChoice, Command};

use tracklib::interpolation::{ResampleAlgo, ResampleMode, ResampleTarget};
use tracklib::io::network_reader::NetworkFormat;
use tracklib::io::CsvFormat;
use tracklib::raster::aggregator::Aggregator;
use tracklib::settings::with_settings;
use tracklib::time::GPSTime;
use tracklib::track_errors::TrackError;

/// What the user asked for, with every argument validated.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Convert {
        input: Utf8PathBuf,
        output: Utf8PathBuf,
        csv: CsvFormat,
    },
    Resample {
        input: Utf8PathBuf,
        output: Utf8PathBuf,
        csv: CsvFormat,
        target: ResampleTarget,
        mode: ResampleMode,
        algo: ResampleAlgo,
    },
    Summarize {
        inputs: Vec<Utf8PathBuf>,
        output: Utf8PathBuf,
        csv: CsvFormat,
        resolution: Option<f64>,
        features: Vec<String>,
        aggregators: Vec<Aggregator>,
    },
    Route {
        network: Utf8PathBuf,
        format: NetworkFormat,
        source: String,
        target: String,
        astar: Option<f64>,
        output: Utf8PathBuf,
        csv: CsvFormat,
    },
}

pub struct Cli {
    /// Arguments passed by user
    matches: ArgMatches,
}

fn input_arg() -> Arg {
    Arg::new("input")
        .short('i')
        .long("input")
        .value_name("FILE")
        .value_parser(value_parser!(Utf8PathBuf))
        .required(true)
        .help("Input track file: .csv, .gpx, .nmea or .wkt")
}

fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("FILE")
        .value_parser(value_parser!(Utf8PathBuf))
        .required(true)
        .help("Output file, its extension selects the format")
}

/// Flags mirroring the fields of `CsvFormat`.
fn csv_args(cmd: Command) -> Command {
    cmd.next_help_heading("CSV layout")
        .arg(Arg::new("format")
            .long("format")
            .value_name("JSON")
            .value_parser(value_parser!(Utf8PathBuf))
            .help("JSON description of the CSV layout, refined by the flags below"))
        .arg(Arg::new("id-e")
            .long("id-e")
            .value_name("COL")
            .value_parser(value_parser!(usize))
            .help("Column of the first coordinate (E, lon or X)"))
        .arg(Arg::new("id-n")
            .long("id-n")
            .value_name("COL")
            .value_parser(value_parser!(usize))
            .help("Column of the second coordinate (N, lat or Y)"))
        .arg(Arg::new("id-u")
            .long("id-u")
            .value_name("COL")
            .value_parser(value_parser!(i64))
            .allow_negative_numbers(true)
            .help("Column of the height, negative for none"))
        .arg(Arg::new("id-t")
            .long("id-t")
            .value_name("COL")
            .value_parser(value_parser!(i64))
            .allow_negative_numbers(true)
            .help("Column of the timestamps, negative for none"))
        .arg(Arg::new("separator")
            .long("separator")
            .value_name("CHAR")
            .value_parser(value_parser!(char)))
        .arg(Arg::new("header")
            .long("header")
            .value_name("LINES")
            .value_parser(value_parser!(usize))
            .help("Number of header lines, the last one naming the columns"))
        .arg(Arg::new("srid")
            .long("srid")
            .value_name("SRID")
            .help("GEO, ENU, ECEF or a projected EPSG code (2154, 326xx, 327xx)"))
        .arg(Arg::new("time-format")
            .long("time-format")
            .value_name("LAYOUT")
            .help("Timestamp layout, e.g. \"4Y-2M-2D 2h:2m:2s\""))
        .arg(Arg::new("time-ini")
            .long("time-ini")
            .value_name("DATE")
            .help("Epoch of numeric time columns, read with the timestamp layout"))
        .arg(Arg::new("time-unit")
            .long("time-unit")
            .value_name("SECONDS")
            .value_parser(value_parser!(f64))
            .help("Seconds per unit of numeric time columns"))
        .arg(Arg::new("no-data")
            .long("no-data")
            .value_name("VALUE")
            .value_parser(value_parser!(f64))
            .allow_negative_numbers(true))
        .arg(Arg::new("read-all")
            .long("read-all")
            .action(ArgAction::SetTrue)
            .help("Read the other columns (GPX extensions) as analytical features"))
}

fn command() -> Command {
    Command::new("trcvt")
        .version(env!("CARGO_PKG_VERSION"))
        .about("GPS track conversion, resampling, rasterization and routing")
        .after_help("Exit codes: 0 success, 2 bad input (no route included), 3 I/O error, 4 configuration error")
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .action(ArgAction::Count)
            .global(true)
            .help("Increase verbosity (-v info, -vv debug, -vvv trace)"))
        .subcommand_required(true)
        .subcommand(csv_args(
            Command::new("convert")
                .about("Convert a track file to another format")
                .arg(input_arg())
                .arg(output_arg()),
        ))
        .subcommand(csv_args(
            Command::new("resample")
                .about("Resample every track of a file")
                .arg(input_arg())
                .arg(output_arg())
                .arg(Arg::new("delta")
                    .long("delta")
                    .value_name("STEP")
                    .value_parser(value_parser!(f64))
                    .help("Regular step, in meters (spatial) or seconds (temporal)"))
                .arg(Arg::new("count")
                    .long("count")
                    .value_name("N")
                    .value_parser(value_parser!(usize))
                    .help("Number of regularly spaced samples"))
                .group(ArgGroup::new("target").args(["delta", "count"]).required(true))
                .arg(Arg::new("mode")
                    .long("mode")
                    .value_parser(["spatial", "temporal"])
                    .default_value("spatial"))
                .arg(Arg::new("algo")
                    .long("algo")
                    .value_parser(["linear", "thin", "bspline", "gp"])
                    .default_value("linear")),
        ))
        .subcommand(csv_args(
            Command::new("summarize")
                .about("Aggregate analytical features of tracks into ASCII rasters")
                .arg(input_arg()
                    .action(ArgAction::Append)
                    .help("Input track files, as many as needed"))
                .arg(output_arg().help("Output .asc file, suffixed with the band name when several bands are produced"))
                .arg(Arg::new("resolution")
                    .long("resolution")
                    .value_name("R")
                    .value_parser(value_parser!(f64))
                    .help("Cell size, 1/100 of the widest side by default"))
                .arg(Arg::new("af")
                    .long("af")
                    .value_name("NAME")
                    .action(ArgAction::Append)
                    .required(true)
                    .help("Analytical feature to summarize, one per band"))
                .arg(Arg::new("agg")
                    .long("agg")
                    .value_name("AGG")
                    .action(ArgAction::Append)
                    .required(true)
                    .help("Aggregator of each band: sum, min, max, count, avg, dominant, median")),
        ))
        .subcommand(csv_args(
            Command::new("route")
                .about("Shortest path between two nodes of a network")
                .arg(Arg::new("network")
                    .long("network")
                    .value_name("FILE")
                    .value_parser(value_parser!(Utf8PathBuf))
                    .required(true)
                    .help("Network CSV: edge;source;target;orientation;WKT"))
                .arg(Arg::new("source").long("source").value_name("NODE").required(true))
                .arg(Arg::new("target").long("target").value_name("NODE").required(true))
                .arg(Arg::new("astar")
                    .long("astar")
                    .value_name("W")
                    .value_parser(value_parser!(f64))
                    .help("Run A* with a heuristic of W times the straight-line distance"))
                .arg(output_arg()),
        ))
}

impl Cli {
    /// Parse the process arguments, exiting with a usage message on error.
    pub fn new() -> Self {
        Self {
            matches: command().get_matches(),
        }
    }

    pub fn try_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self {
            matches: command().try_get_matches_from(args)?,
        })
    }

    pub fn verbosity(&self) -> u8 {
        self.matches.get_count("verbose")
    }

    pub fn action(&self) -> Result<Action, TrackError> {
        let Some((name, m)) = self.matches.subcommand() else {
            return Err(TrackError::ConfigError("no subcommand".into()));
        };
        let path = |id: &str| {
            m.get_one::<Utf8PathBuf>(id)
                .cloned()
                .ok_or_else(|| TrackError::ConfigError(format!("missing --{id}")))
        };
        let text = |id: &str| {
            m.get_one::<String>(id)
                .cloned()
                .ok_or_else(|| TrackError::ConfigError(format!("missing --{id}")))
        };
        let csv = csv_format(m)?;
        match name {
            "convert" => Ok(Action::Convert {
                input: path("input")?,
                output: path("output")?,
                csv,
            }),
            "resample" => {
                let target = match (m.get_one::<f64>("delta"), m.get_one::<usize>("count")) {
                    (Some(d), _) => ResampleTarget::Interval(*d),
                    (None, Some(n)) => ResampleTarget::Count(*n),
                    (None, None) => return Err(TrackError::ConfigError("missing --delta or --count".into())),
                };
                Ok(Action::Resample {
                    input: path("input")?,
                    output: path("output")?,
                    csv,
                    target,
                    mode: text("mode")?.parse()?,
                    algo: text("algo")?.parse()?,
                })
            }
            "summarize" => Ok(Action::Summarize {
                inputs: m.get_many::<Utf8PathBuf>("input").into_iter().flatten().cloned().collect(),
                output: path("output")?,
                csv,
                resolution: m.get_one::<f64>("resolution").copied(),
                features: m.get_many::<String>("af").into_iter().flatten().cloned().collect(),
                aggregators: m
                    .get_many::<String>("agg")
                    .into_iter()
                    .flatten()
                    .map(|a| a.parse())
                    .collect::<Result<_, _>>()?,
            }),
            "route" => {
                let mut format = NetworkFormat::default();
                if let Some(srid) = m.get_one::<String>("srid") {
                    format.srid = srid.clone();
                }
                if let Some(sep) = m.get_one::<char>("separator") {
                    format.separator = *sep;
                }
                Ok(Action::Route {
                    network: path("network")?,
                    format,
                    source: text("source")?,
                    target: text("target")?,
                    astar: m.get_one::<f64>("astar").copied(),
                    output: path("output")?,
                    csv,
                })
            }
            other => Err(TrackError::ConfigError(format!("unknown subcommand {other}"))),
        }
    }
}

fn column(m: &ArgMatches, id: &str) -> Option<Option<usize>> {
    m.get_one::<i64>(id).map(|k| usize::try_from(*k).ok())
}

/// `CsvFormat` from the optional JSON description and the layout flags.
fn csv_format(m: &ArgMatches) -> Result<CsvFormat, TrackError> {
    let mut fmt = match m.get_one::<Utf8PathBuf>("format") {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)
            .map_err(|e| TrackError::ConfigError(format!("{path}: {e}")))?,
        None => CsvFormat::default(),
    };
    if let Some(k) = m.get_one::<usize>("id-e") {
        fmt.id_e = *k;
    }
    if let Some(k) = m.get_one::<usize>("id-n") {
        fmt.id_n = *k;
    }
    if let Some(k) = column(m, "id-u") {
        fmt.id_u = k;
    }
    if let Some(k) = column(m, "id-t") {
        fmt.id_t = k;
    }
    if let Some(c) = m.get_one::<char>("separator") {
        fmt.separator = *c;
    }
    if let Some(h) = m.get_one::<usize>("header") {
        fmt.header = *h;
    }
    if let Some(s) = m.get_one::<String>("srid") {
        fmt.srid = s.clone();
    }
    if let Some(f) = m.get_one::<String>("time-format") {
        fmt.time_format = Some(f.clone());
    }
    if let Some(u) = m.get_one::<f64>("time-unit") {
        fmt.time_unit = *u;
    }
    if let Some(v) = m.get_one::<f64>("no-data") {
        fmt.no_data = *v;
    }
    if let Some(t0) = m.get_one::<String>("time-ini") {
        let layout = fmt
            .time_format
            .clone()
            .unwrap_or_else(|| with_settings(|s| s.read_format.clone()));
        fmt.time_ini = Some(GPSTime::parse_with(t0, &layout)?);
    }
    fmt.read_all |= m.get_flag("read-all");
    Ok(fmt)
}

#[cfg(test)]
mod cli_test {
    use super::*;

    fn action(args: &[&str]) -> Action {
        Cli::try_from_args(args).unwrap().action().unwrap()
    }

    #[test]
    fn test_convert_with_layout() {
        let a = action(&[
            "trcvt", "convert", "-i", "in.csv", "-o", "out.gpx", "--separator", ";", "--id-t", "-1",
            "--srid", "GEO", "--read-all",
        ]);
        let Action::Convert { input, output, csv } = a else {
            panic!("expected a conversion");
        };
        assert_eq!(input, "in.csv");
        assert_eq!(output, "out.gpx");
        assert_eq!(csv.separator, ';');
        assert_eq!(csv.id_t, None);
        assert_eq!(csv.id_u, Some(2));
        assert_eq!(csv.srid, "GEO");
        assert!(csv.read_all);
    }

    #[test]
    fn test_resample_target() {
        let a = action(&["trcvt", "resample", "-i", "a.csv", "-o", "b.csv", "--count", "20", "--algo", "gp"]);
        let Action::Resample { target, mode, algo, .. } = a else {
            panic!("expected a resampling");
        };
        assert_eq!(target, ResampleTarget::Count(20));
        assert_eq!(mode, ResampleMode::Spatial);
        assert_eq!(algo, ResampleAlgo::GaussianProcess);

        assert!(Cli::try_from_args(["trcvt", "resample", "-i", "a.csv", "-o", "b.csv"]).is_err());
        assert!(Cli::try_from_args(["trcvt", "resample", "-i", "a", "-o", "b", "--delta", "1", "--count", "2"]).is_err());
    }

    #[test]
    fn test_summarize_lists() {
        let a = action(&[
            "trcvt", "summarize", "-i", "a.csv", "-i", "b.gpx", "-o", "r.asc", "--af", "speed", "--agg", "avg",
            "--af", "idx", "--agg", "count", "--resolution", "60", "-vv",
        ]);
        let Action::Summarize { inputs, features, aggregators, resolution, .. } = a else {
            panic!("expected a summary");
        };
        assert_eq!(inputs.len(), 2);
        assert_eq!(features, vec!["speed", "idx"]);
        assert_eq!(aggregators, vec![Aggregator::Avg, Aggregator::Count]);
        assert_eq!(resolution, Some(60.0));

        let bad = Cli::try_from_args(["trcvt", "summarize", "-i", "a", "-o", "r", "--af", "v", "--agg", "mean2"]).unwrap();
        assert!(matches!(bad.action(), Err(TrackError::UnknownFunction(_))));
    }

    #[test]
    fn test_route_and_time_origin() {
        let cli = Cli::try_from_args([
            "trcvt", "route", "--network", "net.csv", "--source", "a", "--target", "b", "--astar", "1",
            "-o", "p.geojson", "--time-ini", "2020-01-01 00:00:00", "-v",
        ])
        .unwrap();
        assert_eq!(cli.verbosity(), 1);
        let Action::Route { source, astar, csv, format, .. } = cli.action().unwrap() else {
            panic!("expected a routing");
        };
        assert_eq!(source, "a");
        assert_eq!(astar, Some(1.0));
        assert_eq!(format.separator, ';');
        assert_eq!(csv.time_ini, Some(GPSTime::new(2020, 1, 1, 0, 0, 0, 0).unwrap()));
    }
}
