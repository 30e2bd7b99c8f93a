//! Road networks stored as CSV: one edge per line with its id, endpoint node ids,
//! optional orientation and weight, and a `LINESTRING` geometry.
//!
//! Node coordinates are taken from the ends of the edge geometries; the first edge
//! mentioning a node fixes its position.
use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};

use crate::coords::Crs;
use crate::network::{Edge, Network, Node, Orientation};
use crate::track_errors::TrackError;

use super::at_line;
use super::csv_reader::CsvFormat;
use super::wkt::wkt_track;

/// Column layout of a network file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkFormat {
    pub id_edge: usize,
    pub id_source: usize,
    pub id_target: usize,
    /// `0` both ways, `1` forward only, `-1` backward only; both ways when `None`
    pub id_orientation: Option<usize>,
    /// Traversal cost, the geometry length when `None`
    pub id_weight: Option<usize>,
    pub id_geom: usize,
    pub separator: char,
    pub header: usize,
    pub comment: Option<char>,
    pub srid: String,
}

impl Default for NetworkFormat {
    fn default() -> Self {
        NetworkFormat {
            id_edge: 0,
            id_source: 1,
            id_target: 2,
            id_orientation: Some(3),
            id_weight: None,
            id_geom: 4,
            separator: ';',
            header: 1,
            comment: Some('#'),
            srid: "ENU".to_string(),
        }
    }
}

fn read_edge(record: &csv::StringRecord, format: &NetworkFormat, crs: Crs) -> Result<(Edge, Node, Node), TrackError> {
    let col = |k: usize| {
        record
            .get(k)
            .ok_or(TrackError::OutOfRange { index: k, len: record.len() })
    };
    let id = col(format.id_edge)?;
    let geom = wkt_track(col(format.id_geom)?, crs.storage())?.with_ids(id, "");
    let source = Node::new(col(format.id_source)?, geom.first_obs()?.position);
    let target = Node::new(col(format.id_target)?, geom.last_obs()?.position);

    let mut edge = Edge::new(id, geom)?;
    if let Some(k) = format.id_orientation {
        let raw = col(k)?;
        let value = raw
            .parse::<i64>()
            .map_err(|_| TrackError::ParseError(format!("bad orientation '{raw}'")))?;
        edge = edge.with_orientation(Orientation::from_value(value)?);
    }
    if let Some(k) = format.id_weight {
        let raw = col(k)?;
        let weight = raw
            .parse::<f64>()
            .map_err(|_| TrackError::ParseError(format!("bad weight '{raw}'")))?;
        edge = edge.with_weight(weight);
    }
    Ok((edge, source, target))
}

fn read_from<R: std::io::Read>(reader: csv::Reader<R>, format: &NetworkFormat) -> Result<Network, TrackError> {
    let crs: Crs = format.srid.parse()?;
    let mut network = Network::new();
    for (row, record) in reader.into_records().enumerate().skip(format.header) {
        let record = record?;
        let (edge, source, target) = read_edge(&record, format, crs).map_err(|e| at_line(row as u64 + 1, e))?;
        network.add_edge(edge, source, target)?;
    }
    info!(
        "network of {} nodes and {} edges read",
        network.nb_nodes(),
        network.nb_edges()
    );
    Ok(network)
}

fn csv_format(format: &NetworkFormat) -> CsvFormat {
    CsvFormat {
        separator: format.separator,
        comment: format.comment,
        ..CsvFormat::default()
    }
}

/// Read a network file.
///
/// Errors
/// ------
/// * [`TrackError::IoError`] / [`TrackError::CsvError`] when the file cannot be read,
/// * [`TrackError::ParseError`] for a line whose edge cannot be read,
/// * [`TrackError::ConfigError`] when two lines share an edge id.
pub fn read_network_csv(path: &Utf8Path, format: &NetworkFormat) -> Result<Network, TrackError> {
    let reader = csv_format(format).reader_builder()?.from_path(path)?;
    read_from(reader, format)
}

pub fn parse_network_csv(content: &str, format: &NetworkFormat) -> Result<Network, TrackError> {
    let reader = csv_format(format).reader_builder()?.from_reader(content.as_bytes());
    read_from(reader, format)
}
