//! # Road network
//!
//! A [`Network`] is a directed multigraph whose edges carry a polyline geometry (a
//! [`Track`]). Nodes and edges live in id-keyed maps and every relation between them is
//! stored by id, so the graph holds no reference cycle.
//!
//! ## Orientation
//!
//! | [`Orientation`] | value | traversable                 |
//! |-----------------|-------|-----------------------------|
//! | `Forward`       | `+1`  | source → target             |
//! | `Both`          | `0`   | both directions             |
//! | `Backward`      | `-1`  | target → source             |
//!
//! Adjacency is maintained on insertion: a traversable direction `u → v` through edge
//! `e` registers `(e, v)` in the successors of `u` and `(e, u)` in the predecessors of
//! `v`. Every edge is also listed among the incident edges of both endpoints whatever
//! its orientation.
//!
//! Shortest paths, all-pairs distances and sub-network extraction are in [`routing`].
pub mod routing;

use std::collections::HashMap;

use ahash::RandomState;
use log::debug;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::Meter;
use crate::coords::{bbox::BBox, Coord};
use crate::geometry::{simplification::SimplifyMode, Pt};
use crate::spatial_index::{Indexable, SpatialIndex};
use crate::track::Track;
use crate::track_errors::TrackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Orientation {
    Forward,
    #[default]
    Both,
    Backward,
}

impl Orientation {
    pub fn value(&self) -> i8 {
        match self {
            Orientation::Forward => 1,
            Orientation::Both => 0,
            Orientation::Backward => -1,
        }
    }

    pub fn from_value(value: i64) -> Result<Self, TrackError> {
        match value {
            1 => Ok(Orientation::Forward),
            0 => Ok(Orientation::Both),
            -1 => Ok(Orientation::Backward),
            other => Err(TrackError::ParseError(format!(
                "edge orientation must be -1, 0 or 1, got {other}"
            ))),
        }
    }

    fn forward(&self) -> bool {
        *self != Orientation::Backward
    }

    fn backward(&self) -> bool {
        *self != Orientation::Forward
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub coord: Coord,
}

impl Node {
    pub fn new(id: impl Into<String>, coord: Coord) -> Self {
        Node { id: id.into(), coord }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: String,
    pub geom: Track,
    pub source: String,
    pub target: String,
    pub orientation: Orientation,
    /// Traversal cost, the geometry length unless set explicitly
    pub weight: f64,
}

impl Edge {
    /// Bidirectional edge weighted by the length of its geometry. Endpoints are set by
    /// [`Network::add_edge`].
    pub fn new(id: impl Into<String>, geom: Track) -> Result<Self, TrackError> {
        let weight = geom.length()?;
        Ok(Edge {
            id: id.into(),
            geom,
            source: String::new(),
            target: String::new(),
            orientation: Orientation::Both,
            weight,
        })
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn length(&self) -> Result<Meter, TrackError> {
        self.geom.length()
    }
}

/// One traversable step: leave through `edge` to reach `node`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    pub edge: String,
    pub node: String,
}

type IdMap<V> = HashMap<String, V, RandomState>;
/// Per-node adjacency, road nodes rarely have more than four links.
type Links = SmallVec<[Link; 4]>;

#[derive(Debug, Clone, Default)]
pub struct Network {
    nodes: IdMap<Node>,
    edges: IdMap<Edge>,
    edge_order: Vec<String>,
    next: IdMap<Links>,
    prev: IdMap<Links>,
    incident: IdMap<SmallVec<[String; 4]>>,
    /// Base of ENU coordinates, when known
    pub base: Option<Coord>,
    pub(crate) distances: Option<HashMap<(String, String), f64, RandomState>>,
}

impl Network {
    pub fn new() -> Self {
        Network::default()
    }

    /// Insert `edge` between `source` and `target`. Nodes already present (by id) are
    /// kept as they are.
    ///
    /// Errors
    /// ------
    /// * [`TrackError::ConfigError`] when an edge with the same id exists
    pub fn add_edge(&mut self, mut edge: Edge, source: Node, target: Node) -> Result<(), TrackError> {
        if self.edges.contains_key(&edge.id) {
            return Err(TrackError::ConfigError(format!("duplicate edge id {}", edge.id)));
        }
        edge.source = source.id.clone();
        edge.target = target.id.clone();
        for node in [source, target] {
            self.nodes.entry(node.id.clone()).or_insert(node);
        }
        let (s, t, e) = (edge.source.clone(), edge.target.clone(), edge.id.clone());
        if edge.orientation.forward() {
            self.link(&s, &t, &e);
        }
        if edge.orientation.backward() {
            self.link(&t, &s, &e);
        }
        self.incident.entry(s.clone()).or_default().push(e.clone());
        if t != s {
            self.incident.entry(t).or_default().push(e.clone());
        }
        self.edge_order.push(e.clone());
        self.edges.insert(e, edge);
        self.distances = None;
        Ok(())
    }

    fn link(&mut self, from: &str, to: &str, edge: &str) {
        self.next.entry(from.to_string()).or_default().push(Link {
            edge: edge.to_string(),
            node: to.to_string(),
        });
        self.prev.entry(to.to_string()).or_default().push(Link {
            edge: edge.to_string(),
            node: from.to_string(),
        });
    }

    pub fn nb_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn nb_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn get_node(&self, id: &str) -> Result<&Node, TrackError> {
        self.nodes
            .get(id)
            .ok_or_else(|| TrackError::UnknownNode(id.to_string()))
    }

    pub fn get_edge(&self, id: &str) -> Result<&Edge, TrackError> {
        self.edges
            .get(id)
            .ok_or_else(|| TrackError::UnknownEdge(id.to_string()))
    }

    /// Node ids, sorted.
    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edge_order.iter().filter_map(|id| self.edges.get(id))
    }

    pub(crate) fn successors(&self, id: &str) -> &[Link] {
        self.next.get(id).map(|l| l.as_slice()).unwrap_or(&[])
    }

    pub(crate) fn predecessors(&self, id: &str) -> &[Link] {
        self.prev.get(id).map(|l| l.as_slice()).unwrap_or(&[])
    }

    fn checked(&self, id: &str) -> Result<(), TrackError> {
        self.get_node(id).map(|_| ())
    }

    pub fn get_next_nodes(&self, id: &str) -> Result<Vec<&str>, TrackError> {
        self.checked(id)?;
        Ok(self.successors(id).iter().map(|l| l.node.as_str()).collect())
    }

    pub fn get_next_edges(&self, id: &str) -> Result<Vec<&str>, TrackError> {
        self.checked(id)?;
        Ok(self.successors(id).iter().map(|l| l.edge.as_str()).collect())
    }

    pub fn get_prev_nodes(&self, id: &str) -> Result<Vec<&str>, TrackError> {
        self.checked(id)?;
        Ok(self.predecessors(id).iter().map(|l| l.node.as_str()).collect())
    }

    pub fn get_prev_edges(&self, id: &str) -> Result<Vec<&str>, TrackError> {
        self.checked(id)?;
        Ok(self.predecessors(id).iter().map(|l| l.edge.as_str()).collect())
    }

    /// Nodes sharing an edge with `id`, whatever the orientation, sorted and unique.
    pub fn get_adjacent_nodes(&self, id: &str) -> Result<Vec<&str>, TrackError> {
        let mut nodes: Vec<&str> = self
            .get_incident_edges(id)?
            .into_iter()
            .filter_map(|e| self.edges.get(e))
            .map(|e| if e.source == id { e.target.as_str() } else { e.source.as_str() })
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        Ok(nodes)
    }

    pub fn get_incident_edges(&self, id: &str) -> Result<Vec<&str>, TrackError> {
        self.checked(id)?;
        Ok(self
            .incident
            .get(id)
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default())
    }

    /// Number of incident edges.
    pub fn degree(&self, id: &str) -> Result<usize, TrackError> {
        Ok(self.get_incident_edges(id)?.len())
    }

    pub fn degree_in(&self, id: &str) -> Result<usize, TrackError> {
        self.checked(id)?;
        Ok(self.predecessors(id).len())
    }

    pub fn degree_out(&self, id: &str) -> Result<usize, TrackError> {
        self.checked(id)?;
        Ok(self.successors(id).len())
    }

    /// Sum of the edge geometry lengths.
    pub fn total_length(&self) -> Result<Meter, TrackError> {
        self.edges.values().map(Edge::length).sum()
    }

    /// Simplify every edge geometry, return the number of removed vertices. Weights are
    /// left untouched.
    pub fn simplify(&mut self, tolerance: f64, mode: SimplifyMode) -> Result<usize, TrackError> {
        let mut removed = 0;
        for edge in self.edges.values_mut() {
            removed += edge.geom.simplify(tolerance, mode)?;
        }
        debug!("network simplification removed {removed} vertices");
        Ok(removed)
    }

    /// Convert nodes and edge geometries to ENU around `base`, or around the first node
    /// of the first edge when `base` is `None`.
    pub fn to_enu_coords(&mut self, base: Option<Coord>) -> Result<(), TrackError> {
        let base = match base {
            Some(b) => b,
            None => {
                let first = self
                    .edges()
                    .next()
                    .ok_or_else(|| TrackError::ConfigError("empty network".into()))?;
                self.get_node(&first.source)?.coord.to_geo(self.base.as_ref())?
            }
        };
        let old_base = self.base;
        for node in self.nodes.values_mut() {
            node.coord = node.coord.to_geo(old_base.as_ref())?.to_enu(&base)?;
        }
        for edge in self.edges.values_mut() {
            if old_base.is_some() && edge.geom.base.is_none() {
                edge.geom.base = old_base;
            }
            edge.geom.to_enu_coords(Some(base))?;
        }
        self.base = Some(base);
        self.distances = None;
        Ok(())
    }

    /// Convert nodes and edge geometries to geodetic coordinates.
    pub fn to_geo_coords(&mut self, base: Option<Coord>) -> Result<(), TrackError> {
        let base = base.or(self.base);
        for node in self.nodes.values_mut() {
            node.coord = node.coord.to_geo(base.as_ref())?;
        }
        for edge in self.edges.values_mut() {
            edge.geom.to_geo_coords(base)?;
        }
        self.base = None;
        self.distances = None;
        Ok(())
    }

    /// Planar extent of the nodes and edge geometries.
    pub fn bbox(&self) -> Result<BBox, TrackError> {
        let nodes = self.nodes.values().map(|n| (n.coord.x(), n.coord.y()));
        let vertices = self
            .edges
            .values()
            .flat_map(|e| e.geom.iter().map(|o| (o.position.x(), o.position.y())));
        BBox::from_points(nodes.chain(vertices)).ok_or(TrackError::EmptyTrack)
    }

    pub fn create_spatial_index(&self, resolution: (f64, f64), margin: f64) -> Result<SpatialIndex, TrackError> {
        SpatialIndex::new(self, resolution, margin)
    }

    /// Edge id of a member index of a spatial index built over this network.
    pub fn edge_id_of_member(&self, member: usize) -> Result<&str, TrackError> {
        self.edge_order
            .get(member)
            .map(String::as_str)
            .ok_or(TrackError::OutOfRange {
                index: member,
                len: self.edge_order.len(),
            })
    }

    /// Copy of the network restricted to the edges accepted by `keep`.
    pub(crate) fn filtered(&self, mut keep: impl FnMut(&Edge) -> bool) -> Result<Network, TrackError> {
        let mut out = Network {
            base: self.base,
            ..Network::default()
        };
        for edge in self.edges().filter(|e| keep(e)) {
            let source = self.get_node(&edge.source)?.clone();
            let target = self.get_node(&edge.target)?.clone();
            out.add_edge(edge.clone(), source, target)?;
        }
        Ok(out)
    }
}

impl Indexable for Network {
    fn polylines(&self) -> Vec<Vec<Pt>> {
        self.edges().map(|e| e.geom.planar_points()).collect()
    }

    fn extent(&self) -> Result<BBox, TrackError> {
        self.bbox()
    }
}

#[cfg(test)]
pub(crate) mod network_test {
    use super::*;
    use crate::track::enu_track;
    use approx::assert_abs_diff_eq;

    pub(crate) fn node(id: &str, e: f64, n: f64) -> Node {
        Node::new(id, Coord::enu(e, n, 0.0))
    }

    pub(crate) fn straight(id: &str, a: &Node, b: &Node) -> Edge {
        let geom = enu_track(&[(a.coord.x(), a.coord.y(), 0.0), (b.coord.x(), b.coord.y(), 0.0)], 1.0);
        Edge::new(id, geom).unwrap()
    }

    /// `a → b` one way, `b – c` both ways, `d → c` backwards (so `c → d`).
    fn sample() -> Network {
        let (a, b, c, d) = (node("a", 0., 0.), node("b", 1., 0.), node("c", 1., 1.), node("d", 0., 1.));
        let mut net = Network::new();
        net.add_edge(
            straight("ab", &a, &b).with_orientation(Orientation::Forward),
            a.clone(),
            b.clone(),
        )
        .unwrap();
        net.add_edge(straight("bc", &b, &c), b.clone(), c.clone()).unwrap();
        net.add_edge(
            straight("dc", &d, &c).with_orientation(Orientation::Backward),
            d.clone(),
            c.clone(),
        )
        .unwrap();
        net
    }

    #[test]
    fn test_adjacency_follows_orientation() {
        let net = sample();
        assert_eq!(net.nb_nodes(), 4);
        assert_eq!(net.nb_edges(), 3);
        assert_eq!(net.get_next_nodes("a").unwrap(), vec!["b"]);
        assert!(net.get_prev_nodes("a").unwrap().is_empty());
        assert_eq!(net.get_next_nodes("b").unwrap(), vec!["c"]);
        assert_eq!(net.get_prev_nodes("b").unwrap(), vec!["a", "c"]);
        assert_eq!(net.get_next_nodes("c").unwrap(), vec!["b", "d"]);
        assert_eq!(net.get_next_edges("c").unwrap(), vec!["bc", "dc"]);
        assert!(net.get_next_nodes("d").unwrap().is_empty());
        assert_eq!(net.get_prev_edges("d").unwrap(), vec!["dc"]);
        assert_eq!(net.get_adjacent_nodes("c").unwrap(), vec!["b", "d"]);
        assert_eq!(net.get_incident_edges("b").unwrap(), vec!["ab", "bc"]);
        assert_eq!(net.degree("c").unwrap(), 2);
        assert_eq!(net.degree_in("b").unwrap(), 2);
        assert_eq!(net.degree_out("a").unwrap(), 1);
        assert_eq!(net.get_next_nodes("zz"), Err(TrackError::UnknownNode("zz".into())));
    }

    #[test]
    fn test_duplicate_edge_and_lengths() {
        let mut net = sample();
        let (a, b) = (node("a", 0., 0.), node("b", 1., 0.));
        assert!(matches!(
            net.add_edge(straight("ab", &a, &b), a, b),
            Err(TrackError::ConfigError(_))
        ));
        assert_abs_diff_eq!(net.total_length().unwrap(), 3.0, epsilon = 1e-12);
        assert_eq!(net.get_edge("bc").unwrap().weight, 1.0);
        assert!(net.get_edge("xx").is_err());
    }

    #[test]
    fn test_geo_round_trip() {
        let mut net = sample();
        let base = Coord::geo(2.35, 48.85, 35.0);
        net.base = Some(base);
        net.to_geo_coords(None).unwrap();
        assert!(matches!(net.get_node("a").unwrap().coord, Coord::Geo { .. }));
        net.to_enu_coords(Some(base)).unwrap();
        let c = net.get_node("c").unwrap().coord;
        assert_abs_diff_eq!(c.x(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(c.y(), 1.0, epsilon = 1e-6);
        let g = &net.get_edge("bc").unwrap().geom;
        assert_abs_diff_eq!(g.get_y()[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_spatial_index_over_edges() {
        let net = sample();
        let index = net.create_spatial_index((0.25, 0.25), 0.1).unwrap();
        let hits = index.request_point(0.5, 0.02);
        assert_eq!(hits.len(), 1);
        assert_eq!(net.edge_id_of_member(hits[0].member).unwrap(), "ab");
    }
}
