//! # Shortest paths on a [`Network`]
//!
//! The forward pass ([`Network::run_routing_forward`]) is Dijkstra with a lazy-deletion
//! binary heap keyed by [`OrderedFloat`]. It stops when the popped node is the optional
//! target, or when the popped distance exceeds `cut`. In A\* mode the heap key adds
//! `astar · d(node, target)` to the tentative cost, `d` being the planar distance
//! between node coordinates; the heuristic is admissible as long as `astar · d` never
//! exceeds the true remaining cost (e.g. `astar ≤ 1` with length weights).
//!
//! The resulting [`RoutingTree`] reconstructs paths backwards from any reached node
//! ([`RoutingTree::run_routing_backward`]), stitching the edge geometries in travel order.
//!
//! Bulk distances
//! --------------
//! [`Network::all_shortest_distances`] runs one forward pass per node and collects every
//! `(source, reached) → distance`. [`Network::prepare`] stores that table on the network;
//! [`Network::prepared_shortest_distance`] reads it and returns
//! [`UNREACHABLE_DISTANCE`] for absent pairs.
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use ahash::RandomState;
use log::{debug, info};
use ordered_float::OrderedFloat;

use crate::constants::UNREACHABLE_DISTANCE;
use crate::coords::Coord;
use crate::network::{Edge, Network};
use crate::progress_bar::Progress;
use crate::time::GPSTime;
use crate::track::{Observation, Track};
use crate::track_errors::TrackError;

/// Output of a forward pass from one source.
#[derive(Debug, Clone)]
pub struct RoutingTree<'a> {
    network: &'a Network,
    pub source: String,
    distances: HashMap<String, f64, RandomState>,
    /// node → (previous node, edge used to reach it)
    antecedents: HashMap<String, (String, String), RandomState>,
}

impl RoutingTree<'_> {
    /// Distance from the source, `None` when `node` was not reached.
    pub fn distance(&self, node: &str) -> Option<f64> {
        self.distances.get(node).copied()
    }

    /// Reached nodes with their distance, sorted by node id.
    pub fn reached(&self) -> Vec<(&str, f64)> {
        let mut out: Vec<(&str, f64)> = self
            .distances
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        out.sort_unstable_by(|a, b| a.0.cmp(b.0));
        out
    }

    /// Sequence of `(edge, entry node)` from the source to `target`.
    pub fn edge_path(&self, target: &str) -> Option<Vec<(&str, &str)>> {
        self.distances.get(target)?;
        let mut path = Vec::new();
        let mut node = target;
        while node != self.source {
            let (prev, edge) = self.antecedents.get(node)?;
            path.push((edge.as_str(), prev.as_str()));
            node = prev.as_str();
        }
        path.reverse();
        Some(path)
    }

    /// Geometry of the path from the source to `target`, `None` when `target` was not
    /// reached.
    ///
    /// Each edge geometry is reversed when traversed from its target node, and the
    /// first sample of every edge after the first is dropped so that joins are not
    /// duplicated. Timestamps are the ones stored on the edge geometries.
    pub fn run_routing_backward(&self, target: &str) -> Result<Option<Track>, TrackError> {
        let Some(path) = self.edge_path(target) else {
            return Ok(None);
        };
        let mut observations: Vec<Observation> = Vec::new();
        if path.is_empty() {
            let node = self.network.get_node(target)?;
            observations.push(Observation::new(node.coord, GPSTime::zero()));
        }
        for (k, (edge_id, entry)) in path.iter().enumerate() {
            let edge = self.network.get_edge(edge_id)?;
            let mut piece: Vec<Observation> = edge.geom.iter().cloned().collect();
            if edge.source != *entry {
                piece.reverse();
            }
            let skip = usize::from(k > 0 && !piece.is_empty());
            observations.extend(piece.into_iter().skip(skip));
        }
        let mut track = Track::from_observations(observations).with_ids("", format!("{}-{target}", self.source));
        track.base = self.network.base;
        Ok(Some(track))
    }
}

impl Network {
    /// Dijkstra (or A\* when `astar` is set) from `source`.
    ///
    /// Arguments
    /// ---------
    /// * `source` – id of the start node
    /// * `target` – optional node id at which the search stops
    /// * `cut` – maximal distance explored, `f64::INFINITY` for no limit
    /// * `astar` – weight of the straight-line heuristic (needs `target`)
    ///
    /// Errors
    /// ------
    /// * [`TrackError::UnknownNode`] when `source` or `target` does not exist
    pub fn run_routing_forward(
        &self,
        source: &str,
        target: Option<&str>,
        cut: f64,
        astar: Option<f64>,
    ) -> Result<RoutingTree<'_>, TrackError> {
        self.get_node(source)?;
        let goal: Option<Coord> = match target {
            Some(t) => Some(self.get_node(t)?.coord),
            None => None,
        };
        let heuristic = |id: &str| -> f64 {
            match (astar, goal, self.nodes.get(id)) {
                (Some(w), Some(g), Some(n)) => w * n.coord.distance_2d_to(&g).unwrap_or(0.0),
                _ => 0.0,
            }
        };

        let mut distances: HashMap<String, f64, RandomState> = HashMap::default();
        let mut antecedents: HashMap<String, (String, String), RandomState> = HashMap::default();
        let mut settled: HashSet<String, RandomState> = HashSet::default();
        let mut heap = BinaryHeap::new();

        distances.insert(source.to_string(), 0.0);
        heap.push(Reverse((OrderedFloat(heuristic(source)), source.to_string())));

        while let Some(Reverse((_, node))) = heap.pop() {
            if !settled.insert(node.clone()) {
                continue;
            }
            let g = distances.get(&node).copied().unwrap_or(f64::INFINITY);
            if g > cut {
                distances.remove(&node);
                antecedents.remove(&node);
                break;
            }
            if target == Some(node.as_str()) {
                break;
            }
            for link in self.successors(&node) {
                if settled.contains(&link.node) {
                    continue;
                }
                let weight = self.edges.get(&link.edge).map_or(f64::INFINITY, |e| e.weight);
                let candidate = g + weight;
                if candidate < distances.get(&link.node).copied().unwrap_or(f64::INFINITY) {
                    distances.insert(link.node.clone(), candidate);
                    antecedents.insert(link.node.clone(), (node.clone(), link.edge.clone()));
                    heap.push(Reverse((
                        OrderedFloat(candidate + heuristic(&link.node)),
                        link.node.clone(),
                    )));
                }
            }
        }
        // tentative values beyond the frontier are not shortest distances
        distances.retain(|k, d| settled.contains(k) && *d <= cut);
        antecedents.retain(|k, _| distances.contains_key(k));
        debug!(
            "routing from {source}: {} nodes settled, {} reached",
            settled.len(),
            distances.len()
        );
        Ok(RoutingTree {
            network: self,
            source: source.to_string(),
            distances,
            antecedents,
        })
    }

    /// Geometry of the shortest path, `None` when `target` cannot be reached.
    pub fn shortest_path(&self, source: &str, target: &str) -> Result<Option<Track>, TrackError> {
        self.run_routing_forward(source, Some(target), f64::INFINITY, None)?
            .run_routing_backward(target)
    }

    /// Same as [`Network::shortest_path`] with an A\* heuristic of weight `astar`.
    pub fn shortest_path_astar(&self, source: &str, target: &str, astar: f64) -> Result<Option<Track>, TrackError> {
        self.run_routing_forward(source, Some(target), f64::INFINITY, Some(astar))?
            .run_routing_backward(target)
    }

    pub fn shortest_distance(&self, source: &str, target: &str) -> Result<Option<f64>, TrackError> {
        Ok(self
            .run_routing_forward(source, Some(target), f64::INFINITY, None)?
            .distance(target))
    }

    pub fn shortest_distance_astar(&self, source: &str, target: &str, astar: f64) -> Result<Option<f64>, TrackError> {
        Ok(self
            .run_routing_forward(source, Some(target), f64::INFINITY, Some(astar))?
            .distance(target))
    }

    /// Distances between every node and every node reachable from it within `cut`.
    pub fn all_shortest_distances(&self, cut: f64) -> Result<HashMap<(String, String), f64, RandomState>, TrackError> {
        let ids = self.node_ids();
        let mut out: HashMap<(String, String), f64, RandomState> = HashMap::default();
        let mut progress = Progress::new("all shortest distances", ids.len());
        for source in &ids {
            let tree = self.run_routing_forward(source, None, cut, None)?;
            for (reached, d) in tree.reached() {
                out.insert((source.to_string(), reached.to_string()), d);
            }
            progress.tick();
        }
        progress.finish();
        info!("{} node pairs connected within {cut}", out.len());
        Ok(out)
    }

    /// Compute and store all the shortest distances within `cut`.
    pub fn prepare(&mut self, cut: f64) -> Result<(), TrackError> {
        let table = self.all_shortest_distances(cut)?;
        self.distances = Some(table);
        Ok(())
    }

    pub fn is_prepared(&self) -> bool {
        self.distances.is_some()
    }

    /// Cached distance, [`UNREACHABLE_DISTANCE`] when absent (or when the network was
    /// not prepared).
    pub fn prepared_shortest_distance(&self, source: &str, target: &str) -> f64 {
        self.distances
            .as_ref()
            .and_then(|d| d.get(&(source.to_string(), target.to_string())))
            .copied()
            .unwrap_or(UNREACHABLE_DISTANCE)
    }

    fn node_distance(&self, a: &str, b: &str) -> Result<f64, TrackError> {
        if a == b {
            return Ok(0.0);
        }
        if self.is_prepared() {
            return Ok(self.prepared_shortest_distance(a, b));
        }
        Ok(self.shortest_distance(a, b)?.unwrap_or(UNREACHABLE_DISTANCE))
    }

    /// Network distance between a point at abscissa `s1` on `edge1` and a point at
    /// abscissa `s2` on `edge2` (abscissae measured from the source nodes along the
    /// geometries).
    ///
    /// On the same edge the distance is `|s1 − s2|`. Otherwise it is the smallest
    /// `s1 → endpoint + d(endpoint, endpoint') + endpoint' → s2` over the four endpoint
    /// pairs, using the prepared table when present. Returns [`UNREACHABLE_DISTANCE`]
    /// when no pair is connected.
    pub fn distance_on_edges(&self, edge1: &str, s1: f64, edge2: &str, s2: f64) -> Result<f64, TrackError> {
        if edge1 == edge2 {
            self.get_edge(edge1)?;
            return Ok((s1 - s2).abs());
        }
        let (e1, e2) = (self.get_edge(edge1)?, self.get_edge(edge2)?);
        let legs = |e: &Edge, s: f64| -> Result<[(String, f64); 2], TrackError> {
            let l = e.length()?;
            Ok([(e.source.clone(), s), (e.target.clone(), (l - s).max(0.0))])
        };
        let mut best = UNREACHABLE_DISTANCE;
        for (n1, d1) in legs(e1, s1)? {
            for (n2, d2) in legs(e2, s2)? {
                let between = self.node_distance(&n1, &n2)?;
                if between < UNREACHABLE_DISTANCE {
                    best = best.min(d1 + between + d2);
                }
            }
        }
        Ok(best)
    }

    /// Sub-network of the edges whose two endpoints are reached from one of `sources`
    /// within `cut`.
    pub fn sub_network_topological(&self, sources: &[&str], cut: f64) -> Result<Network, TrackError> {
        let mut visited: HashSet<String, RandomState> = HashSet::default();
        for source in sources {
            let tree = self.run_routing_forward(source, None, cut, None)?;
            visited.extend(tree.reached().into_iter().map(|(n, _)| n.to_string()));
        }
        self.filtered(|e| visited.contains(&e.source) && visited.contains(&e.target))
    }

    /// Sub-network of the edges whose nearest endpoint to one of `points` lies within
    /// `cut` (planar distance).
    pub fn sub_network_geometric(&self, points: &[Coord], cut: f64) -> Result<Network, TrackError> {
        let mut keep: HashSet<String, RandomState> = HashSet::default();
        for edge in self.edges() {
            let ends = [self.get_node(&edge.source)?.coord, self.get_node(&edge.target)?.coord];
            for p in points {
                let nearest = ends
                    .iter()
                    .map(|c| c.distance_2d_to(p))
                    .collect::<Result<Vec<_>, _>>()?
                    .into_iter()
                    .fold(f64::INFINITY, f64::min);
                if nearest <= cut {
                    keep.insert(edge.id.clone());
                    break;
                }
            }
        }
        self.filtered(|e| keep.contains(&e.id))
    }
}

#[cfg(test)]
mod routing_test {
    use super::*;
    use crate::network::network_test::{node, straight};
    use crate::network::{Node, Orientation};
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn id(i: usize, j: usize) -> String {
        format!("{i}_{j}")
    }

    /// `n × n` unit grid, optionally with both diagonals of each cell at weight 1.
    pub(crate) fn grid(n: usize, diagonals: bool) -> Network {
        let nodes: Vec<Vec<Node>> = (0..n)
            .map(|i| (0..n).map(|j| node(&id(i, j), i as f64, j as f64)).collect())
            .collect();
        let mut net = Network::new();
        let mut add = |a: &Node, b: &Node, weight: Option<f64>| {
            let mut e = straight(&format!("{}-{}", a.id, b.id), a, b);
            if let Some(w) = weight {
                e = e.with_weight(w);
            }
            net.add_edge(e, a.clone(), b.clone()).unwrap();
        };
        for i in 0..n {
            for j in 0..n {
                if i + 1 < n {
                    add(&nodes[i][j], &nodes[i + 1][j], None);
                }
                if j + 1 < n {
                    add(&nodes[i][j], &nodes[i][j + 1], None);
                }
                if diagonals && i + 1 < n && j + 1 < n {
                    add(&nodes[i][j], &nodes[i + 1][j + 1], Some(1.0));
                    add(&nodes[i + 1][j], &nodes[i][j + 1], Some(1.0));
                }
            }
        }
        net
    }

    #[test]
    fn test_square_grid_with_diagonals() {
        let net = grid(4, true);
        assert_eq!(net.shortest_distance("0_0", "1_1").unwrap(), Some(1.0));
        assert_eq!(net.shortest_distance("0_0", "3_3").unwrap(), Some(3.0));
        assert_eq!(net.shortest_distance("2_1", "2_1").unwrap(), Some(0.0));
    }

    #[test]
    fn test_path_geometry_is_stitched() {
        let net = grid(3, false);
        let path = net.shortest_path("2_2", "0_2").unwrap().unwrap();
        // two edges traversed against their stored direction, join not duplicated
        assert_eq!(path.size(), 3);
        assert_eq!(path.get_x(), vec![2.0, 1.0, 0.0]);
        assert_abs_diff_eq!(path.length().unwrap(), 2.0, epsilon = 1e-12);
        let single = net.shortest_path("1_1", "1_1").unwrap().unwrap();
        assert_eq!(single.size(), 1);
    }

    #[test]
    fn test_oriented_edges_and_unreachable() {
        let (a, b) = (node("a", 0., 0.), node("b", 5., 0.));
        let mut net = Network::new();
        net.add_edge(
            straight("ab", &a, &b).with_orientation(Orientation::Forward),
            a,
            b,
        )
        .unwrap();
        assert_eq!(net.shortest_distance("a", "b").unwrap(), Some(5.0));
        assert_eq!(net.shortest_distance("b", "a").unwrap(), None);
        assert!(net.shortest_path("b", "a").unwrap().is_none());
        assert!(matches!(net.shortest_distance("a", "q"), Err(TrackError::UnknownNode(_))));
    }

    #[test]
    fn test_cut_limits_exploration() {
        let net = grid(5, false);
        let tree = net.run_routing_forward("0_0", None, 2.0, None).unwrap();
        assert_eq!(tree.reached().len(), 6);
        assert!(tree.reached().iter().all(|(_, d)| *d <= 2.0));
        assert_eq!(tree.distance("4_4"), None);
    }

    #[test]
    fn test_astar_matches_dijkstra() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut net = grid(6, false);
        // random weights never below the geometric length keep the heuristic admissible
        let ids: Vec<String> = net.edges().map(|e| e.id.clone()).collect();
        for id in ids {
            let extra: f64 = rng.random_range(0.0..3.0);
            if let Some(e) = net.edges.get_mut(&id) {
                e.weight += extra;
            }
        }
        for _ in 0..20 {
            let a = id(rng.random_range(0..6), rng.random_range(0..6));
            let b = id(rng.random_range(0..6), rng.random_range(0..6));
            let d = net.shortest_distance(&a, &b).unwrap().unwrap();
            let h = net.shortest_distance_astar(&a, &b, 1.0).unwrap().unwrap();
            assert_abs_diff_eq!(d, h, epsilon = 1e-9);
            let back = net.shortest_distance(&b, &a).unwrap().unwrap();
            assert_abs_diff_eq!(d, back, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_prepared_distances() {
        let mut net = grid(3, false);
        assert_eq!(net.prepared_shortest_distance("0_0", "2_2"), UNREACHABLE_DISTANCE);
        net.prepare(f64::INFINITY).unwrap();
        assert_eq!(net.prepared_shortest_distance("0_0", "2_2"), 4.0);
        assert_eq!(net.prepared_shortest_distance("1_1", "1_1"), 0.0);
        assert_eq!(net.prepared_shortest_distance("0_0", "nope"), UNREACHABLE_DISTANCE);
        let all = net.all_shortest_distances(1.0).unwrap();
        // every node reaches itself and its 2 to 4 neighbours
        assert_eq!(all.len(), 9 + 2 * 12);
    }

    #[test]
    fn test_distance_on_edges() {
        let net = grid(3, false);
        // edge 0_0-1_0 runs along x from (0,0); edge 1_2-2_2 along x from (1,2)
        assert_abs_diff_eq!(net.distance_on_edges("0_0-1_0", 0.2, "0_0-1_0", 0.7).unwrap(), 0.5);
        let d = net.distance_on_edges("0_0-1_0", 0.5, "1_2-2_2", 0.5).unwrap();
        assert_abs_diff_eq!(d, 0.5 + 2.0 + 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_sub_networks() {
        let net = grid(4, false);
        let topo = net.sub_network_topological(&["0_0"], 1.0).unwrap();
        assert_eq!(topo.nb_edges(), 2);
        assert_eq!(topo.nb_nodes(), 3);
        let geo = net
            .sub_network_geometric(&[Coord::enu(3.0, 3.0, 0.0)], 0.5)
            .unwrap();
        assert_eq!(geo.nb_edges(), 2);
    }
}
