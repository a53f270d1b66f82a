//! Topological utilities: projections, components, graph statistics.
//!
//! The main graph is directed with most physical pipes present as a
//! bidirectional edge pair. Several algorithms (path contraction, community
//! detection, the structural scores) operate on an undirected projection
//! instead; the two projection rules here differ deliberately in how a
//! bidirectional pair is merged, matching what their consumers need.

use crate::{capacity, Network, Pipe, UndiNetwork};
use anyhow::Result;
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet, VecDeque};

/// Summary statistics (density/degree/component counts).
#[derive(Debug)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub weakly_connected_components: usize,
    pub min_degree: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
    pub density: f64,
}

/// Calculates graph-level statistics such as density, degree distribution,
/// and component counts (classic network science measures).
pub fn graph_stats(network: &Network) -> Result<GraphStats> {
    let node_count = network.graph.node_count();
    let edge_count = network.graph.edge_count();
    let mut degrees = Vec::with_capacity(node_count);
    for node in network.graph.node_indices() {
        degrees.push(network.graph.neighbors_undirected(node).count());
    }
    let min_degree = *degrees.iter().min().unwrap_or(&0);
    let max_degree = *degrees.iter().max().unwrap_or(&0);
    let avg_degree = if node_count == 0 {
        0.0
    } else {
        degrees.iter().copied().sum::<usize>() as f64 / node_count as f64
    };
    let density = if node_count < 2 {
        0.0
    } else {
        edge_count as f64 / (node_count as f64 * (node_count as f64 - 1.0))
    };
    Ok(GraphStats {
        node_count,
        edge_count,
        weakly_connected_components: weakly_connected_components(network).len(),
        min_degree,
        avg_degree,
        max_degree,
        density,
    })
}

/// Node-id sets of every weakly connected component, largest first.
pub fn weakly_connected_components(network: &Network) -> Vec<Vec<String>> {
    let mut visited: HashSet<petgraph::graph::NodeIndex> = HashSet::new();
    let mut components = Vec::new();
    for start in network.graph.node_indices() {
        if visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        let mut members = Vec::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            members.push(network.graph[node].id.clone());
            for neighbor in network.graph.neighbors_undirected(node) {
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        if !members.is_empty() {
            components.push(members);
        }
    }
    components.sort_by_key(|members| std::cmp::Reverse(members.len()));
    components
}

/// Discards all but the largest weakly connected component.
///
/// Simplification can fragment the network; this is applied after
/// importance-based removal and is recommended after any strategy that can
/// disconnect the graph. An empty input yields an empty network.
pub fn largest_component(network: &Network) -> Network {
    let components = weakly_connected_components(network);
    match components.first() {
        Some(largest) => induced_subnetwork(network, largest.iter().map(String::as_str)),
        None => Network::new(),
    }
}

/// Builds a fresh network containing the given nodes and every edge whose
/// endpoints both survive. Rebuilding avoids in-place removal, so the
/// string-id index stays valid.
pub fn induced_subnetwork<'a>(
    network: &Network,
    ids: impl IntoIterator<Item = &'a str>,
) -> Network {
    let keep: HashSet<&str> = ids.into_iter().collect();
    let mut sub = Network::new();
    for node in network.graph.node_weights() {
        if keep.contains(node.id.as_str()) {
            sub.add_node(node.clone());
        }
    }
    for edge in network.graph.edge_references() {
        let from = &network.graph[edge.source()].id;
        let to = &network.graph[edge.target()].id;
        if keep.contains(from.as_str()) && keep.contains(to.as_str()) {
            // Both endpoints were just inserted
            let _ = sub.add_pipe(from, to, edge.weight().clone());
        }
    }
    sub
}

fn unordered_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Undirected projection for the structural/flow comparison scores.
///
/// A bidirectional edge pair merges into one undirected edge keeping the
/// maximum capacity, the total length of both directed runs, and the
/// minimum diameter and pressure.
pub fn undirected_projection(network: &Network) -> UndiNetwork {
    project(network, |merged, incoming| {
        merged.capacity = merged.capacity.max(incoming.capacity);
        merged.length_km += incoming.length_km;
        merged.diameter_mm = merged.diameter_mm.min(incoming.diameter_mm);
        merged.max_pressure_bar = merged.max_pressure_bar.min(incoming.max_pressure_bar);
        merged.norm_capacity = None;
    })
}

/// Undirected projection used by path contraction.
///
/// A bidirectional pair describes the same physical pipe twice, so the
/// merged edge averages the two lengths, keeps the minimum diameter and
/// pressure, and recomputes capacity from the merged attributes.
pub fn contraction_projection(network: &Network) -> UndiNetwork {
    project(network, |merged, incoming| {
        merged.length_km = (merged.length_km + incoming.length_km) / 2.0;
        merged.diameter_mm = merged.diameter_mm.min(incoming.diameter_mm);
        merged.max_pressure_bar = merged.max_pressure_bar.min(incoming.max_pressure_bar);
        merged.capacity = capacity::estimate_capacity(
            merged.max_pressure_bar,
            merged.diameter_mm,
            merged.length_km,
        );
        merged.norm_capacity = None;
    })
}

fn project(network: &Network, merge: impl Fn(&mut Pipe, &Pipe)) -> UndiNetwork {
    let mut merged_edges: HashMap<(String, String), Pipe> = HashMap::new();
    let mut order: Vec<(String, String)> = Vec::new();
    for edge in network.graph.edge_references() {
        let from = network.graph[edge.source()].id.as_str();
        let to = network.graph[edge.target()].id.as_str();
        let key = unordered_key(from, to);
        match merged_edges.get_mut(&key) {
            Some(existing) => merge(existing, edge.weight()),
            None => {
                merged_edges.insert(key.clone(), edge.weight().clone());
                order.push(key);
            }
        }
    }

    let mut projection = UndiNetwork::new();
    for node in network.graph.node_weights() {
        projection.add_node(node.clone());
    }
    for key in order {
        let pipe = merged_edges.remove(&key).expect("edge recorded in order");
        let _ = projection.add_pipe(&key.0, &key.1, pipe);
    }
    projection
}

/// Expands an undirected graph back into a directed one with a forward and
/// a reverse edge per undirected edge.
pub fn to_bidirected(projection: &UndiNetwork) -> Network {
    let mut network = Network::new();
    for node in projection.graph.node_weights() {
        network.add_node(node.clone());
    }
    for edge in projection.graph.edge_references() {
        let from = projection.graph[edge.source()].id.as_str();
        let to = projection.graph[edge.target()].id.as_str();
        let _ = network.add_pipe(from, to, edge.weight().clone());
        let _ = network.add_pipe(to, from, edge.weight().clone());
    }
    network
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Node;

    fn bidirectional_pair() -> Network {
        let mut network = Network::new();
        network.add_node(Node::new("X_1", (0.0, 0.0), 0.0));
        network.add_node(Node::new("X_2", (1.0, 0.0), 0.0));
        network
            .add_pipe("X_1", "X_2", Pipe::new(10.0, 500.0, 60.0))
            .unwrap();
        network
            .add_pipe("X_2", "X_1", Pipe::new(14.0, 400.0, 55.0))
            .unwrap();
        network
    }

    #[test]
    fn test_scoring_projection_merges_pairs() {
        let network = bidirectional_pair();
        let projection = undirected_projection(&network);
        assert_eq!(projection.graph.edge_count(), 1);

        let pipe = projection.graph.edge_weights().next().unwrap();
        assert!((pipe.length_km - 24.0).abs() < 1e-12);
        assert!((pipe.diameter_mm - 400.0).abs() < 1e-12);
        // Capacity keeps the larger of the two directed ratings
        let forward = Pipe::new(10.0, 500.0, 60.0);
        assert!((pipe.capacity - forward.capacity).abs() < 1e-12);
    }

    #[test]
    fn test_contraction_projection_averages_length() {
        let network = bidirectional_pair();
        let projection = contraction_projection(&network);
        let pipe = projection.graph.edge_weights().next().unwrap();
        assert!((pipe.length_km - 12.0).abs() < 1e-12);
        assert!((pipe.diameter_mm - 400.0).abs() < 1e-12);
        assert!((pipe.max_pressure_bar - 55.0).abs() < 1e-12);
        // Capacity recomputed from the merged attributes
        let expected = capacity::estimate_capacity(55.0, 400.0, 12.0);
        assert!((pipe.capacity - expected).abs() < 1e-12);
    }

    #[test]
    fn test_one_way_edge_kept_as_is() {
        let mut network = Network::new();
        network.add_node(Node::new("X_1", (0.0, 0.0), 0.0));
        network.add_node(Node::new("X_2", (1.0, 0.0), 0.0));
        network
            .add_pipe("X_1", "X_2", Pipe::new(10.0, 500.0, 60.0))
            .unwrap();
        let projection = contraction_projection(&network);
        let pipe = projection.graph.edge_weights().next().unwrap();
        assert!((pipe.length_km - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_to_bidirected_roundtrip_counts() {
        let network = bidirectional_pair();
        let projection = undirected_projection(&network);
        let expanded = to_bidirected(&projection);
        assert_eq!(expanded.graph.node_count(), 2);
        assert_eq!(expanded.graph.edge_count(), 2);
    }

    #[test]
    fn test_largest_component() {
        let mut network = Network::new();
        for id in ["X_1", "X_2", "X_3", "X_4", "X_5"] {
            network.add_node(Node::new(id, (0.0, 0.0), 0.0));
        }
        network
            .add_pipe("X_1", "X_2", Pipe::new(1.0, 100.0, 10.0))
            .unwrap();
        network
            .add_pipe("X_2", "X_3", Pipe::new(1.0, 100.0, 10.0))
            .unwrap();
        network
            .add_pipe("X_4", "X_5", Pipe::new(1.0, 100.0, 10.0))
            .unwrap();

        let largest = largest_component(&network);
        assert_eq!(largest.graph.node_count(), 3);
        assert!(largest.contains("X_1"));
        assert!(!largest.contains("X_4"));
    }

    #[test]
    fn test_largest_component_empty() {
        let largest = largest_component(&Network::new());
        assert_eq!(largest.graph.node_count(), 0);
    }

    #[test]
    fn test_graph_stats() {
        let network = bidirectional_pair();
        let stats = graph_stats(&network).unwrap();
        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.edge_count, 2);
        assert_eq!(stats.weakly_connected_components, 1);
        assert_eq!(stats.max_degree, 2);
    }
}
