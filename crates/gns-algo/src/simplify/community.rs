//! Capacity-weighted community detection (Louvain) and the clustered
//! network it induces.
//!
//! Communities are found on the undirected view of the network with pipe
//! capacity as edge weight, so tightly coupled high-throughput regions end
//! up in one cluster. Node visiting order is shuffled with a seeded RNG,
//! making runs reproducible for a fixed seed.

use super::cluster_build::build_clustered_network;
use super::Simplified;
use crate::cluster::DEFAULT_SEED;
use gns_core::{Diagnostics, Network};
use petgraph::visit::EdgeRef;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::collections::HashMap;
use tracing::info;

/// Partition the network's nodes into capacity-weighted Louvain
/// communities. Returns a cluster label per node id; labels are compact
/// (0..num_communities) and ordered by first appearance.
pub fn detect_communities(network: &Network, seed: u64) -> HashMap<String, usize> {
    let ids: Vec<String> = network.node_ids().map(str::to_string).collect();
    let index: HashMap<&str, usize> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    // Undirected weighted adjacency; parallel and reverse pipes add up
    let mut weights: HashMap<(usize, usize), f64> = HashMap::new();
    for edge in network.graph.edge_references() {
        let a = index[network.graph[edge.source()].id.as_str()];
        let b = index[network.graph[edge.target()].id.as_str()];
        let key = if a <= b { (a, b) } else { (b, a) };
        *weights.entry(key).or_insert(0.0) += edge.weight().capacity.max(0.0);
    }
    let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); ids.len()];
    for (&(a, b), &w) in &weights {
        adjacency[a].push((b, w));
        if a != b {
            adjacency[b].push((a, w));
        }
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let levels = louvain(&adjacency, &mut rng);

    // Collapse the hierarchy to a final label per leaf node
    let mut labels: Vec<usize> = (0..ids.len()).collect();
    for level in &levels {
        for label in labels.iter_mut() {
            *label = level[*label];
        }
    }

    // Compact labels in first-appearance order
    let mut remap: HashMap<usize, usize> = HashMap::new();
    let mut assignment = HashMap::new();
    for (i, id) in ids.into_iter().enumerate() {
        let next = remap.len();
        let compact = *remap.entry(labels[i]).or_insert(next);
        assignment.insert(id, compact);
    }
    assignment
}

/// Capacity-weighted modularity of a partition, for judging how clean the
/// detected community structure is. Degenerate graphs score 0.
pub fn modularity(network: &Network, assignment: &HashMap<String, usize>) -> f64 {
    let mut total = 0.0;
    let mut intra: HashMap<usize, f64> = HashMap::new();
    let mut degree: HashMap<usize, f64> = HashMap::new();
    for edge in network.graph.edge_references() {
        let a = &network.graph[edge.source()].id;
        let b = &network.graph[edge.target()].id;
        let w = edge.weight().capacity.max(0.0);
        total += w;
        let (Some(&ca), Some(&cb)) = (assignment.get(a), assignment.get(b)) else {
            continue;
        };
        *degree.entry(ca).or_insert(0.0) += w;
        *degree.entry(cb).or_insert(0.0) += w;
        if ca == cb {
            *intra.entry(ca).or_insert(0.0) += w;
        }
    }
    if total <= 0.0 {
        return 0.0;
    }
    degree
        .iter()
        .map(|(community, &deg)| {
            let within = intra.get(community).copied().unwrap_or(0.0);
            within / total - (deg / (2.0 * total)).powi(2)
        })
        .sum()
}

/// Simplify by collapsing Louvain communities into super-nodes.
pub fn community_clustering(original: &Network, seed: u64) -> Simplified {
    let assignment = detect_communities(original, seed);
    let clusters = assignment.values().collect::<std::collections::HashSet<_>>().len();
    let modularity = modularity(original, &assignment);
    let network = build_clustered_network(original, &assignment);
    info!(
        nodes = original.graph.node_count(),
        clusters, modularity, "community clustering complete"
    );
    Simplified {
        network,
        diagnostics: Diagnostics::new(),
    }
}

/// Simplify by Louvain communities with the default seed.
pub fn community_clustering_default(original: &Network) -> Simplified {
    community_clustering(original, DEFAULT_SEED)
}

/// One Louvain level: local moving until no single move improves
/// modularity, then the graph is aggregated and the next level runs on the
/// community graph. Returns the community assignment of each level.
fn louvain(adjacency: &[Vec<(usize, f64)>], rng: &mut StdRng) -> Vec<Vec<usize>> {
    let mut levels: Vec<Vec<usize>> = Vec::new();
    let mut graph: Vec<Vec<(usize, f64)>> = adjacency.to_vec();

    loop {
        let (assignment, moved) = local_moving(&graph, rng);
        if !moved && !levels.is_empty() {
            break;
        }
        // Compact community ids
        let mut remap: HashMap<usize, usize> = HashMap::new();
        let compact: Vec<usize> = assignment
            .iter()
            .map(|&c| {
                let next = remap.len();
                *remap.entry(c).or_insert(next)
            })
            .collect();
        levels.push(compact.clone());
        if !moved {
            break;
        }

        // Aggregate: communities become nodes, weights sum, intra-community
        // weight becomes a self-loop
        let num_communities = remap.len();
        let mut aggregated_weights: HashMap<(usize, usize), f64> = HashMap::new();
        for (node, neighbors) in graph.iter().enumerate() {
            for &(neighbor, weight) in neighbors {
                if neighbor < node {
                    continue;
                }
                let (a, b) = (compact[node], compact[neighbor]);
                let key = if a <= b { (a, b) } else { (b, a) };
                *aggregated_weights.entry(key).or_insert(0.0) += weight;
            }
        }
        let mut next: Vec<Vec<(usize, f64)>> = vec![Vec::new(); num_communities];
        for (&(a, b), &w) in &aggregated_weights {
            next[a].push((b, w));
            if a != b {
                next[b].push((a, w));
            }
        }
        if next.len() == graph.len() {
            break;
        }
        graph = next;
    }
    levels
}

/// Greedy local moving phase. Returns per-node community and whether any
/// node changed community.
fn local_moving(graph: &[Vec<(usize, f64)>], rng: &mut StdRng) -> (Vec<usize>, bool) {
    let n = graph.len();
    let mut community: Vec<usize> = (0..n).collect();
    let degree: Vec<f64> = graph
        .iter()
        .enumerate()
        .map(|(node, neighbors)| {
            neighbors
                .iter()
                .map(|&(neighbor, w)| if neighbor == node { 2.0 * w } else { w })
                .sum()
        })
        .collect();
    let total: f64 = degree.iter().sum();
    if total <= 0.0 {
        return (community, false);
    }
    let mut community_degree: Vec<f64> = degree.clone();

    let mut order: Vec<usize> = (0..n).collect();
    let mut any_moved = false;
    loop {
        order.shuffle(rng);
        let mut moved_this_pass = false;
        for &node in &order {
            let own = community[node];
            community_degree[own] -= degree[node];

            // Weight from node into each adjacent community
            let mut link_weight: HashMap<usize, f64> = HashMap::new();
            for &(neighbor, w) in &graph[node] {
                if neighbor != node {
                    *link_weight.entry(community[neighbor]).or_insert(0.0) += w;
                }
            }

            let mut best_community = own;
            let mut best_gain = gain(&link_weight, own, &community_degree, degree[node], total);
            // Sorted candidate order keeps tie-breaking deterministic
            let mut candidates: Vec<usize> = link_weight.keys().copied().collect();
            candidates.sort_unstable();
            for candidate in candidates {
                let candidate_gain =
                    gain(&link_weight, candidate, &community_degree, degree[node], total);
                if candidate_gain > best_gain {
                    best_community = candidate;
                    best_gain = candidate_gain;
                }
            }

            community[node] = best_community;
            community_degree[best_community] += degree[node];
            if best_community != own {
                moved_this_pass = true;
                any_moved = true;
            }
        }
        if !moved_this_pass {
            break;
        }
    }
    (community, any_moved)
}

fn gain(
    link_weight: &HashMap<usize, f64>,
    candidate: usize,
    community_degree: &[f64],
    node_degree: f64,
    total: f64,
) -> f64 {
    let k_in = link_weight.get(&candidate).copied().unwrap_or(0.0);
    k_in - community_degree[candidate] * node_degree / total
}
