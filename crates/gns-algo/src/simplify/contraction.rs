//! Path contraction: series pipes through pass-through junctions collapse
//! into single equivalent pipes.
//!
//! Works on the undirected projection (a bidirectional pair is one physical
//! pipe). Every maximal chain whose interior nodes have degree 2 is
//! replaced by one edge with the summed length, the minimum diameter and
//! pressure along the chain, and a capacity recomputed from those merged
//! attributes. The result is re-expanded into a bidirectional directed
//! graph, protected stations are reconnected, and normalized capacities are
//! refreshed.

use super::Simplified;
use crate::reconnect;
use gns_core::{
    capacity, contraction_projection, to_bidirected, Diagnostics, Network, Pipe, PipeKind,
};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Collapse all degree-2 chains of the network. Nodes matching a
/// `protected` prefix are restored through the reconnection layer.
pub fn path_contraction(original: &Network, protected: &[&str]) -> Simplified {
    let mut diagnostics = Diagnostics::new();
    let projection = contraction_projection(original);

    // Undirected adjacency with merged pipe attributes
    let mut adjacency: HashMap<String, Vec<(String, Pipe)>> = HashMap::new();
    for id in projection.node_ids() {
        adjacency.insert(id.to_string(), Vec::new());
    }
    for edge in projection.graph.edge_references() {
        let a = projection.graph[edge.source()].id.clone();
        let b = projection.graph[edge.target()].id.clone();
        adjacency
            .get_mut(&a)
            .expect("endpoint present")
            .push((b.clone(), edge.weight().clone()));
        adjacency
            .get_mut(&b)
            .expect("endpoint present")
            .push((a, edge.weight().clone()));
    }

    let is_interior =
        |id: &str, adjacency: &HashMap<String, Vec<(String, Pipe)>>| adjacency[id].len() == 2;

    let mut absorbed: HashSet<String> = HashSet::new();
    let mut merged_edges: Vec<(String, String, Pipe)> = Vec::new();

    // Walk every maximal chain starting from a non-interior endpoint
    let mut endpoints: Vec<String> = adjacency
        .keys()
        .filter(|id| !is_interior(id, &adjacency))
        .cloned()
        .collect();
    endpoints.sort();

    let mut chain_visited: HashSet<(String, String)> = HashSet::new();
    for start in &endpoints {
        for (first_hop, first_pipe) in adjacency[start].clone() {
            if !chain_visited.insert(edge_key(start, &first_hop)) {
                continue;
            }
            if !is_interior(&first_hop, &adjacency) {
                // Direct edge between two kept nodes, carried over verbatim
                merged_edges.push((start.clone(), first_hop.clone(), first_pipe));
                continue;
            }

            // Accumulate along the chain
            let mut merged = first_pipe;
            let mut prev = start.clone();
            let mut current = first_hop.clone();
            while is_interior(&current, &adjacency) {
                absorbed.insert(current.clone());
                let (next, pipe) = adjacency[&current]
                    .iter()
                    .find(|(n, _)| *n != prev)
                    .cloned()
                    .unwrap_or_else(|| adjacency[&current][0].clone());
                chain_visited.insert(edge_key(&current, &next));
                merged.length_km += pipe.length_km;
                merged.diameter_mm = merged.diameter_mm.min(pipe.diameter_mm);
                merged.max_pressure_bar = merged.max_pressure_bar.min(pipe.max_pressure_bar);
                prev = current;
                current = next;
            }

            // A chain that loops back onto its own start would merge into
            // a self-loop; the tie is skipped and its interior absorbed
            if &current == start {
                diagnostics.add_warning_with_entity(
                    "contraction",
                    "degree-2 loop back onto its start collapsed away",
                    start,
                );
                continue;
            }
            merged.capacity = capacity::estimate_capacity(
                merged.max_pressure_bar,
                merged.diameter_mm,
                merged.length_km,
            );
            merged.norm_capacity = None;
            merged.kind = PipeKind::Contracted;
            merged_edges.push((start.clone(), current, merged));
        }
    }

    // Components in which every node has degree 2 are isolated rings: no
    // endpoint exists to start a walk from. Each ring collapses to its
    // anchor (smallest id) and the anchor's first neighbor, joined by one
    // pipe merged around the full cycle.
    let mut ring_anchors: Vec<String> = adjacency
        .keys()
        .filter(|id| is_interior(id, &adjacency) && !absorbed.contains(*id))
        .cloned()
        .collect();
    ring_anchors.sort();
    for anchor in ring_anchors {
        if absorbed.contains(&anchor) {
            continue;
        }
        let (second, first_pipe) = adjacency[&anchor][0].clone();
        if !chain_visited.insert(edge_key(&anchor, &second)) {
            continue;
        }
        let mut merged = first_pipe;
        let mut prev = anchor.clone();
        let mut current = second.clone();
        while current != anchor {
            if current != second {
                absorbed.insert(current.clone());
            }
            let (next, pipe) = adjacency[&current]
                .iter()
                .find(|(n, _)| *n != prev)
                .cloned()
                .unwrap_or_else(|| adjacency[&current][0].clone());
            chain_visited.insert(edge_key(&current, &next));
            merged.length_km += pipe.length_km;
            merged.diameter_mm = merged.diameter_mm.min(pipe.diameter_mm);
            merged.max_pressure_bar = merged.max_pressure_bar.min(pipe.max_pressure_bar);
            prev = current;
            current = next;
        }
        merged.capacity = capacity::estimate_capacity(
            merged.max_pressure_bar,
            merged.diameter_mm,
            merged.length_km,
        );
        merged.norm_capacity = None;
        merged.kind = PipeKind::Contracted;
        merged_edges.push((anchor, second, merged));
    }

    // Rebuild: kept nodes plus merged undirected edges, expanded to a
    // bidirectional directed graph
    let mut contracted = gns_core::UndiNetwork::new();
    for node in projection.graph.node_weights() {
        if !absorbed.contains(&node.id) {
            contracted.add_node(node.clone());
        }
    }
    let mut seen: HashSet<(String, String)> = HashSet::new();
    for (a, b, pipe) in merged_edges {
        if !seen.insert(edge_key(&a, &b)) {
            continue;
        }
        // Both endpoints are kept nodes
        contracted
            .add_pipe(&a, &b, pipe)
            .expect("merged edge between kept nodes");
    }

    let mut simplified = to_bidirected(&contracted);
    let restored = reconnect::reconnect(original, &mut simplified, protected, &mut diagnostics);
    reconnect::restore_component_edges(original, &mut simplified);
    capacity::normalize_capacities(&mut simplified);

    info!(
        original_nodes = original.graph.node_count(),
        contracted_nodes = simplified.graph.node_count(),
        restored,
        "path contraction complete"
    );
    Simplified {
        network: simplified,
        diagnostics,
    }
}

fn edge_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}
