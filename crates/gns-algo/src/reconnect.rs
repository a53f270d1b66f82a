//! Reconnection of protected stations dropped by a simplification strategy.
//!
//! Which nodes are protected is the caller's choice, expressed as a set of
//! id prefixes. [`DEFAULT_PROTECTED_PREFIXES`] keeps the components that
//! hydraulics cannot do without (compressors, valves, interconnectors);
//! callers that also need supply points, storages, or consumers to survive
//! extend the list. After a strategy runs, every protected node of the
//! original network that went missing is re-attached:
//!
//! 1. each of its original neighbors that still exists gets a direct edge
//!    with the original pipe attributes, preserving direction;
//! 2. a neighbor that was itself removed is bridged by the
//!    length-shortest path to the nearest surviving node.
//!
//! A protected node with no surviving anchor at all (fully isolated in the
//! original, or in a component wiped out entirely) stays out and is
//! reported as a warning.

use gns_core::{Diagnostics, Network};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Id prefixes protected when the caller has no preference of its own.
pub const DEFAULT_PROTECTED_PREFIXES: &[&str] = &["CS", "CV", "IC"];

/// Whether an id falls under one of the protected prefixes.
pub fn is_protected(id: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| id.starts_with(prefix))
}

/// Ids of all nodes matching the protected prefixes.
pub fn protected_nodes(network: &Network, prefixes: &[&str]) -> Vec<String> {
    network
        .graph
        .node_weights()
        .filter(|node| is_protected(&node.id, prefixes))
        .map(|node| node.id.clone())
        .collect()
}

/// Length-weighted undirected view of the original network, used to bridge
/// removed neighbors to their nearest surviving node.
struct DistanceIndex {
    graph: UnGraph<String, f64>,
    index: HashMap<String, NodeIndex>,
}

impl DistanceIndex {
    fn build(network: &Network) -> Self {
        let mut graph = UnGraph::new_undirected();
        let mut index = HashMap::new();
        for node in network.graph.node_weights() {
            let idx = graph.add_node(node.id.clone());
            index.insert(node.id.clone(), idx);
        }
        for edge in network.graph.edge_references() {
            let from = index[&network.graph[edge.source()].id];
            let to = index[&network.graph[edge.target()].id];
            graph.add_edge(from, to, edge.weight().length_km.max(0.0));
        }
        Self { graph, index }
    }

    /// Nearest node (by summed pipe length) that satisfies `accept`,
    /// excluding the start itself.
    fn closest(&self, start: &str, accept: impl Fn(&str) -> bool) -> Option<String> {
        let start_idx = *self.index.get(start)?;
        let costs = petgraph::algo::dijkstra(&self.graph, start_idx, None, |e| *e.weight());
        costs
            .into_iter()
            .filter(|(idx, _)| *idx != start_idx && accept(&self.graph[*idx]))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(idx, _)| self.graph[idx].clone())
    }
}

/// Re-attach nodes of `original` matching the protected prefixes that are
/// missing from `simplified`. Returns the number of nodes restored.
pub fn reconnect(
    original: &Network,
    simplified: &mut Network,
    protected: &[&str],
    diagnostics: &mut Diagnostics,
) -> usize {
    let present: HashSet<String> = simplified.node_ids().map(str::to_string).collect();
    let missing: Vec<String> = protected_nodes(original, protected)
        .into_iter()
        .filter(|id| !present.contains(id))
        .collect();
    if missing.is_empty() {
        return 0;
    }

    let distances = DistanceIndex::build(original);
    let mut restored = 0;

    for id in missing {
        let node_idx = match original.node_index(&id) {
            Some(idx) => idx,
            None => continue,
        };
        // (target id, true = edge leaves the restored node, pipe)
        let mut attachments = Vec::new();

        for edge in original.graph.edges(node_idx) {
            let neighbor = original.graph[edge.target()].id.clone();
            match resolve_anchor(&neighbor, &present, &distances) {
                Some(target) if target != id => {
                    attachments.push((target, true, edge.weight().clone()))
                }
                _ => {}
            }
        }
        for edge in original
            .graph
            .edges_directed(node_idx, petgraph::Direction::Incoming)
        {
            let neighbor = original.graph[edge.source()].id.clone();
            match resolve_anchor(&neighbor, &present, &distances) {
                Some(target) if target != id => {
                    attachments.push((target, false, edge.weight().clone()))
                }
                _ => {}
            }
        }

        if attachments.is_empty() {
            warn!(node = %id, "no surviving anchor found, node stays disconnected");
            diagnostics.add_warning_with_entity(
                "reconnect",
                "protected node has no surviving anchor",
                &id,
            );
            continue;
        }

        let node = original.graph[node_idx].clone();
        simplified.add_node(node);
        debug!(node = %id, edges = attachments.len(), "restored protected node");
        for (target, outgoing, pipe) in attachments {
            let result = if outgoing {
                simplified.add_pipe(&id, &target, pipe)
            } else {
                simplified.add_pipe(&target, &id, pipe)
            };
            // Both endpoints exist at this point
            let _ = result;
        }
        restored += 1;
    }
    restored
}

/// Re-add original edges incident to a compressor or valve when both
/// endpoints survive but the edge itself was dropped. Component links are
/// virtual and must not be lost to edge merging. Returns the number of
/// edges restored.
pub fn restore_component_edges(original: &Network, simplified: &mut Network) -> usize {
    let mut restored = 0;
    for edge in original.graph.edge_references() {
        let from = &original.graph[edge.source()];
        let to = &original.graph[edge.target()];
        if !from.role().is_component() && !to.role().is_component() {
            continue;
        }
        let (Some(a), Some(b)) = (
            simplified.node_index(&from.id),
            simplified.node_index(&to.id),
        ) else {
            continue;
        };
        if simplified.graph.find_edge(a, b).is_none() {
            simplified.graph.add_edge(a, b, edge.weight().clone());
            restored += 1;
        }
    }
    if restored > 0 {
        debug!(restored, "component edges restored");
    }
    restored
}

/// A surviving neighbor anchors directly; a removed one is replaced by the
/// closest surviving node reachable from it.
fn resolve_anchor(
    neighbor: &str,
    present: &HashSet<String>,
    distances: &DistanceIndex,
) -> Option<String> {
    if present.contains(neighbor) {
        return Some(neighbor.to_string());
    }
    distances.closest(neighbor, |candidate| present.contains(candidate))
}
