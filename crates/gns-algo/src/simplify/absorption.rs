//! Importance-based simplification: the least important nodes are absorbed
//! into their strongest neighbor.
//!
//! Node importance scores typically come from an N-1 contingency sweep
//! (see [`crate::contingency`]), expanded to per-node values by role. The
//! lowest-scoring fraction of nodes is removed one by one; each removed
//! node's traffic is rerouted through the incident neighbor with the best
//! absorption score, so connectivity through the removed node is kept.

use super::Simplified;
use crate::reconnect;
use gns_core::{capacity, largest_component, Diagnostics, GnsError, GnsResult, Network, Pipe};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Relative weight of incident capacity in the absorber score.
const ABSORBER_CAPACITY_WEIGHT: f64 = 0.8;
/// Relative weight of node degree in the absorber score.
const ABSORBER_DEGREE_WEIGHT: f64 = 0.2;

/// Mutable per-node adjacency used while nodes are absorbed one by one.
#[derive(Default, Clone)]
struct Incidence {
    incoming: Vec<(String, Pipe)>,
    outgoing: Vec<(String, Pipe)>,
}

/// Remove the lowest-scoring `fraction` of all nodes, absorbing each into
/// its best surviving neighbor.
///
/// `fraction` must lie strictly between 0 and 1; anything else aborts the
/// whole run with a validation error. Nodes absent from `scores` are
/// treated as maximally important and never removed. A node whose
/// neighbors are all scheduled for removal themselves has no valid
/// absorber and stays untouched. Nodes matching a `protected` prefix are
/// restored through the reconnection layer afterwards.
pub fn importance_absorption(
    original: &Network,
    scores: &HashMap<String, f64>,
    fraction: f64,
    protected: &[&str],
) -> GnsResult<Simplified> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(GnsError::Validation(format!(
            "removal fraction must be in (0, 1), got {fraction}"
        )));
    }
    let mut diagnostics = Diagnostics::new();

    // Rank ascending by score; unscored nodes sort last and survive
    let mut ranked: Vec<(String, f64)> = original
        .node_ids()
        .map(|id| {
            (
                id.to_string(),
                scores.get(id).copied().unwrap_or(f64::INFINITY),
            )
        })
        .collect();
    ranked.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let num_remove = (original.graph.node_count() as f64 * fraction) as usize;
    let removal_order: Vec<String> = ranked
        .into_iter()
        .take(num_remove)
        .map(|(id, _)| id)
        .collect();
    let removal_set: HashSet<&str> = removal_order.iter().map(String::as_str).collect();

    let mut incidence: HashMap<String, Incidence> = original
        .node_ids()
        .map(|id| (id.to_string(), Incidence::default()))
        .collect();
    for edge in original.graph.edge_references() {
        let from = original.graph[edge.source()].id.clone();
        let to = original.graph[edge.target()].id.clone();
        incidence
            .get_mut(&from)
            .expect("endpoint present")
            .outgoing
            .push((to.clone(), edge.weight().clone()));
        incidence
            .get_mut(&to)
            .expect("endpoint present")
            .incoming
            .push((from, edge.weight().clone()));
    }

    let mut absorbed = 0usize;
    for id in &removal_order {
        let node = incidence.get(id).cloned().unwrap_or_default();
        let mut neighbors: HashSet<&str> = HashSet::new();
        neighbors.extend(node.incoming.iter().map(|(n, _)| n.as_str()));
        neighbors.extend(node.outgoing.iter().map(|(n, _)| n.as_str()));

        let absorber = neighbors
            .iter()
            .filter(|n| !removal_set.contains(*n) && **n != id.as_str())
            .map(|&n| (n.to_string(), absorber_score(&incidence[n])))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let absorber = match absorber {
            Some((absorber, _)) => absorber,
            None => {
                debug!(node = %id, "no valid absorber, node kept");
                diagnostics.add_warning_with_entity(
                    "absorption",
                    "no surviving neighbor to absorb node, kept as-is",
                    id,
                );
                continue;
            }
        };

        // Reroute traffic through the absorber, then drop the node
        for (pred, pipe) in &node.incoming {
            if pred != &absorber && pred != id {
                incidence
                    .get_mut(pred)
                    .expect("endpoint present")
                    .outgoing
                    .push((absorber.clone(), pipe.clone()));
                incidence
                    .get_mut(&absorber)
                    .expect("absorber present")
                    .incoming
                    .push((pred.clone(), pipe.clone()));
            }
        }
        for (succ, pipe) in &node.outgoing {
            if succ != &absorber && succ != id {
                incidence
                    .get_mut(&absorber)
                    .expect("absorber present")
                    .outgoing
                    .push((succ.clone(), pipe.clone()));
                incidence
                    .get_mut(succ)
                    .expect("endpoint present")
                    .incoming
                    .push((absorber.clone(), pipe.clone()));
            }
        }
        for entry in incidence.values_mut() {
            entry.incoming.retain(|(n, _)| n != id);
            entry.outgoing.retain(|(n, _)| n != id);
        }
        incidence.remove(id);
        absorbed += 1;
    }

    // Rebuild in the original's node order
    let mut simplified = Network::new();
    for node in original.graph.node_weights() {
        if incidence.contains_key(&node.id) {
            simplified.add_node(node.clone());
        }
    }
    for node in original.graph.node_weights() {
        if let Some(entry) = incidence.get(&node.id) {
            for (to, pipe) in &entry.outgoing {
                let _ = simplified.add_pipe(&node.id, to, pipe.clone());
            }
        }
    }

    let restored = reconnect::reconnect(original, &mut simplified, protected, &mut diagnostics);
    reconnect::restore_component_edges(original, &mut simplified);
    let mut simplified = largest_component(&simplified);
    capacity::normalize_capacities(&mut simplified);

    info!(
        scheduled = removal_order.len(),
        absorbed,
        restored,
        remaining = simplified.graph.node_count(),
        "importance-based absorption complete"
    );
    Ok(Simplified {
        network: simplified,
        diagnostics,
    })
}

fn absorber_score(entry: &Incidence) -> f64 {
    let capacity: f64 = entry
        .incoming
        .iter()
        .chain(&entry.outgoing)
        .map(|(_, pipe)| pipe.capacity)
        .sum();
    let degree = (entry.incoming.len() + entry.outgoing.len()) as f64;
    ABSORBER_CAPACITY_WEIGHT * capacity + ABSORBER_DEGREE_WEIGHT * degree
}
