//! Property retention score: how much role-weighted transport capacity the
//! simplified network keeps.
//!
//! Every edge contributes its capacity times the combined importance of
//! its two endpoint roles. For clustered networks the retained share is
//! measured on the original edges that cross a cluster boundary, since
//! intra-cluster capacity is deliberately hidden inside super-nodes.

use gns_core::UndiNetwork;
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Weight for node roles with no matching entry.
pub const DEFAULT_ROLE_WEIGHT: f64 = 0.1;

/// Importance weight of a node id under substring matching.
///
/// The first key contained in the id wins; keys are tried longest first so
/// `"IND"` beats `"IC"` on an industrial id. Unmatched ids get
/// [`DEFAULT_ROLE_WEIGHT`].
pub fn role_weight(node_id: &str, weights: &HashMap<String, f64>) -> f64 {
    let mut keys: Vec<&String> = weights.keys().collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    for key in keys {
        if node_id.contains(key.as_str()) {
            return weights[key];
        }
    }
    DEFAULT_ROLE_WEIGHT
}

/// Role-weighted capacity over all edges of a graph.
fn weighted_capacity(network: &UndiNetwork, weights: &HashMap<String, f64>) -> f64 {
    network
        .graph
        .edge_references()
        .map(|edge| {
            let u = &network.graph[edge.source()].id;
            let v = &network.graph[edge.target()].id;
            edge.weight().capacity * (role_weight(u, weights) + role_weight(v, weights))
        })
        .sum()
}

/// Role-weighted capacity of original edges whose endpoints land in
/// different clusters of the simplified graph.
fn cross_cluster_capacity(
    original: &UndiNetwork,
    simplified: &UndiNetwork,
    weights: &HashMap<String, f64>,
) -> f64 {
    let mut cluster_of: HashMap<&str, &str> = HashMap::new();
    for node in simplified.graph.node_weights() {
        if let Some(members) = &node.original_nodes {
            for member in members {
                cluster_of.insert(member.as_str(), node.id.as_str());
            }
        }
    }

    original
        .graph
        .edge_references()
        .filter(|edge| {
            let u = original.graph[edge.source()].id.as_str();
            let v = original.graph[edge.target()].id.as_str();
            match (cluster_of.get(u), cluster_of.get(v)) {
                (Some(a), Some(b)) => a != b,
                // Nodes outside every cluster were dropped entirely
                _ => false,
            }
        })
        .map(|edge| {
            let u = &original.graph[edge.source()].id;
            let v = &original.graph[edge.target()].id;
            edge.weight().capacity * (role_weight(u, weights) + role_weight(v, weights))
        })
        .sum()
}

/// Retained share of role-weighted capacity, capped at 1.0. An original
/// with zero weighted capacity scores 0.0.
pub fn properties_score(
    original: &UndiNetwork,
    simplified: &UndiNetwork,
    weights: &HashMap<String, f64>,
) -> f64 {
    let total_orig = weighted_capacity(original, weights);
    if total_orig <= 0.0 {
        return 0.0;
    }
    let clustered = simplified.graph.node_weights().any(|n| n.is_cluster());
    let total_simp = if clustered {
        cross_cluster_capacity(original, simplified, weights)
    } else {
        weighted_capacity(simplified, weights)
    };
    (total_simp / total_orig).min(1.0)
}
