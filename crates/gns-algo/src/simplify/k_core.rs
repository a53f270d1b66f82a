//! k-core decomposition: peel away sparsely connected fringe nodes until
//! only the densely meshed backbone remains.

use super::Simplified;
use crate::reconnect;
use gns_core::{capacity, induced_subnetwork, Diagnostics, Network};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Default core order; degree counts both edge directions.
pub const DEFAULT_K: usize = 4;

/// Reduce the network to its k-core, then reconnect nodes matching a
/// `protected` prefix.
///
/// Nodes with total degree (in plus out) below `k` are removed iteratively
/// until every remaining node meets the threshold. A `k` larger than any
/// degree in the graph empties the core; protected stations then have no
/// anchor and the result is an empty network with warnings.
pub fn k_core(original: &Network, k: usize, protected: &[&str]) -> Simplified {
    let mut diagnostics = Diagnostics::new();

    let mut degrees: HashMap<String, usize> = original
        .node_ids()
        .map(|id| (id.to_string(), 0))
        .collect();
    let mut edges: Vec<(String, String)> = Vec::with_capacity(original.graph.edge_count());
    for edge in original.graph.edge_references() {
        let from = original.graph[edge.source()].id.clone();
        let to = original.graph[edge.target()].id.clone();
        *degrees.get_mut(&from).expect("endpoint present") += 1;
        *degrees.get_mut(&to).expect("endpoint present") += 1;
        edges.push((from, to));
    }

    let mut removed: HashSet<String> = HashSet::new();
    loop {
        let peel: Vec<String> = degrees
            .iter()
            .filter(|(id, &degree)| degree < k && !removed.contains(*id))
            .map(|(id, _)| id.clone())
            .collect();
        if peel.is_empty() {
            break;
        }
        for id in &peel {
            removed.insert(id.clone());
        }
        // Degrees drop for the neighbors of everything just peeled
        for (from, to) in &edges {
            let from_gone = removed.contains(from);
            let to_gone = removed.contains(to);
            if peel.iter().any(|p| p == from) && !to_gone {
                *degrees.get_mut(to).expect("endpoint present") -= 1;
            }
            if peel.iter().any(|p| p == to) && !from_gone {
                *degrees.get_mut(from).expect("endpoint present") -= 1;
            }
        }
    }

    let survivors: Vec<&str> = original
        .node_ids()
        .filter(|id| !removed.contains(*id))
        .collect();
    let mut simplified = induced_subnetwork(original, survivors);

    let restored = reconnect::reconnect(original, &mut simplified, protected, &mut diagnostics);
    reconnect::restore_component_edges(original, &mut simplified);
    capacity::normalize_capacities(&mut simplified);

    info!(
        k,
        peeled = removed.len(),
        restored,
        remaining = simplified.graph.node_count(),
        "k-core simplification complete"
    );
    Simplified {
        network: simplified,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconnect::DEFAULT_PROTECTED_PREFIXES;
    use gns_core::{Node, Pipe};

    /// A bidirectional triangle core with a pendant chain hanging off it.
    fn core_with_tail() -> Network {
        let mut network = Network::new();
        for id in ["X_a", "X_b", "X_c", "X_t1", "X_t2"] {
            network.add_node(Node::new(id, (0.0, 0.0), 0.0));
        }
        let mut link = |network: &mut Network, a: &str, b: &str| {
            let pipe = Pipe::new(5.0, 500.0, 60.0);
            network.add_pipe(a, b, pipe.clone()).unwrap();
            network.add_pipe(b, a, pipe).unwrap();
        };
        link(&mut network, "X_a", "X_b");
        link(&mut network, "X_b", "X_c");
        link(&mut network, "X_c", "X_a");
        link(&mut network, "X_a", "X_t1");
        link(&mut network, "X_t1", "X_t2");
        network
    }

    #[test]
    fn test_tail_peeled() {
        // Triangle nodes have total degree >= 4, the tail does not
        let result = k_core(&core_with_tail(), 4, DEFAULT_PROTECTED_PREFIXES);
        let network = &result.network;
        assert!(network.contains("X_a"));
        assert!(network.contains("X_b"));
        assert!(network.contains("X_c"));
        assert!(!network.contains("X_t1"));
        assert!(!network.contains("X_t2"));
    }

    #[test]
    fn test_cascading_peel() {
        // Removing X_t2 drops X_t1's degree below the threshold in a second
        // round; both must go
        let result = k_core(&core_with_tail(), 4, DEFAULT_PROTECTED_PREFIXES);
        assert_eq!(result.network.graph.node_count(), 3);
    }

    #[test]
    fn test_k_zero_keeps_everything() {
        let original = core_with_tail();
        let result = k_core(&original, 0, DEFAULT_PROTECTED_PREFIXES);
        assert_eq!(
            result.network.graph.node_count(),
            original.graph.node_count()
        );
    }

    #[test]
    fn test_protected_fringe_station_restored() {
        let mut network = core_with_tail();
        network.add_node(Node::new("IC_1", (1.0, 1.0), 25.0));
        let pipe = Pipe::new(5.0, 500.0, 60.0);
        network.add_pipe("IC_1", "X_a", pipe.clone()).unwrap();
        network.add_pipe("X_a", "IC_1", pipe).unwrap();

        // Degree 2 < 4, so IC_1 gets peeled, then reconnected
        let result = k_core(&network, 4, DEFAULT_PROTECTED_PREFIXES);
        assert!(result.network.contains("IC_1"));
    }

    #[test]
    fn test_oversized_k_empties_network() {
        let result = k_core(&core_with_tail(), 100, DEFAULT_PROTECTED_PREFIXES);
        assert_eq!(result.network.graph.node_count(), 0);
    }
}
