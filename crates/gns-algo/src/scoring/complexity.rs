//! Complexity reduction score: how much smaller the simplified network is.

use gns_core::UndiNetwork;
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;

/// Cyclomatic number of an undirected graph: E - N + components.
fn cyclomatic(network: &UndiNetwork) -> i64 {
    let n = network.graph.node_count() as i64;
    let e = network.graph.edge_count() as i64;
    let mut components = UnionFind::new(network.graph.node_count());
    for edge in network.graph.edge_references() {
        components.union(edge.source().index(), edge.target().index());
    }
    let roots = (0..network.graph.node_count())
        .filter(|&i| components.find(i) == i)
        .count() as i64;
    e - n + roots
}

/// Mean of the node, edge, and cyclomatic reduction ratios.
///
/// Only the cyclomatic term is clamped at 0; the node and edge ratios go
/// negative when reconnection grows a count past the original, which pulls
/// the score below 0 and flags the growth. A non-positive original
/// cyclomatic number (a forest) makes the cycle ratio meaningless and
/// scores 0.
pub fn complexity_score(original: &UndiNetwork, simplified: &UndiNetwork) -> f64 {
    let n_orig = original.graph.node_count() as f64;
    let e_orig = original.graph.edge_count() as f64;

    let node_term = if n_orig > 0.0 {
        1.0 - simplified.graph.node_count() as f64 / n_orig
    } else {
        0.0
    };
    let edge_term = if e_orig > 0.0 {
        1.0 - simplified.graph.edge_count() as f64 / e_orig
    } else {
        0.0
    };
    let cyclo_orig = cyclomatic(original);
    let cyclo_term = if cyclo_orig > 0 {
        (1.0 - cyclomatic(simplified) as f64 / cyclo_orig as f64).max(0.0)
    } else {
        0.0
    };

    (node_term + edge_term + cyclo_term) / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use gns_core::{Node, Pipe};

    fn mesh(n: usize) -> UndiNetwork {
        let mut network = UndiNetwork::new();
        let ids: Vec<String> = (0..n).map(|i| format!("X_{i}")).collect();
        for (i, id) in ids.iter().enumerate() {
            network.add_node(Node::new(id, (i as f64, 0.0), 0.0));
        }
        for i in 0..n {
            for j in (i + 1)..n {
                network
                    .add_pipe(&ids[i], &ids[j], Pipe::new(1.0, 100.0, 10.0))
                    .unwrap();
            }
        }
        network
    }

    #[test]
    fn test_identical_networks_score_zero() {
        let network = mesh(5);
        assert_eq!(complexity_score(&network, &network), 0.0);
    }

    #[test]
    fn test_shrinking_raises_score() {
        let original = mesh(6);
        let smaller = mesh(3);
        let tiny = mesh(2);
        let a = complexity_score(&original, &smaller);
        let b = complexity_score(&original, &tiny);
        assert!(a > 0.0);
        assert!(b > a);
        assert!(b <= 1.0);
    }

    #[test]
    fn test_forest_original_zero_cycle_term() {
        // A 2-node tree has cyclomatic number 0
        let mut original = UndiNetwork::new();
        original.add_node(Node::new("X_1", (0.0, 0.0), 0.0));
        original.add_node(Node::new("X_2", (1.0, 0.0), 0.0));
        original
            .add_pipe("X_1", "X_2", Pipe::new(1.0, 100.0, 10.0))
            .unwrap();
        let mut simplified = UndiNetwork::new();
        simplified.add_node(Node::new("X_1", (0.0, 0.0), 0.0));

        let score = complexity_score(&original, &simplified);
        // node term 0.5, edge term 1.0, cycle term 0
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_growth_counts_against_score() {
        // More nodes and edges than the original: the node and edge terms
        // go negative, only the cyclomatic term is clamped
        let original = mesh(3);
        let grown = mesh(4);
        let score = complexity_score(&original, &grown);
        let expected = ((1.0 - 4.0 / 3.0) + (1.0 - 6.0 / 3.0) + 0.0) / 3.0;
        assert!((score - expected).abs() < 1e-12);
        assert!(score < 0.0);
    }

    #[test]
    fn test_empty_original() {
        let empty = UndiNetwork::new();
        assert_eq!(complexity_score(&empty, &empty), 0.0);
    }

    #[test]
    fn test_cyclomatic_counts_independent_cycles() {
        let triangle = mesh(3);
        assert_eq!(cyclomatic(&triangle), 1);
        let k4 = mesh(4);
        assert_eq!(cyclomatic(&k4), 3);
    }
}
