//! End-to-end behavior of the simplification strategies.

use gns_algo::simplify::{
    geographic_clustering, importance_absorption, k_core, path_contraction,
    community_clustering, GeoClusterConfig,
};
use gns_algo::reconnect::DEFAULT_PROTECTED_PREFIXES;
use gns_algo::test_utils::bidirectional_chain;
use gns_core::{capacity, Network, Node, Pipe, PipeKind};
use std::collections::HashMap;

#[test]
fn contraction_collapses_six_node_chain() {
    // A 5-segment junction chain between two stations becomes one pipe
    let original = bidirectional_chain(
        &["GPR_1", "X_1", "X_2", "X_3", "X_4", "IND_1"],
        10.0,
        25.0,
    );
    let result = path_contraction(&original, DEFAULT_PROTECTED_PREFIXES);
    let network = &result.network;

    assert_eq!(network.graph.node_count(), 2);
    assert_eq!(network.graph.edge_count(), 2);

    let pipe = network.graph.edge_weights().next().unwrap();
    assert!((pipe.length_km - 50.0).abs() < 1e-9);
    assert!((pipe.diameter_mm - 500.0).abs() < 1e-9);
    assert_eq!(pipe.kind, PipeKind::Contracted);
    let expected_capacity = capacity::estimate_capacity(60.0, 500.0, 50.0);
    assert!((pipe.capacity - expected_capacity).abs() < 1e-9);
}

#[test]
fn contraction_preserves_total_supply() {
    let original = bidirectional_chain(&["GPR_1", "X_1", "X_2", "IND_1"], 8.0, 40.0);
    let result = path_contraction(&original, DEFAULT_PROTECTED_PREFIXES);
    assert!((result.network.total_supply() - original.total_supply()).abs() < 1e-9);
    assert!((result.network.total_demand() - original.total_demand()).abs() < 1e-9);
}

#[test]
fn geographic_clustering_finds_three_regions() {
    // Three spatial groups of three nodes each, chained together
    let mut original = Network::new();
    let centers = [(0.0, 0.0), (1000.0, 0.0), (500.0, 1000.0)];
    let mut previous: Option<String> = None;
    for (group, &(cx, cy)) in centers.iter().enumerate() {
        for i in 0..3 {
            let id = format!("X_{group}_{i}");
            original.add_node(Node::new(&id, (cx + i as f64, cy + i as f64), 0.0));
            if let Some(prev) = &previous {
                original
                    .add_pipe(prev, &id, Pipe::new(10.0, 500.0, 60.0))
                    .unwrap();
            }
            previous = Some(id);
        }
    }

    let config = GeoClusterConfig {
        k_min: 2,
        k_max: 6,
        k_step: 1,
        ..GeoClusterConfig::default()
    };
    let result = geographic_clustering(&original, &config);
    assert_eq!(result.network.graph.node_count(), 3);

    // The cluster lists partition the original node set
    let mut members: Vec<String> = result
        .network
        .graph
        .node_weights()
        .flat_map(|n| n.original_nodes.clone().unwrap())
        .collect();
    members.sort();
    let mut expected: Vec<String> = original.node_ids().map(str::to_string).collect();
    expected.sort();
    assert_eq!(members, expected);

    // Cluster supply equals the sum of its members (all passive here)
    for node in result.network.graph.node_weights() {
        assert_eq!(node.supply, 0.0);
    }
}

#[test]
fn absorption_rejects_bad_fraction() {
    let network = bidirectional_chain(&["GPR_1", "X_1", "IND_1"], 5.0, 10.0);
    let scores: HashMap<String, f64> = HashMap::new();
    assert!(importance_absorption(&network, &scores, 0.0, DEFAULT_PROTECTED_PREFIXES).is_err());
    assert!(importance_absorption(&network, &scores, 1.0, DEFAULT_PROTECTED_PREFIXES).is_err());
}

#[test]
fn absorption_keeps_network_connected() {
    let original = bidirectional_chain(
        &["GPR_1", "X_1", "X_2", "X_3", "X_4", "IND_1"],
        10.0,
        25.0,
    );
    let scores: HashMap<String, f64> = [
        ("X_1", 0.1),
        ("X_2", 0.2),
        ("X_3", 0.3),
        ("X_4", 0.4),
    ]
    .into_iter()
    .map(|(id, s)| (id.to_string(), s))
    .collect();

    let result = importance_absorption(&original, &scores, 0.34, DEFAULT_PROTECTED_PREFIXES).unwrap();
    let network = &result.network;
    // 6 * 0.34 = 2 removals; stations are unscored and survive
    assert!(network.contains("GPR_1"));
    assert!(network.contains("IND_1"));
    assert_eq!(network.graph.node_count(), 4);
    // Largest-component filtering leaves a single connected graph
    assert_eq!(gns_core::weakly_connected_components(network).len(), 1);
}

#[test]
fn k_core_protection_follows_caller_prefixes() {
    // Dense mesh plus a pendant storage: the mesh survives the 4-core;
    // whether the storage comes back is the caller's choice
    let mut network = Network::new();
    let mesh = ["X_a", "X_b", "X_c", "X_d"];
    for (i, id) in mesh.iter().enumerate() {
        network.add_node(Node::new(*id, (i as f64, 0.0), 0.0));
    }
    for i in 0..mesh.len() {
        for j in (i + 1)..mesh.len() {
            let pipe = Pipe::new(3.0, 500.0, 60.0);
            network.add_pipe(mesh[i], mesh[j], pipe.clone()).unwrap();
            network.add_pipe(mesh[j], mesh[i], pipe).unwrap();
        }
    }
    network.add_node(Node::new("ST_1", (0.0, 5.0), 12.0));
    let pipe = Pipe::new(4.0, 400.0, 50.0);
    network.add_pipe("ST_1", "X_a", pipe.clone()).unwrap();
    network.add_pipe("X_a", "ST_1", pipe).unwrap();

    // ST is not in the default keep list, so the pendant stays peeled
    let peeled = k_core(&network, 4, DEFAULT_PROTECTED_PREFIXES);
    assert!(!peeled.network.contains("ST_1"));
    for id in mesh {
        assert!(peeled.network.contains(id));
    }

    // An extended keep list brings it back
    let kept = k_core(&network, 4, &["CS", "CV", "IC", "ST"]);
    assert!(kept.network.contains("ST_1"));
    for id in mesh {
        assert!(kept.network.contains(id));
    }
}

#[test]
fn community_clustering_aggregates_bridge() {
    // Two fat cliques and a thin bridge: two super-nodes, one aggregated pipe
    let mut network = Network::new();
    for side in ["l", "r"] {
        for i in 0..4 {
            network.add_node(Node::new(format!("X_{side}{i}"), (i as f64, 0.0), 0.0));
        }
        for i in 0..4 {
            for j in (i + 1)..4 {
                network
                    .add_pipe(
                        &format!("X_{side}{i}"),
                        &format!("X_{side}{j}"),
                        Pipe::new(5.0, 900.0, 80.0),
                    )
                    .unwrap();
            }
        }
    }
    network
        .add_pipe("X_l0", "X_r0", Pipe::new(300.0, 100.0, 10.0))
        .unwrap();

    let result = community_clustering(&network, 42);
    assert_eq!(result.network.graph.node_count(), 2);
    assert_eq!(result.network.graph.edge_count(), 1);
    let pipe = result.network.graph.edge_weights().next().unwrap();
    assert_eq!(pipe.kind, PipeKind::Aggregated);
}

#[test]
fn all_strategies_refresh_norm_capacity() {
    let original = bidirectional_chain(&["GPR_1", "X_1", "X_2", "X_3", "IND_1"], 10.0, 20.0);
    let scores: HashMap<String, f64> = [("X_2".to_string(), 0.0)].into_iter().collect();

    let outputs = vec![
        path_contraction(&original, DEFAULT_PROTECTED_PREFIXES),
        importance_absorption(&original, &scores, 0.2, DEFAULT_PROTECTED_PREFIXES).unwrap(),
        k_core(&original, 0, DEFAULT_PROTECTED_PREFIXES),
        community_clustering(&original, 42),
    ];
    for output in outputs {
        for pipe in output.network.graph.edge_weights() {
            let norm = pipe.norm_capacity.expect("norm capacity refreshed");
            assert!((0.01..=1.0).contains(&norm));
        }
    }
}
