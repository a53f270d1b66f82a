//! Construction of a clustered network from a node partition.
//!
//! Every clustering strategy (communities, geographic k-means, embedding
//! k-means) ends the same way: a partition of the node set is turned into a
//! graph of super-nodes with aggregated inter-cluster pipes. That final
//! step lives here.

use gns_core::{capacity, Coord, Network, Node, NodeSnapshot, Pipe, PipeKind};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use tracing::debug;

/// Inter-cluster pipes with a combined rating below this are dropped.
const MIN_AGGREGATE_CAPACITY: f64 = 1e-9;

/// Equivalent-diameter exponent for parallel pipes (flow scales roughly
/// with dn^2.5 in the capacity model).
const DIAMETER_EXPONENT: f64 = 2.5;

/// Collapse a node partition into a network of super-nodes.
///
/// Each group becomes a super-node `C_{i}` placed at the member centroid,
/// carrying the summed supply and a full snapshot of its members. All
/// original edges between two different groups are aggregated into one
/// directed pipe per (from-cluster, to-cluster) pair:
///
/// - capacity: sum of member capacities
/// - length and max pressure: capacity-weighted averages
/// - diameter: parallel-equivalent `(Σ dn^2.5)^(1/2.5)`
///
/// Intra-group edges vanish. Normalized capacities are recomputed for the
/// new graph.
pub fn build_clustered_network(original: &Network, assignment: &HashMap<String, usize>) -> Network {
    // Stable cluster ordering: by cluster label
    let mut groups: HashMap<usize, Vec<String>> = HashMap::new();
    for node in original.graph.node_weights() {
        if let Some(&cluster) = assignment.get(&node.id) {
            groups.entry(cluster).or_default().push(node.id.clone());
        }
    }
    let mut labels: Vec<usize> = groups.keys().copied().collect();
    labels.sort_unstable();

    let mut clustered = Network::new();
    let mut cluster_of: HashMap<String, String> = HashMap::new();

    for label in &labels {
        let members = &groups[label];
        let super_id = format!("C_{label}");
        let mut x = 0.0;
        let mut y = 0.0;
        let mut supply = 0.0;
        let mut snapshots = Vec::with_capacity(members.len());
        for member in members {
            let node = original.node(member).expect("member exists in original");
            x += node.coord.x;
            y += node.coord.y;
            supply += node.supply;
            snapshots.push(node.snapshot());
            cluster_of.insert(member.clone(), super_id.clone());
        }
        let count = members.len() as f64;
        let mut super_node = Node::new(super_id, Coord::new(x / count, y / count), supply);
        super_node.original_nodes = Some(members.clone());
        super_node.original_node_data = Some(snapshots);
        clustered.add_node(super_node);
    }

    // Aggregate inter-cluster edges per directed cluster pair
    struct Aggregate {
        capacity: f64,
        weighted_length: f64,
        weighted_pressure: f64,
        diameter_pow: f64,
    }
    let mut aggregates: HashMap<(String, String), Aggregate> = HashMap::new();
    let mut pair_order: Vec<(String, String)> = Vec::new();

    for edge in original.graph.edge_references() {
        let from = &original.graph[edge.source()].id;
        let to = &original.graph[edge.target()].id;
        let (from_cluster, to_cluster) = match (cluster_of.get(from), cluster_of.get(to)) {
            (Some(a), Some(b)) if a != b => (a.clone(), b.clone()),
            _ => continue,
        };
        let pipe = edge.weight();
        let entry = aggregates
            .entry((from_cluster.clone(), to_cluster.clone()))
            .or_insert_with(|| {
                pair_order.push((from_cluster, to_cluster));
                Aggregate {
                    capacity: 0.0,
                    weighted_length: 0.0,
                    weighted_pressure: 0.0,
                    diameter_pow: 0.0,
                }
            });
        entry.capacity += pipe.capacity;
        entry.weighted_length += pipe.capacity * pipe.length_km;
        entry.weighted_pressure += pipe.capacity * pipe.max_pressure_bar;
        entry.diameter_pow += pipe.diameter_mm.max(0.0).powf(DIAMETER_EXPONENT);
    }

    let mut dropped = 0usize;
    for key in pair_order {
        let agg = &aggregates[&key];
        if agg.capacity < MIN_AGGREGATE_CAPACITY {
            dropped += 1;
            continue;
        }
        let pipe = Pipe {
            length_km: agg.weighted_length / agg.capacity,
            diameter_mm: agg.diameter_pow.powf(1.0 / DIAMETER_EXPONENT),
            max_pressure_bar: agg.weighted_pressure / agg.capacity,
            capacity: agg.capacity,
            norm_capacity: None,
            kind: PipeKind::Aggregated,
        };
        // Both super-nodes were created above
        let _ = clustered.add_pipe(&key.0, &key.1, pipe);
    }
    if dropped > 0 {
        debug!(dropped, "dropped near-zero-capacity aggregate pipes");
    }

    capacity::normalize_capacities(&mut clustered);
    clustered
}
