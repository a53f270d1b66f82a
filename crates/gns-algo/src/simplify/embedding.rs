//! Embedding-based clustering: nodes are embedded by a graph encoder,
//! embeddings are concatenated with weighted coordinates, and k-means
//! groups the result.
//!
//! The encoder is pluggable behind [`GraphEncoder`]; a trained
//! autoencoder can slot in without touching the clustering pipeline. The
//! built-in [`PropagationEncoder`] is a deterministic feature-smoothing
//! encoder: it averages node features over the neighborhood for a few
//! rounds, which captures local topology well enough for cluster formation
//! and needs no training.
//!
//! Both the cluster count and the coordinate weight are grid-searched,
//! judged by silhouette on the combined feature space.

use super::cluster_build::build_clustered_network;
use super::Simplified;
use crate::cluster::{best_labels_by_silhouette, min_max_scale, DEFAULT_SEED};
use gns_core::{Diagnostics, Network, NodeRole};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Number of role categories in the one-hot encoding.
const NUM_ROLES: usize = 12;

fn role_index(role: NodeRole) -> usize {
    match role {
        NodeRole::Biomethane => 0,
        NodeRole::CompressorStation => 1,
        NodeRole::ControlValve => 2,
        NodeRole::DistributionOperator => 3,
        NodeRole::Production => 4,
        NodeRole::Interconnector => 5,
        NodeRole::Industrial => 6,
        NodeRole::LngTerminal => 7,
        NodeRole::Storage => 8,
        NodeRole::PowerPlant => 9,
        NodeRole::Junction => 10,
        NodeRole::Unknown => 11,
    }
}

/// Feature tensors extracted from a network, the encoder's input.
#[derive(Debug, Clone)]
pub struct GraphFeatures {
    /// Node ids in graph order; all per-node vectors align with this.
    pub ids: Vec<String>,
    /// Per node: one-hot role, then min-max scaled coordinates multiplied
    /// by the coordinate weight.
    pub node_features: Vec<Vec<f64>>,
    /// Directed edges as (from, to) indices into `ids`.
    pub edge_index: Vec<(usize, usize)>,
    /// Per edge: min-max scaled length, diameter, max pressure.
    pub edge_features: Vec<Vec<f64>>,
    /// Scaled coordinates alone, for concatenation with embeddings.
    pub scaled_coords: Vec<[f64; 2]>,
}

/// Extract encoder input features from a network.
pub fn build_features(network: &Network, coord_weight: f64) -> GraphFeatures {
    let ids: Vec<String> = network.node_ids().map(str::to_string).collect();

    let mut coords: Vec<Vec<f64>> = network
        .graph
        .node_weights()
        .map(|node| vec![node.coord.x, node.coord.y])
        .collect();
    min_max_scale(&mut coords);
    let scaled_coords: Vec<[f64; 2]> = coords.iter().map(|c| [c[0], c[1]]).collect();

    let node_features = network
        .graph
        .node_weights()
        .zip(&scaled_coords)
        .map(|(node, coord)| {
            let mut features = vec![0.0; NUM_ROLES + 2];
            features[role_index(node.role())] = 1.0;
            features[NUM_ROLES] = coord[0] * coord_weight;
            features[NUM_ROLES + 1] = coord[1] * coord_weight;
            features
        })
        .collect();

    let index: HashMap<&str, usize> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();
    let mut edge_index = Vec::with_capacity(network.graph.edge_count());
    let mut edge_features: Vec<Vec<f64>> = Vec::with_capacity(network.graph.edge_count());
    for edge in network.graph.edge_references() {
        edge_index.push((
            index[network.graph[edge.source()].id.as_str()],
            index[network.graph[edge.target()].id.as_str()],
        ));
        let pipe = edge.weight();
        edge_features.push(vec![
            pipe.length_km,
            pipe.diameter_mm,
            pipe.max_pressure_bar,
        ]);
    }
    min_max_scale(&mut edge_features);

    GraphFeatures {
        ids,
        node_features,
        edge_index,
        edge_features,
        scaled_coords,
    }
}

/// Produces one embedding vector per node from graph features.
pub trait GraphEncoder {
    fn encode(&self, features: &GraphFeatures) -> Vec<Vec<f64>>;
}

/// Training-free encoder that smooths node features over the undirected
/// neighborhood for a fixed number of rounds.
#[derive(Debug, Clone)]
pub struct PropagationEncoder {
    pub rounds: usize,
    /// Weight of a node's own features against the neighborhood mean.
    pub self_weight: f64,
}

impl Default for PropagationEncoder {
    fn default() -> Self {
        Self {
            rounds: 3,
            self_weight: 0.5,
        }
    }
}

impl GraphEncoder for PropagationEncoder {
    fn encode(&self, features: &GraphFeatures) -> Vec<Vec<f64>> {
        let n = features.ids.len();
        let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &(from, to) in &features.edge_index {
            if from != to {
                neighbors[from].push(to);
                neighbors[to].push(from);
            }
        }

        let mut current = features.node_features.clone();
        for _ in 0..self.rounds {
            let mut next = current.clone();
            for (node, out) in next.iter_mut().enumerate() {
                if neighbors[node].is_empty() {
                    continue;
                }
                let dims = out.len();
                let mut mean = vec![0.0; dims];
                for &neighbor in &neighbors[node] {
                    for (m, v) in mean.iter_mut().zip(&current[neighbor]) {
                        *m += v;
                    }
                }
                let count = neighbors[node].len() as f64;
                for (dim, m) in mean.iter().enumerate() {
                    out[dim] = self.self_weight * current[node][dim]
                        + (1.0 - self.self_weight) * m / count;
                }
            }
            current = next;
        }
        current
    }
}

/// Grid-search space for embedding clustering.
#[derive(Debug, Clone)]
pub struct EmbeddingClusterConfig {
    pub k_min: usize,
    pub k_max: usize,
    pub k_step: usize,
    /// Candidate multipliers for the coordinate features.
    pub coord_weights: Vec<f64>,
    pub seed: u64,
}

impl Default for EmbeddingClusterConfig {
    fn default() -> Self {
        Self {
            k_min: 50,
            k_max: 250,
            k_step: 25,
            coord_weights: vec![0.5, 1.0, 2.0, 5.0, 10.0],
            seed: DEFAULT_SEED,
        }
    }
}

/// Cluster nodes in embedding space and collapse the clusters.
///
/// For every candidate coordinate weight the network is re-featurized,
/// encoded, and clustered across the candidate k range; the (weight, k)
/// cell with the best silhouette wins. Falls back to the unchanged input
/// with a warning when no cell is scorable.
pub fn embedding_clustering(
    original: &Network,
    encoder: &dyn GraphEncoder,
    config: &EmbeddingClusterConfig,
) -> Simplified {
    let mut diagnostics = Diagnostics::new();
    let mut best: Option<(f64, usize, f64, Vec<usize>)> = None;

    for &coord_weight in &config.coord_weights {
        let features = build_features(original, coord_weight);
        let embeddings = encoder.encode(&features);

        // Embedding ⊕ weighted coordinates
        let points: Vec<Vec<f64>> = embeddings
            .into_iter()
            .zip(&features.scaled_coords)
            .map(|(mut embedding, coord)| {
                embedding.push(coord[0] * coord_weight);
                embedding.push(coord[1] * coord_weight);
                embedding
            })
            .collect();

        let candidates = (config.k_min..=config.k_max).step_by(config.k_step.max(1));
        if let Some((k, labels, silhouette)) =
            best_labels_by_silhouette(&points, candidates, config.seed)
        {
            debug!(coord_weight, k, silhouette, "grid cell scored");
            if best.as_ref().map_or(true, |(_, _, s, _)| silhouette > *s) {
                best = Some((coord_weight, k, silhouette, labels));
            }
        }
    }

    let (coord_weight, k, silhouette, labels) = match best {
        Some(best) => best,
        None => {
            warn!("no grid cell produced a scorable labeling, network unchanged");
            diagnostics.add_warning(
                "clustering",
                "embedding grid search found no scorable labeling",
            );
            return Simplified {
                network: original.clone(),
                diagnostics,
            };
        }
    };

    let assignment: HashMap<String, usize> = original
        .node_ids()
        .map(str::to_string)
        .zip(labels)
        .collect();
    let network = build_clustered_network(original, &assignment);
    info!(
        coord_weight,
        k,
        silhouette,
        clusters = network.graph.node_count(),
        "embedding clustering complete"
    );
    Simplified {
        network,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gns_core::{Node, Pipe};

    fn two_zone_network() -> Network {
        // Two spatially separated bidirectional chains
        let mut network = Network::new();
        for i in 0..4 {
            network.add_node(Node::new(format!("X_a{i}"), (i as f64, 0.0), 0.0));
            network.add_node(Node::new(format!("IND_b{i}"), (i as f64 + 100.0, 50.0), -1.0));
        }
        for i in 0..3 {
            for (a, b) in [
                (format!("X_a{i}"), format!("X_a{}", i + 1)),
                (format!("IND_b{i}"), format!("IND_b{}", i + 1)),
            ] {
                let pipe = Pipe::new(5.0, 500.0, 60.0);
                network.add_pipe(&a, &b, pipe.clone()).unwrap();
                network.add_pipe(&b, &a, pipe).unwrap();
            }
        }
        network
    }

    fn small_config() -> EmbeddingClusterConfig {
        EmbeddingClusterConfig {
            k_min: 2,
            k_max: 4,
            k_step: 1,
            coord_weights: vec![1.0, 2.0],
            seed: DEFAULT_SEED,
        }
    }

    #[test]
    fn test_feature_layout() {
        let network = two_zone_network();
        let features = build_features(&network, 2.0);
        assert_eq!(features.ids.len(), 8);
        assert_eq!(features.node_features[0].len(), NUM_ROLES + 2);
        assert_eq!(features.edge_index.len(), 12);
        assert_eq!(features.edge_features.len(), 12);

        // One-hot role set exactly once
        for row in &features.node_features {
            let ones = row[..NUM_ROLES].iter().filter(|&&v| v == 1.0).count();
            assert_eq!(ones, 1);
        }
    }

    #[test]
    fn test_propagation_smooths_toward_neighbors() {
        let network = two_zone_network();
        let features = build_features(&network, 1.0);
        let embeddings = PropagationEncoder::default().encode(&features);
        assert_eq!(embeddings.len(), 8);

        // Chain-a nodes mix junction features only; IND one-hot stays zero
        let a0 = &embeddings[0];
        assert_eq!(a0[role_index(NodeRole::Industrial)], 0.0);
        assert!(a0[role_index(NodeRole::Junction)] > 0.0);
    }

    #[test]
    fn test_zones_separate() {
        let original = two_zone_network();
        let encoder = PropagationEncoder::default();
        let result = embedding_clustering(&original, &encoder, &small_config());
        assert_eq!(result.network.graph.node_count(), 2);

        for node in result.network.graph.node_weights() {
            let members = node.original_nodes.as_ref().unwrap();
            let first_zone = members[0].contains("a");
            assert!(members.iter().all(|m| m.contains('a') == first_zone));
        }
    }

    #[test]
    fn test_unscorable_grid_unchanged() {
        let original = two_zone_network();
        let encoder = PropagationEncoder::default();
        let config = EmbeddingClusterConfig {
            k_min: 50,
            k_max: 60,
            k_step: 5,
            ..small_config()
        };
        let result = embedding_clustering(&original, &encoder, &config);
        assert_eq!(
            result.network.graph.node_count(),
            original.graph.node_count()
        );
        assert_eq!(result.diagnostics.warning_count(), 1);
    }
}
