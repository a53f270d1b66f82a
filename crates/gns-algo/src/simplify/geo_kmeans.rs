//! Geographic clustering: k-means over node coordinates with the cluster
//! count picked by silhouette score.

use super::cluster_build::build_clustered_network;
use super::Simplified;
use crate::cluster::{best_labels_by_silhouette, min_max_scale, DEFAULT_SEED};
use gns_core::{Diagnostics, Network};
use std::collections::HashMap;
use tracing::{info, warn};

/// Search space for the geographic cluster count.
#[derive(Debug, Clone)]
pub struct GeoClusterConfig {
    pub k_min: usize,
    pub k_max: usize,
    pub k_step: usize,
    pub seed: u64,
}

impl Default for GeoClusterConfig {
    fn default() -> Self {
        Self {
            k_min: 20,
            k_max: 250,
            k_step: 10,
            seed: DEFAULT_SEED,
        }
    }
}

impl GeoClusterConfig {
    fn candidates(&self) -> impl Iterator<Item = usize> + '_ {
        (self.k_min..=self.k_max).step_by(self.k_step.max(1))
    }
}

/// Cluster nodes by scaled geographic position and collapse each cluster
/// into a super-node.
///
/// Coordinates are min-max scaled per axis so longitude-like and
/// latitude-like magnitudes weigh equally. Every candidate k in the
/// configured range is clustered and scored by silhouette; the best
/// labeling wins. If no candidate yields a scorable labeling (e.g. the
/// network is smaller than `k_min`) the input is returned unchanged with a
/// warning.
pub fn geographic_clustering(original: &Network, config: &GeoClusterConfig) -> Simplified {
    let mut diagnostics = Diagnostics::new();

    let ids: Vec<String> = original.node_ids().map(str::to_string).collect();
    let mut points: Vec<Vec<f64>> = original
        .graph
        .node_weights()
        .map(|node| vec![node.coord.x, node.coord.y])
        .collect();
    min_max_scale(&mut points);

    let best = best_labels_by_silhouette(&points, config.candidates(), config.seed);
    let (k, labels, silhouette) = match best {
        Some(best) => best,
        None => {
            warn!(
                nodes = ids.len(),
                k_min = config.k_min,
                "no scorable clustering in the configured k range, network unchanged"
            );
            diagnostics.add_warning(
                "clustering",
                "no candidate cluster count produced a scorable labeling",
            );
            return Simplified {
                network: original.clone(),
                diagnostics,
            };
        }
    };

    let assignment: HashMap<String, usize> = ids.into_iter().zip(labels).collect();
    let network = build_clustered_network(original, &assignment);
    info!(
        k,
        silhouette,
        nodes = original.graph.node_count(),
        clusters = network.graph.node_count(),
        "geographic clustering complete"
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

    /// Nine nodes in three tight spatial groups, connected in a line.
    fn three_regions() -> Network {
        let mut network = Network::new();
        let centers = [(0.0, 0.0), (100.0, 0.0), (50.0, 100.0)];
        let mut previous: Option<String> = None;
        for (group, &(cx, cy)) in centers.iter().enumerate() {
            for i in 0..3 {
                let id = format!("X_{group}_{i}");
                let coord = (cx + i as f64, cy + i as f64 * 0.5);
                network.add_node(Node::new(&id, coord, 0.0));
                if let Some(prev) = &previous {
                    network
                        .add_pipe(prev, &id, Pipe::new(10.0, 500.0, 60.0))
                        .unwrap();
                }
                previous = Some(id);
            }
        }
        network
    }

    fn small_config() -> GeoClusterConfig {
        GeoClusterConfig {
            k_min: 2,
            k_max: 5,
            k_step: 1,
            seed: DEFAULT_SEED,
        }
    }

    #[test]
    fn test_three_regions_found() {
        let original = three_regions();
        let result = geographic_clustering(&original, &small_config());
        assert_eq!(result.network.graph.node_count(), 3);

        // Each cluster holds exactly one spatial group
        for node in result.network.graph.node_weights() {
            let members = node.original_nodes.as_ref().unwrap();
            assert_eq!(members.len(), 3);
            let group_prefix = &members[0][..4];
            assert!(members.iter().all(|m| m.starts_with(group_prefix)));
        }
    }

    #[test]
    fn test_too_small_network_unchanged() {
        let original = three_regions();
        let config = GeoClusterConfig {
            k_min: 20,
            ..small_config()
        };
        let result = geographic_clustering(&original, &config);
        assert_eq!(
            result.network.graph.node_count(),
            original.graph.node_count()
        );
        assert_eq!(result.diagnostics.warning_count(), 1);
    }

    #[test]
    fn test_deterministic() {
        let original = three_regions();
        let a = geographic_clustering(&original, &small_config());
        let b = geographic_clustering(&original, &small_config());
        let ids_a: Vec<&str> = a.network.node_ids().collect();
        let ids_b: Vec<&str> = b.network.node_ids().collect();
        assert_eq!(ids_a, ids_b);
    }
}
