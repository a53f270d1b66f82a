//! Network simplification strategies.
//!
//! Every strategy consumes an original network and produces a smaller one
//! plus the diagnostics accumulated along the way. Strategies fall into two
//! families:
//!
//! - **Reductions** keep a subset of the original nodes:
//!   [`path_contraction`], [`importance_absorption`], [`k_core`]
//! - **Clusterings** replace groups of nodes by super-nodes:
//!   [`community_clustering`], [`geographic_clustering`],
//!   [`embedding_clustering`]
//!
//! Reductions take a set of protected id prefixes (see
//! [`crate::reconnect::DEFAULT_PROTECTED_PREFIXES`]) and run the
//! reconnection layer so the matching stations survive; clusterings
//! instead record every absorbed node on its super-node. All strategies
//! leave the result with freshly normalized capacities.

mod absorption;
mod cluster_build;
mod community;
mod contraction;
mod embedding;
mod geo_kmeans;
mod k_core;

pub use absorption::importance_absorption;
pub use cluster_build::build_clustered_network;
pub use community::{
    community_clustering, community_clustering_default, detect_communities, modularity,
};
pub use contraction::path_contraction;
pub use embedding::{
    build_features, embedding_clustering, EmbeddingClusterConfig, GraphEncoder, GraphFeatures,
    PropagationEncoder,
};
pub use geo_kmeans::{geographic_clustering, GeoClusterConfig};
pub use k_core::{k_core, DEFAULT_K};

use gns_core::{Diagnostics, Network};

/// Output of a simplification strategy.
#[derive(Debug, Clone)]
pub struct Simplified {
    pub network: Network,
    pub diagnostics: Diagnostics,
}
