//! # gns-algo: Simplification and Analysis Algorithms for Gas Networks
//!
//! This crate provides the algorithmic layer on top of [`gns_core`]:
//! simplification strategies, the reconnection layer, deliverability and
//! contingency analysis, and the scoring engine that judges how faithful a
//! simplified network is to its original.
//!
//! ## Simplification
//!
//! | Strategy | Family | Output |
//! |----------|--------|--------|
//! | [`simplify::path_contraction`] | reduction | degree-2 chains collapsed |
//! | [`simplify::importance_absorption`] | reduction | low-importance nodes absorbed |
//! | [`simplify::k_core`] | reduction | sparse fringe peeled |
//! | [`simplify::community_clustering`] | clustering | Louvain communities as super-nodes |
//! | [`simplify::geographic_clustering`] | clustering | k-means over coordinates |
//! | [`simplify::embedding_clustering`] | clustering | k-means over graph embeddings |
//!
//! Reductions run [`reconnect`] so protected stations survive; clusterings
//! record every absorbed node on its super-node instead.
//!
//! ## Analysis
//!
//! - [`flow`]: max-flow deliverability over a super-source/super-sink
//!   augmentation
//! - [`contingency`]: N-1 node-outage sweeps and the role importance
//!   weights they produce
//! - [`scoring`]: five-component quality score (complexity, structure,
//!   regionality, properties, flow)
//! - [`hydraulic`]: solver-neutral steady-state case construction
//!
//! ## Example
//!
//! ```
//! use gns_algo::reconnect::DEFAULT_PROTECTED_PREFIXES;
//! use gns_algo::simplify::path_contraction;
//! use gns_algo::scoring::{score, ScoreWeights};
//! use gns_algo::test_utils::bidirectional_chain;
//! use std::collections::HashMap;
//!
//! let original = bidirectional_chain(&["GPR_1", "X_1", "X_2", "IND_1"], 10.0, 15.0);
//! let simplified = path_contraction(&original, DEFAULT_PROTECTED_PREFIXES);
//!
//! let report = score(
//!     &original,
//!     &simplified.network,
//!     &HashMap::new(),
//!     &ScoreWeights::default(),
//! )
//! .unwrap();
//! assert!(report.total > 0.0);
//! ```

pub mod cluster;
pub mod contingency;
pub mod flow;
pub mod hydraulic;
pub mod reconnect;
pub mod scoring;
pub mod simplify;
pub mod test_utils;

pub use cluster::{best_labels_by_silhouette, silhouette_score, KMeans};
pub use contingency::{
    node_scores_from_role_weights, run_n1_analysis, ContingencyResults, NodeImpact,
};
pub use flow::{deliverability_error, max_deliverability, FlowGraph};
pub use hydraulic::{build_case, HydraulicCase, HydraulicConfig, HydraulicSolver};
pub use reconnect::{
    is_protected, protected_nodes, reconnect, restore_component_edges,
    DEFAULT_PROTECTED_PREFIXES,
};
pub use scoring::{score, score_with_regions, ScoreReport, ScoreWeights};
pub use simplify::Simplified;
