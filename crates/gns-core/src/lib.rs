//! # gns-core: Gas Transport Network Modeling Core
//!
//! Provides the fundamental data structures for gas-transport network
//! simplification and evaluation.
//!
//! ## Design Philosophy
//!
//! Networks are modeled as **directed graphs** where:
//! - **Nodes**: stations and junctions keyed by a unique string id whose
//!   prefix encodes the semantic role (compressor station, control valve,
//!   industrial consumer, interconnector, ...)
//! - **Edges**: pipes with physical attributes (length, nominal diameter,
//!   max operating pressure) and a derived mass-flow capacity
//!
//! This graph-based approach enables:
//! - Fast topological queries (connectivity, component detection)
//! - Cheap cloning so every simplification strategy works on its own copy
//! - Explicit attribute structs instead of dynamic attribute bags
//!
//! ## Quick Start
//!
//! ```rust
//! use gns_core::{Network, Node, Pipe};
//!
//! let mut network = Network::new();
//! network.add_node(Node::new("GPR_1", (4.2e6, 3.1e6), 120.0));
//! network.add_node(Node::new("IND_1", (4.3e6, 3.2e6), -120.0));
//! network
//!     .add_pipe("GPR_1", "IND_1", Pipe::new(42.0, 500.0, 60.0))
//!     .unwrap();
//!
//! assert_eq!(network.graph.node_count(), 2);
//! assert!(network.graph.edge_weights().next().unwrap().capacity > 0.0);
//! ```
//!
//! ## Modules
//!
//! - [`capacity`] - Empirical pipe capacity model and per-graph normalization
//! - [`diagnostics`] - Validation and recoverable-error reporting
//! - [`graph_utils`] - Projections, components, graph statistics
//!
//! ## Mutation discipline
//!
//! Simplification strategies must operate on an independent copy of their
//! input graph. Algorithms that shrink a network rebuild a fresh [`Network`]
//! instead of removing nodes in place, which keeps the string-id index valid
//! (petgraph's swap-removal is never observed).

use petgraph::prelude::*;
use petgraph::Undirected;
use std::collections::HashMap;

pub mod capacity;
pub mod diagnostics;
pub mod error;
pub mod graph_utils;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{GnsError, GnsResult};
pub use graph_utils::*;
pub use petgraph::graph::NodeIndex;

/// Geographic coordinate of a node (projected planar x/y, e.g. EPSG:3035).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Coord {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Semantic role of a network node, decoded from its id prefix.
///
/// Classification is longest-matching-prefix and case-insensitive, so
/// `"IND_07"` is [`NodeRole::Industrial`] rather than a failed match on the
/// shorter `IC` code. Ids with no known prefix map to [`NodeRole::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub enum NodeRole {
    /// Biomethane feed-in (`BIO`)
    Biomethane,
    /// Compressor station (`CS`)
    CompressorStation,
    /// Control valve (`CV`)
    ControlValve,
    /// Distribution system operator offtake (`DSO`)
    DistributionOperator,
    /// Gas production/receiving facility (`GPR`)
    Production,
    /// Cross-border interconnector (`IC`)
    Interconnector,
    /// Industrial consumer (`IND`)
    Industrial,
    /// LNG terminal (`LNG`)
    LngTerminal,
    /// Underground storage (`ST`)
    Storage,
    /// Thermal power plant offtake (`TPP`)
    PowerPlant,
    /// Generic junction (`X`)
    Junction,
    /// No known prefix matched
    Unknown,
}

impl NodeRole {
    /// All classifiable roles, ordered by descending prefix length so the
    /// longest match always wins.
    pub const PREFIX_ORDER: [NodeRole; 11] = [
        NodeRole::Biomethane,
        NodeRole::DistributionOperator,
        NodeRole::Production,
        NodeRole::Industrial,
        NodeRole::LngTerminal,
        NodeRole::PowerPlant,
        NodeRole::CompressorStation,
        NodeRole::ControlValve,
        NodeRole::Interconnector,
        NodeRole::Storage,
        NodeRole::Junction,
    ];

    /// The id prefix code for this role.
    pub fn code(&self) -> &'static str {
        match self {
            NodeRole::Biomethane => "BIO",
            NodeRole::CompressorStation => "CS",
            NodeRole::ControlValve => "CV",
            NodeRole::DistributionOperator => "DSO",
            NodeRole::Production => "GPR",
            NodeRole::Interconnector => "IC",
            NodeRole::Industrial => "IND",
            NodeRole::LngTerminal => "LNG",
            NodeRole::Storage => "ST",
            NodeRole::PowerPlant => "TPP",
            NodeRole::Junction => "X",
            NodeRole::Unknown => "UNKNOWN",
        }
    }

    /// Classify a node id by longest-matching-prefix, case-insensitively.
    pub fn from_id(id: &str) -> NodeRole {
        let lower = id.to_ascii_lowercase();
        for role in NodeRole::PREFIX_ORDER {
            if lower.starts_with(&role.code().to_ascii_lowercase()) {
                return role;
            }
        }
        NodeRole::Unknown
    }

    /// Compressor stations and control valves are active components rather
    /// than plain junctions; they get special treatment during reconnection
    /// and hydraulic case construction.
    pub fn is_component(&self) -> bool {
        matches!(self, NodeRole::CompressorStation | NodeRole::ControlValve)
    }
}

/// Flattened pre-simplification record of a node absorbed into a cluster.
///
/// Stored as a list of records on the super-node (rather than a map of
/// attribute maps) so the persistence adapter can serialize it without
/// nested composite values.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSnapshot {
    pub id: String,
    pub coord: Coord,
    pub supply: f64,
}

/// A network node: station, consumer, or junction.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique id; the prefix encodes the semantic role (see [`NodeRole`]).
    pub id: String,
    pub coord: Coord,
    /// Mass-flow rate in kg/s: positive = source, negative = sink, zero = passive.
    pub supply: f64,
    /// Ids of the original nodes this super-node represents. Present only on
    /// cluster aggregates; the lists across a clustered graph partition the
    /// original node set exactly.
    pub original_nodes: Option<Vec<String>>,
    /// Snapshot of each represented node's pre-simplification attributes.
    pub original_node_data: Option<Vec<NodeSnapshot>>,
}

impl Node {
    pub fn new(id: impl Into<String>, coord: impl Into<Coord>, supply: f64) -> Self {
        Self {
            id: id.into(),
            coord: coord.into(),
            supply,
            original_nodes: None,
            original_node_data: None,
        }
    }

    /// Semantic role decoded from the id prefix.
    pub fn role(&self) -> NodeRole {
        NodeRole::from_id(&self.id)
    }

    /// Whether this node is a cluster super-node.
    pub fn is_cluster(&self) -> bool {
        self.original_nodes.is_some()
    }

    /// Record of this node's current attributes, for cluster bookkeeping.
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id.clone(),
            coord: self.coord,
            supply: self.supply,
        }
    }
}

/// Provenance tag distinguishing plain pipes from virtual component links
/// and from edges produced by simplification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipeKind {
    /// Physical pipeline segment
    #[default]
    Pipe,
    /// Virtual link through a compressor station or control valve
    Component,
    /// Result of collapsing a degree-2 chain (series equivalence)
    Contracted,
    /// Result of aggregating all edges between two clusters (parallel equivalence)
    Aggregated,
}

/// A directed pipe edge with physical attributes and derived capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipe {
    /// Pipeline length in km
    pub length_km: f64,
    /// Nominal diameter in mm
    pub diameter_mm: f64,
    /// Maximum operating pressure in bar
    pub max_pressure_bar: f64,
    /// Derived mass-flow rating in kg/s. Never authoritative input: it must
    /// be recomputed whenever length/diameter/pressure change.
    pub capacity: f64,
    /// Capacity min-max rescaled into [0.01, 1.0] within one graph. Graph
    /// local: recomputed per graph, never carried over from a source graph.
    pub norm_capacity: Option<f64>,
    pub kind: PipeKind,
}

impl Default for Pipe {
    fn default() -> Self {
        Self {
            length_km: 0.0,
            diameter_mm: 0.0,
            max_pressure_bar: 0.0,
            capacity: 0.0,
            norm_capacity: None,
            kind: PipeKind::Pipe,
        }
    }
}

impl Pipe {
    /// Construct a pipe and derive its capacity from the physical attributes.
    pub fn new(length_km: f64, diameter_mm: f64, max_pressure_bar: f64) -> Self {
        Self {
            length_km,
            diameter_mm,
            max_pressure_bar,
            capacity: capacity::estimate_capacity(max_pressure_bar, diameter_mm, length_km),
            norm_capacity: None,
            kind: PipeKind::Pipe,
        }
    }

    /// Tag the pipe with a provenance kind.
    pub fn with_kind(mut self, kind: PipeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Recompute the derived capacity after attribute changes.
    pub fn refresh_capacity(&mut self) {
        self.capacity =
            capacity::estimate_capacity(self.max_pressure_bar, self.diameter_mm, self.length_km);
        self.norm_capacity = None;
    }
}

/// The core gas network graph: directed, string-keyed.
#[derive(Debug, Clone, Default)]
pub struct Network {
    pub graph: DiGraph<Node, Pipe>,
    index: HashMap<String, NodeIndex>,
}

/// Undirected projection of a [`Network`], used by path contraction,
/// community detection, and the structural scores.
#[derive(Debug, Clone, Default)]
pub struct UndiNetwork {
    pub graph: Graph<Node, Pipe, Undirected>,
    index: HashMap<String, NodeIndex>,
}

macro_rules! impl_network_common {
    ($ty:ident) => {
        impl $ty {
            /// Insert a node, replacing any previous node with the same id.
            pub fn add_node(&mut self, node: Node) -> NodeIndex {
                if let Some(&idx) = self.index.get(&node.id) {
                    self.graph[idx] = node;
                    return idx;
                }
                let id = node.id.clone();
                let idx = self.graph.add_node(node);
                self.index.insert(id, idx);
                idx
            }

            /// Connect two existing nodes by id.
            pub fn add_pipe(
                &mut self,
                from: &str,
                to: &str,
                pipe: Pipe,
            ) -> GnsResult<petgraph::graph::EdgeIndex> {
                let a = self
                    .node_index(from)
                    .ok_or_else(|| GnsError::Network(format!("unknown node '{from}'")))?;
                let b = self
                    .node_index(to)
                    .ok_or_else(|| GnsError::Network(format!("unknown node '{to}'")))?;
                Ok(self.graph.add_edge(a, b, pipe))
            }

            /// Look up a node's graph index by id.
            pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
                self.index.get(id).copied()
            }

            /// Look up a node by id.
            pub fn node(&self, id: &str) -> Option<&Node> {
                self.node_index(id).map(|idx| &self.graph[idx])
            }

            pub fn contains(&self, id: &str) -> bool {
                self.index.contains_key(id)
            }

            /// Ids of all nodes, in insertion order.
            pub fn node_ids(&self) -> impl Iterator<Item = &str> + '_ {
                self.graph.node_weights().map(|n| n.id.as_str())
            }

            /// Net positive-supply nodes (sources).
            pub fn sources(&self) -> impl Iterator<Item = &Node> + '_ {
                self.graph.node_weights().filter(|n| n.supply > 0.0)
            }

            /// Net negative-supply nodes (sinks).
            pub fn sinks(&self) -> impl Iterator<Item = &Node> + '_ {
                self.graph.node_weights().filter(|n| n.supply < 0.0)
            }

            /// Sum of positive supply rates (kg/s).
            pub fn total_supply(&self) -> f64 {
                self.sources().map(|n| n.supply).sum()
            }

            /// Sum of absolute demand rates (kg/s).
            pub fn total_demand(&self) -> f64 {
                self.sinks().map(|n| -n.supply).sum()
            }
        }
    };
}

impl_network_common!(Network);
impl_network_common!(UndiNetwork);

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute basic statistics about the network.
    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats {
            num_nodes: self.graph.node_count(),
            num_pipes: self.graph.edge_count(),
            ..NetworkStats::default()
        };
        for node in self.graph.node_weights() {
            if node.supply > 0.0 {
                stats.num_sources += 1;
                stats.total_supply_kg_s += node.supply;
            } else if node.supply < 0.0 {
                stats.num_sinks += 1;
                stats.total_demand_kg_s += -node.supply;
            }
            if node.role().is_component() {
                stats.num_components += 1;
            }
        }
        stats
    }

    /// Validate network data for common issues that break downstream
    /// analysis. Populates the provided [`Diagnostics`].
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        let stats = self.stats();

        if stats.num_nodes == 0 {
            diag.add_error("structure", "Network has no nodes");
            return;
        }
        if stats.num_pipes == 0 && stats.num_nodes > 1 {
            diag.add_error("structure", "Network has multiple nodes but no pipes");
        }
        if stats.num_sources == 0 {
            diag.add_warning("supply", "Network has no supply nodes");
        }
        if stats.num_sinks == 0 {
            diag.add_warning("supply", "Network has no demand nodes");
        }
        if stats.total_supply_kg_s + 1e-9 < stats.total_demand_kg_s {
            diag.add_warning(
                "supply",
                &format!(
                    "Total supply ({:.1} kg/s) is less than total demand ({:.1} kg/s)",
                    stats.total_supply_kg_s, stats.total_demand_kg_s
                ),
            );
        }
        for edge in self.graph.edge_weights() {
            if !edge.length_km.is_finite()
                || !edge.diameter_mm.is_finite()
                || !edge.max_pressure_bar.is_finite()
            {
                diag.add_warning("physical", "Pipe has non-finite physical attributes");
            }
        }
    }
}

impl UndiNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total node degree by id.
    pub fn degree(&self, id: &str) -> usize {
        self.node_index(id)
            .map(|idx| self.graph.neighbors(idx).count())
            .unwrap_or(0)
    }
}

/// Statistics about a network's size and supply balance.
#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub num_nodes: usize,
    pub num_pipes: usize,
    pub num_sources: usize,
    pub num_sinks: usize,
    pub num_components: usize,
    pub total_supply_kg_s: f64,
    pub total_demand_kg_s: f64,
}

impl std::fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} nodes, {} pipes, {} sources ({:.1} kg/s), {} sinks ({:.1} kg/s)",
            self.num_nodes,
            self.num_pipes,
            self.num_sources,
            self.total_supply_kg_s,
            self.num_sinks,
            self.total_demand_kg_s
        )
    }
}
