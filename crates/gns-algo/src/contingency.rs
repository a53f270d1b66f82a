//! N-1 contingency analysis over the deliverability engine.
//!
//! Every node is taken out of service in turn and the network's
//! deliverability is recomputed; the relative drop against the intact
//! baseline measures how critical that node is. Per-role aggregation of
//! the drops yields the normalized importance weights consumed by
//! importance-based simplification.
//!
//! The flow graph is built once and nodes are disabled/re-enabled in
//! place, so a full N-1 sweep costs n max-flow runs on one shared
//! structure.

use crate::flow::FlowGraph;
use gns_core::{Diagnostics, Network, NodeRole};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Deliverability impact of a single node outage.
#[derive(Debug, Clone, Serialize)]
pub struct NodeImpact {
    pub node_id: String,
    pub role: NodeRole,
    /// Deliverability with this node out of service (kg/s).
    pub contingency_flow: f64,
    /// Relative drop against the baseline, in [0, 1] for feasible cases.
    pub drop_fraction: f64,
}

/// Results of a full N-1 sweep.
#[derive(Debug, Clone, Serialize)]
pub struct ContingencyResults {
    /// Intact-network deliverability (kg/s).
    pub baseline_flow: f64,
    /// One entry per evaluated node outage.
    pub impacts: Vec<NodeImpact>,
    pub diagnostics: Diagnostics,
}

impl ContingencyResults {
    /// Impacts sorted by descending drop, most critical first.
    pub fn ranked(&self) -> Vec<&NodeImpact> {
        let mut ranked: Vec<&NodeImpact> = self.impacts.iter().collect();
        ranked.sort_by(|a, b| {
            b.drop_fraction
                .partial_cmp(&a.drop_fraction)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }

    /// Mean deliverability drop per node role.
    pub fn mean_drop_by_role(&self) -> HashMap<NodeRole, f64> {
        let mut sums: HashMap<NodeRole, (f64, usize)> = HashMap::new();
        for impact in &self.impacts {
            let entry = sums.entry(impact.role).or_insert((0.0, 0));
            entry.0 += impact.drop_fraction;
            entry.1 += 1;
        }
        sums.into_iter()
            .map(|(role, (sum, count))| (role, sum / count as f64))
            .collect()
    }

    /// Per-role importance weights, min-max normalized to [0, 1].
    ///
    /// The least impactful role maps to 0.0 and the most impactful to 1.0.
    /// If every role has the same mean drop, all weights are 1.0.
    pub fn role_importance(&self) -> HashMap<NodeRole, f64> {
        let means = self.mean_drop_by_role();
        let min = means.values().copied().fold(f64::INFINITY, f64::min);
        let max = means.values().copied().fold(f64::NEG_INFINITY, f64::max);
        if means.is_empty() {
            return HashMap::new();
        }
        if (max - min).abs() < f64::EPSILON {
            return means.keys().map(|&role| (role, 1.0)).collect();
        }
        means
            .into_iter()
            .map(|(role, mean)| (role, (mean - min) / (max - min)))
            .collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "N-1 sweep: {} outages evaluated, baseline {:.3} kg/s, worst drop {:.1}%",
            self.impacts.len(),
            self.baseline_flow,
            self.impacts
                .iter()
                .map(|i| i.drop_fraction)
                .fold(0.0, f64::max)
                * 100.0
        )
    }
}

/// Run an N-1 node-outage sweep.
///
/// A baseline deliverability of zero (no supply, no demand, or a
/// disconnected network) makes drop fractions meaningless; the sweep is
/// skipped and an empty result with a warning is returned instead.
pub fn run_n1_analysis(network: &Network) -> ContingencyResults {
    let mut diagnostics = Diagnostics::new();
    let mut flow_graph = FlowGraph::build(network);
    let baseline = flow_graph.max_flow();

    if baseline <= 0.0 {
        warn!(
            baseline,
            "baseline deliverability is non-positive, skipping N-1 sweep"
        );
        diagnostics.add_warning(
            "flow",
            "baseline deliverability is non-positive, no outages evaluated",
        );
        return ContingencyResults {
            baseline_flow: baseline,
            impacts: Vec::new(),
            diagnostics,
        };
    }

    let mut impacts = Vec::with_capacity(flow_graph.node_count());
    for idx in 0..flow_graph.node_count() {
        flow_graph.disable_node(idx);
        let contingency_flow = flow_graph.max_flow();
        flow_graph.enable_node(idx);

        let node_id = flow_graph.node_id(idx).to_string();
        let drop_fraction = (baseline - contingency_flow) / baseline;
        debug!(node = %node_id, drop = drop_fraction, "evaluated outage");
        impacts.push(NodeImpact {
            role: NodeRole::from_id(&node_id),
            node_id,
            contingency_flow,
            drop_fraction,
        });
    }

    ContingencyResults {
        baseline_flow: baseline,
        impacts,
        diagnostics,
    }
}

/// Expand per-role importance weights into per-node scores by matching
/// each node's id prefix. Nodes whose role carries no weight are absent
/// from the map, which importance-based removal treats as "never remove".
pub fn node_scores_from_role_weights(
    network: &Network,
    role_weights: &HashMap<NodeRole, f64>,
) -> HashMap<String, f64> {
    network
        .graph
        .node_weights()
        .filter_map(|node| {
            role_weights
                .get(&node.role())
                .map(|&weight| (node.id.clone(), weight))
        })
        .collect()
}
