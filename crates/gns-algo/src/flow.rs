//! Deliverability engine: max-flow over a super-source/super-sink
//! augmentation.
//!
//! Deliverability is the maximum feasible total mass flow from all supply
//! nodes to all demand nodes. A synthetic super-source feeds every
//! net-positive-supply node (arc capacity = supply) and every
//! net-negative-supply node drains into a synthetic super-sink (arc
//! capacity = |supply|); max flow from super-source to super-sink is then
//! computed with Edmonds-Karp (BFS augmenting paths).
//!
//! [`FlowGraph`] supports temporarily disabling a node without rebuilding,
//! which is what the N-1 contingency loop needs: O(n) flow computations
//! against one shared structure, with exact restoration between removals.

use gns_core::Network;
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, VecDeque};

const FLOW_EPS: f64 = 1e-12;

#[derive(Debug, Clone)]
struct Arc {
    to: usize,
    cap: f64,
    flow: f64,
}

/// A residual flow network augmented with super-source and super-sink.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    node_ids: Vec<String>,
    id_to_idx: HashMap<String, usize>,
    /// Arcs stored as forward/reverse pairs: arc `2k` and `2k+1` are duals.
    arcs: Vec<Arc>,
    adjacency: Vec<Vec<usize>>,
    disabled: Vec<bool>,
    source: usize,
    sink: usize,
}

impl FlowGraph {
    /// Build the augmented flow graph from a network's pipes and supply
    /// attributes. Parallel pipes become parallel arcs and contribute their
    /// full combined capacity.
    pub fn build(network: &Network) -> Self {
        let n = network.graph.node_count();
        let node_ids: Vec<String> = network.graph.node_weights().map(|w| w.id.clone()).collect();
        let id_to_idx: HashMap<String, usize> = node_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let mut flow_graph = Self {
            node_ids,
            id_to_idx,
            arcs: Vec::new(),
            adjacency: vec![Vec::new(); n + 2],
            disabled: vec![false; n + 2],
            source: n,
            sink: n + 1,
        };

        for edge in network.graph.edge_references() {
            let from = flow_graph.id_to_idx[&network.graph[edge.source()].id];
            let to = flow_graph.id_to_idx[&network.graph[edge.target()].id];
            flow_graph.add_arc(from, to, edge.weight().capacity.max(0.0));
        }
        for (idx, node) in network.graph.node_weights().enumerate() {
            if node.supply > 0.0 {
                let source = flow_graph.source;
                flow_graph.add_arc(source, idx, node.supply);
            } else if node.supply < 0.0 {
                let sink = flow_graph.sink;
                flow_graph.add_arc(idx, sink, -node.supply);
            }
        }
        flow_graph
    }

    fn add_arc(&mut self, from: usize, to: usize, cap: f64) {
        let forward = self.arcs.len();
        self.arcs.push(Arc { to, cap, flow: 0.0 });
        self.arcs.push(Arc {
            to: from,
            cap: 0.0,
            flow: 0.0,
        });
        self.adjacency[from].push(forward);
        self.adjacency[to].push(forward + 1);
    }

    /// Number of real (non-synthetic) nodes.
    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    /// Id of the real node at `idx`.
    pub fn node_id(&self, idx: usize) -> &str {
        &self.node_ids[idx]
    }

    /// Temporarily take a node out of service: all its incident arcs are
    /// ignored until [`FlowGraph::enable_node`] restores it.
    pub fn disable_node(&mut self, idx: usize) {
        self.disabled[idx] = true;
    }

    /// Put a previously disabled node back in service, restoring the graph
    /// exactly.
    pub fn enable_node(&mut self, idx: usize) {
        self.disabled[idx] = false;
    }

    fn residual(&self, arc_idx: usize) -> f64 {
        let arc = &self.arcs[arc_idx];
        arc.cap - arc.flow
    }

    /// Maximum flow from super-source to super-sink (Edmonds-Karp).
    ///
    /// An unreachable sink (disconnected contingency state) is simply zero
    /// deliverability, not an error.
    pub fn max_flow(&mut self) -> f64 {
        for arc in &mut self.arcs {
            arc.flow = 0.0;
        }

        let mut total = 0.0;
        loop {
            // BFS for the shortest augmenting path in the residual graph
            let mut parent_arc: Vec<Option<usize>> = vec![None; self.adjacency.len()];
            let mut queue = VecDeque::new();
            queue.push_back(self.source);
            let mut reached = false;
            'bfs: while let Some(node) = queue.pop_front() {
                if self.disabled[node] {
                    continue;
                }
                for &arc_idx in &self.adjacency[node] {
                    // Every arc listed under `node` leaves it; its dual sits
                    // at `arc_idx ^ 1`.
                    let next = self.arcs[arc_idx].to;
                    if parent_arc[next].is_some()
                        || next == self.source
                        || self.disabled[next]
                        || self.residual(arc_idx) <= FLOW_EPS
                    {
                        continue;
                    }
                    parent_arc[next] = Some(arc_idx);
                    if next == self.sink {
                        reached = true;
                        break 'bfs;
                    }
                    queue.push_back(next);
                }
            }
            if !reached {
                break;
            }

            // Bottleneck along the path
            let mut bottleneck = f64::INFINITY;
            let mut node = self.sink;
            while node != self.source {
                let arc_idx = parent_arc[node].expect("path arc");
                bottleneck = bottleneck.min(self.residual(arc_idx));
                node = self.arcs[arc_idx ^ 1].to;
            }

            // Augment
            let mut node = self.sink;
            while node != self.source {
                let arc_idx = parent_arc[node].expect("path arc");
                self.arcs[arc_idx].flow += bottleneck;
                self.arcs[arc_idx ^ 1].flow -= bottleneck;
                node = self.arcs[arc_idx ^ 1].to;
            }
            total += bottleneck;
        }
        total
    }
}

/// Baseline deliverability of a network in kg/s.
pub fn max_deliverability(network: &Network) -> f64 {
    FlowGraph::build(network).max_flow()
}

/// Relative deliverability error between an original and a simplified
/// network, clamped to at most 1.0.
///
/// If the original deliverability is exactly 0, the error is 0.0 when the
/// simplified deliverability is also 0 and maximal (1.0) otherwise.
pub fn deliverability_error(original: &Network, simplified: &Network) -> f64 {
    let f_orig = max_deliverability(original);
    let f_simp = max_deliverability(simplified);

    if f_orig == 0.0 {
        return if f_simp == 0.0 { 0.0 } else { 1.0 };
    }
    ((f_orig - f_simp).abs() / f_orig).min(1.0)
}
