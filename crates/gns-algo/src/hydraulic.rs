//! Translation of a network into a steady-state hydraulic case description.
//!
//! The case lists junctions, pipes, compressors, valves, and boundary
//! conditions in solver-neutral form; an actual simulator plugs in behind
//! [`HydraulicSolver`]. Building the case is where component topology gets
//! validated: a compressor or valve that is not a clean two-port, or that
//! sits directly next to another component, cannot be modeled and is
//! demoted to a junction with a warning.

use gns_core::{Diagnostics, GnsError, GnsResult, Network, NodeRole};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Default pressure ratio of a compressor station.
pub const DEFAULT_PRESSURE_RATIO: f64 = 1.2;

#[derive(Debug, Clone)]
pub struct HydraulicConfig {
    /// Outlet/inlet pressure ratio applied by every compressor.
    pub pressure_ratio: f64,
    /// Pressure at the reference node, in bar.
    pub reference_pressure_bar: f64,
}

impl Default for HydraulicConfig {
    fn default() -> Self {
        Self {
            pressure_ratio: DEFAULT_PRESSURE_RATIO,
            reference_pressure_bar: 50.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Junction {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone)]
pub struct HydraulicPipe {
    pub from: String,
    pub to: String,
    pub length_km: f64,
    pub diameter_mm: f64,
}

#[derive(Debug, Clone)]
pub struct Compressor {
    pub id: String,
    pub inlet: String,
    pub outlet: String,
    pub pressure_ratio: f64,
}

#[derive(Debug, Clone)]
pub struct Valve {
    pub id: String,
    pub inlet: String,
    pub outlet: String,
    pub diameter_mm: f64,
}

/// A supply or offtake boundary condition, in kg/s (positive = injection).
#[derive(Debug, Clone)]
pub struct MassFlowBoundary {
    pub node: String,
    pub mass_flow_kg_s: f64,
}

/// Solver-neutral description of a steady-state case.
#[derive(Debug, Clone)]
pub struct HydraulicCase {
    pub junctions: Vec<Junction>,
    pub pipes: Vec<HydraulicPipe>,
    pub compressors: Vec<Compressor>,
    pub valves: Vec<Valve>,
    pub boundaries: Vec<MassFlowBoundary>,
    /// Node holding the fixed reference pressure (first interconnector).
    pub reference_node: String,
    pub reference_pressure_bar: f64,
    pub diagnostics: Diagnostics,
}

/// Pluggable steady-state solver backend.
pub trait HydraulicSolver {
    fn solve(&self, case: &HydraulicCase) -> GnsResult<HydraulicSolution>;
}

/// Per-node pressures and per-pipe flows from a solver run.
#[derive(Debug, Clone, Default)]
pub struct HydraulicSolution {
    pub pressures_bar: HashMap<String, f64>,
    pub pipe_flows_kg_s: HashMap<(String, String), f64>,
}

/// Build a hydraulic case from a network.
///
/// The pressure reference is the first interconnector in graph order;
/// without one the case is unsolvable and an error is returned. Components
/// become two-port elements when they have exactly one inlet and one
/// outlet edge and no component neighbor; otherwise they stay junctions.
/// Zero-diameter pipes are kept but reported.
pub fn build_case(network: &Network, config: &HydraulicConfig) -> GnsResult<HydraulicCase> {
    let mut diagnostics = Diagnostics::new();

    let reference_node = network
        .graph
        .node_weights()
        .find(|node| node.role() == NodeRole::Interconnector)
        .map(|node| node.id.clone())
        .ok_or_else(|| {
            GnsError::Network("no interconnector to serve as pressure reference".into())
        })?;

    // Decide which component nodes are modelable two-ports
    let mut component_kind: HashMap<String, NodeRole> = HashMap::new();
    for idx in network.graph.node_indices() {
        let node = &network.graph[idx];
        let role = node.role();
        if !role.is_component() {
            continue;
        }
        let inlets: Vec<_> = network
            .graph
            .edges_directed(idx, Direction::Incoming)
            .collect();
        let outlets: Vec<_> = network
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .collect();
        if inlets.len() != 1 || outlets.len() != 1 {
            warn!(
                node = %node.id,
                inlets = inlets.len(),
                outlets = outlets.len(),
                "component is not a two-port, modeling as junction"
            );
            diagnostics.add_warning_with_entity(
                "component",
                "component needs exactly one inlet and one outlet, kept as junction",
                &node.id,
            );
            continue;
        }
        let component_neighbor = network
            .graph
            .neighbors_undirected(idx)
            .any(|n| network.graph[n].role().is_component());
        if component_neighbor {
            diagnostics.add_warning_with_entity(
                "component",
                "component is adjacent to another component, kept as junction",
                &node.id,
            );
            continue;
        }
        component_kind.insert(node.id.clone(), role);
    }

    let mut case = HydraulicCase {
        junctions: Vec::new(),
        pipes: Vec::new(),
        compressors: Vec::new(),
        valves: Vec::new(),
        boundaries: Vec::new(),
        reference_node,
        reference_pressure_bar: config.reference_pressure_bar,
        diagnostics: Diagnostics::new(),
    };

    for node in network.graph.node_weights() {
        if !component_kind.contains_key(&node.id) {
            case.junctions.push(Junction {
                id: node.id.clone(),
                x: node.coord.x,
                y: node.coord.y,
            });
        }
        if node.supply != 0.0 {
            case.boundaries.push(MassFlowBoundary {
                node: node.id.clone(),
                mass_flow_kg_s: node.supply,
            });
        }
    }

    let mut zero_diameter = 0usize;
    for idx in network.graph.node_indices() {
        let node = &network.graph[idx];
        let Some(&role) = component_kind.get(&node.id) else {
            continue;
        };
        let inlet_edge = network
            .graph
            .edges_directed(idx, Direction::Incoming)
            .next()
            .expect("validated inlet");
        let outlet_edge = network
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .next()
            .expect("validated outlet");
        let inlet = network.graph[inlet_edge.source()].id.clone();
        let outlet = network.graph[outlet_edge.target()].id.clone();
        match role {
            NodeRole::CompressorStation => case.compressors.push(Compressor {
                id: node.id.clone(),
                inlet,
                outlet,
                pressure_ratio: config.pressure_ratio,
            }),
            NodeRole::ControlValve => case.valves.push(Valve {
                id: node.id.clone(),
                inlet,
                outlet,
                diameter_mm: inlet_edge
                    .weight()
                    .diameter_mm
                    .min(outlet_edge.weight().diameter_mm),
            }),
            _ => unreachable!("only components recorded"),
        }
    }

    for edge in network.graph.edge_references() {
        let from = &network.graph[edge.source()].id;
        let to = &network.graph[edge.target()].id;
        // Edges into or out of a modeled component are absorbed by the
        // two-port element
        if component_kind.contains_key(from) || component_kind.contains_key(to) {
            continue;
        }
        let pipe = edge.weight();
        if pipe.diameter_mm <= 0.0 {
            zero_diameter += 1;
            diagnostics.add_warning_with_entity(
                "physical",
                "pipe has zero diameter",
                &format!("{from}->{to}"),
            );
        }
        case.pipes.push(HydraulicPipe {
            from: from.clone(),
            to: to.clone(),
            length_km: pipe.length_km,
            diameter_mm: pipe.diameter_mm,
        });
    }
    if zero_diameter > 0 {
        debug!(zero_diameter, "case contains zero-diameter pipes");
    }

    case.diagnostics = diagnostics;
    Ok(case)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gns_core::{Node, Pipe};

    fn network_with_compressor() -> Network {
        // IC_1 -> CS_1 -> IND_1 plus a plain bypass junction path
        let mut network = Network::new();
        network.add_node(Node::new("IC_1", (0.0, 0.0), 30.0));
        network.add_node(Node::new("CS_1", (1.0, 0.0), 0.0));
        network.add_node(Node::new("IND_1", (2.0, 0.0), -30.0));
        network.add_node(Node::new("X_1", (1.0, 1.0), 0.0));
        network
            .add_pipe("IC_1", "CS_1", Pipe::new(5.0, 600.0, 70.0))
            .unwrap();
        network
            .add_pipe("CS_1", "IND_1", Pipe::new(5.0, 600.0, 70.0))
            .unwrap();
        network
            .add_pipe("IC_1", "X_1", Pipe::new(4.0, 300.0, 70.0))
            .unwrap();
        network
            .add_pipe("X_1", "IND_1", Pipe::new(4.0, 300.0, 70.0))
            .unwrap();
        network
    }

    #[test]
    fn test_compressor_becomes_two_port() {
        let case = build_case(&network_with_compressor(), &HydraulicConfig::default()).unwrap();
        assert_eq!(case.compressors.len(), 1);
        let cs = &case.compressors[0];
        assert_eq!(cs.inlet, "IC_1");
        assert_eq!(cs.outlet, "IND_1");
        assert!((cs.pressure_ratio - DEFAULT_PRESSURE_RATIO).abs() < 1e-12);
        // CS_1 is not a junction; its two edges are absorbed
        assert!(case.junctions.iter().all(|j| j.id != "CS_1"));
        assert_eq!(case.pipes.len(), 2);
    }

    #[test]
    fn test_reference_is_first_interconnector() {
        let case = build_case(&network_with_compressor(), &HydraulicConfig::default()).unwrap();
        assert_eq!(case.reference_node, "IC_1");
    }

    #[test]
    fn test_no_interconnector_is_error() {
        let mut network = Network::new();
        network.add_node(Node::new("X_1", (0.0, 0.0), 0.0));
        let err = build_case(&network, &HydraulicConfig::default());
        assert!(matches!(err, Err(GnsError::Network(_))));
    }

    #[test]
    fn test_malformed_component_demoted() {
        // CS with two outlets cannot be a two-port
        let mut network = network_with_compressor();
        network
            .add_pipe("CS_1", "X_1", Pipe::new(1.0, 300.0, 70.0))
            .unwrap();
        let case = build_case(&network, &HydraulicConfig::default()).unwrap();
        assert!(case.compressors.is_empty());
        assert!(case.junctions.iter().any(|j| j.id == "CS_1"));
        assert_eq!(case.diagnostics.count_category("component"), 1);
    }

    #[test]
    fn test_adjacent_components_demoted() {
        let mut network = Network::new();
        network.add_node(Node::new("IC_1", (0.0, 0.0), 10.0));
        network.add_node(Node::new("CS_1", (1.0, 0.0), 0.0));
        network.add_node(Node::new("CV_1", (2.0, 0.0), 0.0));
        network.add_node(Node::new("IND_1", (3.0, 0.0), -10.0));
        for (a, b) in [("IC_1", "CS_1"), ("CS_1", "CV_1"), ("CV_1", "IND_1")] {
            network.add_pipe(a, b, Pipe::new(2.0, 400.0, 60.0)).unwrap();
        }
        let case = build_case(&network, &HydraulicConfig::default()).unwrap();
        assert!(case.compressors.is_empty());
        assert!(case.valves.is_empty());
        assert_eq!(case.diagnostics.count_category("component"), 2);
    }

    #[test]
    fn test_valve_takes_min_diameter() {
        let mut network = Network::new();
        network.add_node(Node::new("IC_1", (0.0, 0.0), 10.0));
        network.add_node(Node::new("CV_1", (1.0, 0.0), 0.0));
        network.add_node(Node::new("IND_1", (2.0, 0.0), -10.0));
        network
            .add_pipe("IC_1", "CV_1", Pipe::new(2.0, 500.0, 60.0))
            .unwrap();
        network
            .add_pipe("CV_1", "IND_1", Pipe::new(2.0, 350.0, 60.0))
            .unwrap();
        let case = build_case(&network, &HydraulicConfig::default()).unwrap();
        assert_eq!(case.valves.len(), 1);
        assert!((case.valves[0].diameter_mm - 350.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_diameter_pipe_reported() {
        let mut network = network_with_compressor();
        network.add_node(Node::new("X_2", (5.0, 5.0), 0.0));
        network
            .add_pipe("X_1", "X_2", Pipe::new(1.0, 0.0, 60.0))
            .unwrap();
        let case = build_case(&network, &HydraulicConfig::default()).unwrap();
        assert_eq!(case.diagnostics.count_category("physical"), 1);
    }

    #[test]
    fn test_boundaries_follow_supply_sign() {
        let case = build_case(&network_with_compressor(), &HydraulicConfig::default()).unwrap();
        assert_eq!(case.boundaries.len(), 2);
        let supply: f64 = case.boundaries.iter().map(|b| b.mass_flow_kg_s).sum();
        assert!(supply.abs() < 1e-12);
    }
}
