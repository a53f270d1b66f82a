//! Empirical pipe capacity model.
//!
//! Maps a pipe's physical attributes (max pressure, nominal diameter,
//! length) to a mass-flow rating via a Panhandle-B-style approximation
//! for natural gas. The capacity is always derived, never authoritative:
//! every structural change that alters length/diameter/pressure must be
//! followed by a recomputation, and [`normalize_capacities`] is graph-local
//! and must be re-run per produced graph.

use crate::{Network, Node, Pipe, UndiNetwork};
use petgraph::graph::Graph;
use petgraph::EdgeType;

/// Specific gravity of natural gas relative to air.
pub const SPECIFIC_GRAVITY: f64 = 0.6;
/// Gas temperature assumed for the flow approximation, in Kelvin.
pub const TEMPERATURE_K: f64 = 288.0;
/// Conversion density from norm volume flow to mass flow, in kg/Nm3.
const DENSITY_KG_PER_NM3: f64 = 0.8;
/// Degenerate pipe lengths are clamped to 1 m to avoid division by zero.
const MIN_LENGTH_KM: f64 = 0.001;

/// Estimate the mass-flow rating of a pipe in kg/s.
///
/// Panhandle-B-like approximation: flow scales with `p^1.054 * d^2.53` and
/// inversely with `L^0.527`. Any arithmetic domain error (negative base to
/// a fractional power, division by zero) yields 0.0 rather than
/// propagating: a broken single edge must not abort a whole-graph
/// computation.
pub fn estimate_capacity(p_bar: f64, dn_mm: f64, length_km: f64) -> f64 {
    let length_km = if length_km <= 0.0 {
        MIN_LENGTH_KM
    } else {
        length_km
    };
    let flow = 0.0035 * p_bar.powf(1.054) * dn_mm.powf(2.53)
        / (length_km.powf(0.527) * SPECIFIC_GRAVITY.powf(0.473) * TEMPERATURE_K.sqrt());
    let kg_per_s = flow * DENSITY_KG_PER_NM3 / 3600.0;
    if kg_per_s.is_finite() {
        kg_per_s
    } else {
        0.0
    }
}

/// Recompute the derived capacity of every edge in place.
///
/// Edges with non-finite physical attributes get capacity 0.0.
pub fn add_capacities(network: &mut Network) {
    for pipe in network.graph.edge_weights_mut() {
        if !pipe.length_km.is_finite()
            || !pipe.diameter_mm.is_finite()
            || !pipe.max_pressure_bar.is_finite()
        {
            pipe.capacity = 0.0;
            continue;
        }
        pipe.capacity = estimate_capacity(pipe.max_pressure_bar, pipe.diameter_mm, pipe.length_km);
    }
}

/// Min-max rescale all edge capacities into [0.01, 1.0] in place.
///
/// The maximum-capacity edge maps to 1.0 and the minimum to 0.01; if all
/// capacities are equal every edge gets 1.0. Callers must invoke this after
/// any structural change that alters edge capacities.
pub fn normalize_capacities(network: &mut Network) {
    normalize_capacities_graph(&mut network.graph);
}

/// [`normalize_capacities`] for undirected projections.
pub fn normalize_capacities_undirected(network: &mut UndiNetwork) {
    normalize_capacities_graph(&mut network.graph);
}

fn normalize_capacities_graph<Ty: EdgeType>(graph: &mut Graph<Node, Pipe, Ty>) {
    let capacities: Vec<f64> = graph.edge_weights().map(|pipe| pipe.capacity).collect();
    let Some(min_cap) = capacities.iter().copied().reduce(f64::min) else {
        return;
    };
    let max_cap = capacities.iter().copied().fold(min_cap, f64::max);

    for pipe in graph.edge_weights_mut() {
        pipe.norm_capacity = Some(if max_cap > min_cap {
            0.01 + 0.99 * (pipe.capacity - min_cap) / (max_cap - min_cap)
        } else {
            1.0
        });
    }
}
