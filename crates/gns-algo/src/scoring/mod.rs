//! Quality scoring of a simplification: five weighted component scores
//! combined into one total in [0, 1].
//!
//! - **complexity**: how much smaller the simplified network is
//! - **structure**: portrait, betweenness, and spectral similarity
//! - **regionality**: geographic coverage retained
//! - **properties**: role-weighted capacity retained
//! - **flow**: deliverability preserved
//!
//! Weights are validated before any component is computed; an invalid
//! weight set aborts the whole evaluation.

mod complexity;
mod properties;
mod regionality;
mod structure;

pub use complexity::complexity_score;
pub use properties::{properties_score, role_weight, DEFAULT_ROLE_WEIGHT};
pub use regionality::{regionality_score, GridRegions, PolygonRegions, RegionLookup};
pub use structure::{
    betweenness_similarity, portrait_similarity, spectral_similarity, structure_score,
};

use crate::flow::deliverability_error;
use gns_core::{capacity, undirected_projection, GnsError, GnsResult, Network};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Default RNG seed for the sampled structural measures.
pub const DEFAULT_SCORING_SEED: u64 = 42;
/// Grid resolution of the default region model (cells per axis).
const DEFAULT_GRID_CELLS: usize = 10;
/// Tolerance for the weight-sum check.
const WEIGHT_SUM_TOL: f64 = 1e-9;

/// Relative weights of the five component scores. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScoreWeights {
    pub complexity: f64,
    pub structure: f64,
    pub regionality: f64,
    pub properties: f64,
    pub flow: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            complexity: 0.2,
            structure: 0.2,
            regionality: 0.2,
            properties: 0.2,
            flow: 0.2,
        }
    }
}

impl ScoreWeights {
    fn components(&self) -> [f64; 5] {
        [
            self.complexity,
            self.structure,
            self.regionality,
            self.properties,
            self.flow,
        ]
    }

    /// All weights must be finite, non-negative, and sum to 1.0.
    pub fn validate(&self) -> GnsResult<()> {
        for weight in self.components() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(GnsError::Config(format!(
                    "score weights must be finite and non-negative, got {weight}"
                )));
            }
        }
        let sum: f64 = self.components().iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOL {
            return Err(GnsError::Config(format!(
                "score weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// Component scores plus the weighted total. All components lie in [0, 1]
/// except complexity, which goes negative when the simplified graph grew.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub complexity: f64,
    pub structure: f64,
    pub regionality: f64,
    pub properties: f64,
    pub flow: f64,
    pub total: f64,
    pub weights: ScoreWeights,
}

impl std::fmt::Display for ScoreReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "total {:.3} (complexity {:.3}, structure {:.3}, regionality {:.3}, \
             properties {:.3}, flow {:.3})",
            self.total, self.complexity, self.structure, self.regionality, self.properties,
            self.flow
        )
    }
}

/// Evaluate a simplification with the default grid region model.
pub fn score(
    original: &Network,
    simplified: &Network,
    role_weights: &HashMap<String, f64>,
    weights: &ScoreWeights,
) -> GnsResult<ScoreReport> {
    weights.validate()?;
    let undi_orig = normalized_projection(original);
    let regions = GridRegions::covering(&undi_orig, DEFAULT_GRID_CELLS, DEFAULT_GRID_CELLS);
    score_inner(original, simplified, role_weights, weights, regions.as_ref().map(|r| r as &dyn RegionLookup))
}

/// Evaluate a simplification against an explicit region model (e.g.
/// administrative polygons).
pub fn score_with_regions(
    original: &Network,
    simplified: &Network,
    role_weights: &HashMap<String, f64>,
    weights: &ScoreWeights,
    regions: &dyn RegionLookup,
) -> GnsResult<ScoreReport> {
    weights.validate()?;
    score_inner(original, simplified, role_weights, weights, Some(regions))
}

fn normalized_projection(network: &Network) -> gns_core::UndiNetwork {
    let mut projection = undirected_projection(network);
    capacity::normalize_capacities_undirected(&mut projection);
    projection
}

fn score_inner(
    original: &Network,
    simplified: &Network,
    role_weights: &HashMap<String, f64>,
    weights: &ScoreWeights,
    regions: Option<&dyn RegionLookup>,
) -> GnsResult<ScoreReport> {
    let undi_orig = normalized_projection(original);
    let undi_simp = normalized_projection(simplified);

    let complexity = complexity_score(&undi_orig, &undi_simp);
    let structure = structure_score(&undi_orig, &undi_simp, DEFAULT_SCORING_SEED);
    let regionality = match regions {
        Some(regions) => regionality_score(&undi_orig, &undi_simp, regions),
        // No region model is derivable from an empty original
        None => 1.0,
    };
    let properties = properties_score(&undi_orig, &undi_simp, role_weights);
    let flow = 1.0 - deliverability_error(original, simplified);

    let total = weights.complexity * complexity
        + weights.structure * structure
        + weights.regionality * regionality
        + weights.properties * properties
        + weights.flow * flow;

    let report = ScoreReport {
        complexity,
        structure,
        regionality,
        properties,
        flow,
        total,
        weights: *weights,
    };
    info!(%report, "simplification scored");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gns_core::{Node, Pipe};

    fn sample_network() -> Network {
        let mut network = Network::new();
        let ids = ["GPR_1", "X_1", "X_2", "IND_1"];
        for (i, id) in ids.iter().enumerate() {
            let supply = match *id {
                "GPR_1" => 20.0,
                "IND_1" => -20.0,
                _ => 0.0,
            };
            network.add_node(Node::new(*id, (i as f64 * 10.0, (i % 2) as f64 * 5.0), supply));
        }
        for pair in ids.windows(2) {
            let pipe = Pipe::new(10.0, 500.0, 60.0);
            network.add_pipe(pair[0], pair[1], pipe.clone()).unwrap();
            network.add_pipe(pair[1], pair[0], pipe).unwrap();
        }
        network
    }

    #[test]
    fn test_weight_validation() {
        assert!(ScoreWeights::default().validate().is_ok());

        let bad = ScoreWeights {
            complexity: 0.5,
            ..ScoreWeights::default()
        };
        assert!(matches!(bad.validate(), Err(GnsError::Config(_))));

        let negative = ScoreWeights {
            complexity: -0.2,
            structure: 0.6,
            ..ScoreWeights::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_invalid_weights_abort_before_scoring() {
        let network = sample_network();
        let bad = ScoreWeights {
            flow: 0.9,
            ..ScoreWeights::default()
        };
        let result = score(&network, &network, &HashMap::new(), &bad);
        assert!(result.is_err());
    }

    #[test]
    fn test_self_score_near_perfect() {
        let network = sample_network();
        let report = score(&network, &network, &HashMap::new(), &ScoreWeights::default()).unwrap();
        // Complexity is rightly 0 for an unchanged graph; everything else
        // is a perfect match
        assert!((report.structure - 1.0).abs() < 1e-9);
        assert_eq!(report.regionality, 1.0);
        assert_eq!(report.properties, 1.0);
        assert_eq!(report.flow, 1.0);
        assert_eq!(report.complexity, 0.0);
        assert!((report.total - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_report_serializes_with_weights() {
        let network = sample_network();
        let report = score(&network, &network, &HashMap::new(), &ScoreWeights::default()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["flow"], 1.0);
        assert_eq!(json["weights"]["complexity"], 0.2);
    }

    #[test]
    fn test_score_in_unit_range() {
        let original = sample_network();
        let simplified = crate::simplify::path_contraction(
            &original,
            crate::reconnect::DEFAULT_PROTECTED_PREFIXES,
        )
        .network;
        let report = score(
            &original,
            &simplified,
            &HashMap::from([("IND".to_string(), 0.8)]),
            &ScoreWeights::default(),
        )
        .unwrap();
        for value in [
            report.complexity,
            report.structure,
            report.regionality,
            report.properties,
            report.flow,
            report.total,
        ] {
            assert!((0.0..=1.0).contains(&value), "out of range: {value}");
        }
        assert!(report.complexity > 0.0);
    }
}
