//! CSV side-input importers.
//!
//! Both inputs are optional: a missing file or a file without the expected
//! columns logs a warning and yields an empty map, so callers fall back to
//! their defaults instead of aborting a batch run.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use gns_core::{Diagnostics, Network};

/// One row of the role importance table produced by a contingency sweep.
#[derive(Debug, Deserialize)]
struct WeightRecord {
    node_type: String,
    norm_avg_importance_score: f64,
}

#[derive(Debug, Deserialize)]
struct SupplyRecord {
    node: String,
    supply: f64,
}

/// Read per-role importance weights from a CSV with columns `node_type` and
/// `norm_avg_importance_score`. Keys are role prefix codes (`IC`, `ST`, ...).
pub fn read_importance_weights(path: impl AsRef<Path>) -> HashMap<String, f64> {
    let path = path.as_ref();
    let mut reader = match csv::Reader::from_path(path) {
        Ok(reader) => reader,
        Err(err) => {
            warn!(path = %path.display(), %err, "importance weights not read, using defaults");
            return HashMap::new();
        }
    };
    if !has_columns(&mut reader, &["node_type", "norm_avg_importance_score"], path) {
        return HashMap::new();
    }

    let mut weights = HashMap::new();
    for record in reader.deserialize::<WeightRecord>() {
        match record {
            Ok(row) => {
                weights.insert(row.node_type, row.norm_avg_importance_score);
            }
            Err(err) => warn!(path = %path.display(), %err, "importance weight row skipped"),
        }
    }
    weights
}

/// Read supply overrides from a CSV with columns `node` and `supply`
/// (kg/s, positive = source).
pub fn read_supply(path: impl AsRef<Path>) -> HashMap<String, f64> {
    let path = path.as_ref();
    let mut reader = match csv::Reader::from_path(path) {
        Ok(reader) => reader,
        Err(err) => {
            warn!(path = %path.display(), %err, "supply table not read, using defaults");
            return HashMap::new();
        }
    };
    if !has_columns(&mut reader, &["node", "supply"], path) {
        return HashMap::new();
    }

    let mut supplies = HashMap::new();
    for record in reader.deserialize::<SupplyRecord>() {
        match record {
            Ok(row) => {
                supplies.insert(row.node, row.supply);
            }
            Err(err) => warn!(path = %path.display(), %err, "supply row skipped"),
        }
    }
    supplies
}

/// Apply supply overrides to matching nodes. Unknown node ids are reported
/// and skipped. Returns the number of nodes updated.
pub fn apply_supply(
    network: &mut Network,
    supplies: &HashMap<String, f64>,
    diagnostics: &mut Diagnostics,
) -> usize {
    let mut applied = 0;
    for (id, supply) in supplies {
        match network.node_index(id) {
            Some(idx) => {
                network.graph[idx].supply = *supply;
                applied += 1;
            }
            None => diagnostics.add_warning_with_entity(
                "data",
                "supply override targets a node not in the network",
                id,
            ),
        }
    }
    applied
}

fn has_columns<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
    required: &[&str],
    path: &Path,
) -> bool {
    let headers = match reader.headers() {
        Ok(headers) => headers,
        Err(err) => {
            warn!(path = %path.display(), %err, "unreadable CSV header, using defaults");
            return false;
        }
    };
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            warn!(
                path = %path.display(),
                column, "CSV lacks required column, using defaults"
            );
            return false;
        }
    }
    true
}
