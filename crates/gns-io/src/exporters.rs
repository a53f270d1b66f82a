//! Result exporters: the role importance table consumed back by
//! [`crate::importers::read_importance_weights`], and a timestamped JSON
//! report of collected diagnostics.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use gns_core::{Diagnostics, NodeRole};

/// Write per-role importance weights as CSV with columns `node_type` and
/// `norm_avg_importance_score`, rows ordered by role code.
pub fn write_role_importance(
    path: impl AsRef<Path>,
    weights: &HashMap<NodeRole, f64>,
) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating '{}'", path.display()))?;
    writer.write_record(["node_type", "norm_avg_importance_score"])?;

    let mut rows: Vec<(&'static str, f64)> = weights
        .iter()
        .map(|(role, weight)| (role.code(), *weight))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));
    for (code, weight) in &rows {
        writer.write_record([code.to_string(), weight.to_string()])?;
    }
    writer
        .flush()
        .with_context(|| format!("writing '{}'", path.display()))?;
    info!(path = %path.display(), roles = rows.len(), "role importance written");
    Ok(())
}

/// One row of the detailed per-node contingency table. The analysis layer
/// maps its outage results into this wire form.
#[derive(Debug, Clone, Serialize)]
pub struct ContingencyRow {
    pub node: String,
    pub node_type: String,
    /// Deliverability with this node out of service (kg/s).
    pub contingency_flow: f64,
    pub drop_fraction: f64,
}

/// Write detailed per-node contingency records as CSV.
pub fn write_contingency_records(
    path: impl AsRef<Path>,
    rows: &[ContingencyRow],
) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating '{}'", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .flush()
        .with_context(|| format!("writing '{}'", path.display()))?;
    info!(path = %path.display(), rows = rows.len(), "contingency records written");
    Ok(())
}

#[derive(Serialize)]
struct DiagnosticsReport<'a> {
    generated_at: DateTime<Utc>,
    summary: String,
    diagnostics: &'a Diagnostics,
}

/// Write collected diagnostics as a timestamped JSON report.
pub fn write_diagnostics(path: impl AsRef<Path>, diagnostics: &Diagnostics) -> Result<()> {
    let path = path.as_ref();
    let report = DiagnosticsReport {
        generated_at: Utc::now(),
        summary: diagnostics.summary(),
        diagnostics,
    };
    let file = File::create(path).with_context(|| format!("creating '{}'", path.display()))?;
    serde_json::to_writer_pretty(file, &report)
        .with_context(|| format!("writing '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importers::read_importance_weights;

    #[test]
    fn test_role_importance_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.csv");
        let weights = HashMap::from([
            (NodeRole::Interconnector, 1.0),
            (NodeRole::Storage, 0.62),
            (NodeRole::Junction, 0.05),
        ]);
        write_role_importance(&path, &weights).unwrap();

        let loaded = read_importance_weights(&path);
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded["IC"], 1.0);
        assert_eq!(loaded["ST"], 0.62);
        assert_eq!(loaded["X"], 0.05);
    }

    #[test]
    fn test_contingency_records_written_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contingency.csv");
        let rows = vec![
            ContingencyRow {
                node: "CS_4".to_string(),
                node_type: "CS".to_string(),
                contingency_flow: 12.5,
                drop_fraction: 0.4,
            },
            ContingencyRow {
                node: "X_9".to_string(),
                node_type: "X".to_string(),
                contingency_flow: 20.0,
                drop_fraction: 0.04,
            },
        ];
        write_contingency_records(&path, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "node,node_type,contingency_flow,drop_fraction"
        );
        assert_eq!(lines.next().unwrap(), "CS_4,CS,12.5,0.4");
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_diagnostics_report_is_valid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diag.json");
        let mut diagnostics = Diagnostics::new();
        diagnostics.add_warning("supply", "Network has no demand nodes");
        diagnostics.add_error_with_entity("component", "compressor needs 1 inlet / 1 outlet", "CS_4");
        write_diagnostics(&path, &diagnostics).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["summary"], "1 errors, 1 warnings");
        assert_eq!(value["diagnostics"]["issues"].as_array().unwrap().len(), 2);
        assert!(value["generated_at"].is_string());
    }
}
