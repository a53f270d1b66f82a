//! GML subset reader and writer.
//!
//! The on-disk format carries only static attributes: node ids,
//! coordinates, cluster membership, and the physical pipe attributes.
//! Derived and live values (capacity, normalized capacity, supply) are
//! never written; [`read_gml`] recomputes capacities after the graph is
//! rebuilt, and supply comes back through the measured-supply table
//! ([`crate::importers::apply_supply`]). A file edited by hand can never
//! smuggle in a stale capacity.
//!
//! Cluster bookkeeping is flattened to scalars: member ids become one
//! comma-separated string and member snapshots one embedded JSON string,
//! since GML attribute values cannot nest.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use gns_core::{capacity, Coord, Diagnostics, Network, Node, NodeSnapshot, Pipe, PipeKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Parse failure pointing at the offending line of the file.
#[derive(Debug, thiserror::Error)]
pub enum GmlError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("edge references undeclared node id {index}")]
    UnknownNode { index: usize },
    #[error("no 'graph [' block found")]
    MissingGraph,
}

/// Parsed network plus the recoverable issues hit along the way.
#[derive(Debug)]
pub struct GmlImport {
    pub network: Network,
    pub diagnostics: Diagnostics,
}

/// Wire form of a [`NodeSnapshot`], kept local so the core types stay free
/// of serialization concerns.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRecord {
    id: String,
    x: f64,
    y: f64,
    supply: f64,
}

impl From<&NodeSnapshot> for SnapshotRecord {
    fn from(snap: &NodeSnapshot) -> Self {
        Self {
            id: snap.id.clone(),
            x: snap.coord.x,
            y: snap.coord.y,
            supply: snap.supply,
        }
    }
}

impl From<SnapshotRecord> for NodeSnapshot {
    fn from(record: SnapshotRecord) -> Self {
        Self {
            id: record.id,
            coord: Coord::new(record.x, record.y),
            supply: record.supply,
        }
    }
}

fn kind_code(kind: PipeKind) -> &'static str {
    match kind {
        PipeKind::Pipe => "pipe",
        PipeKind::Component => "component",
        PipeKind::Contracted => "contracted",
        PipeKind::Aggregated => "aggregated",
    }
}

fn parse_kind(code: &str) -> Option<PipeKind> {
    match code {
        "pipe" => Some(PipeKind::Pipe),
        "component" => Some(PipeKind::Component),
        "contracted" => Some(PipeKind::Contracted),
        "aggregated" => Some(PipeKind::Aggregated),
        _ => None,
    }
}

fn escape(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

fn unescape(value: &str) -> String {
    value.replace("&quot;", "\"").replace("&amp;", "&")
}

/// Non-finite scalars are written as 0.0. GML has no NaN literal, and a
/// file that round-trips must stay parseable.
fn sanitize(value: f64, entity: &str, attr: &str) -> f64 {
    if value.is_finite() {
        value
    } else {
        warn!(entity, attr, "non-finite scalar written as 0.0");
        0.0
    }
}

/// Serialize a network to the GML subset.
pub fn write_gml(network: &Network, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, render_gml(network))
        .with_context(|| format!("writing GML to '{}'", path.display()))
}

/// Render a network as a GML string.
pub fn render_gml(network: &Network) -> String {
    let mut out = String::from("graph [\n  directed 1\n");
    for idx in network.graph.node_indices() {
        let node = &network.graph[idx];
        out.push_str("  node [\n");
        out.push_str(&format!("    id {}\n", idx.index()));
        out.push_str(&format!("    label \"{}\"\n", escape(&node.id)));
        out.push_str(&format!("    x {}\n", sanitize(node.coord.x, &node.id, "x")));
        out.push_str(&format!("    y {}\n", sanitize(node.coord.y, &node.id, "y")));
        if let Some(members) = &node.original_nodes {
            out.push_str(&format!(
                "    members \"{}\"\n",
                escape(&members.join(","))
            ));
        }
        if let Some(data) = &node.original_node_data {
            let records: Vec<SnapshotRecord> = data.iter().map(SnapshotRecord::from).collect();
            match serde_json::to_string(&records) {
                Ok(json) => {
                    out.push_str(&format!("    member_data \"{}\"\n", escape(&json)));
                }
                Err(err) => warn!(node = %node.id, %err, "member snapshots not serialized"),
            }
        }
        out.push_str("  ]\n");
    }
    for edge_idx in network.graph.edge_indices() {
        let (source, target) = network
            .graph
            .edge_endpoints(edge_idx)
            .expect("edge index from edge_indices");
        let pipe = &network.graph[edge_idx];
        let entity = format!(
            "pipe {}->{}",
            network.graph[source].id, network.graph[target].id
        );
        out.push_str("  edge [\n");
        out.push_str(&format!("    source {}\n", source.index()));
        out.push_str(&format!("    target {}\n", target.index()));
        out.push_str(&format!(
            "    length_km {}\n",
            sanitize(pipe.length_km, &entity, "length_km")
        ));
        out.push_str(&format!(
            "    diameter_mm {}\n",
            sanitize(pipe.diameter_mm, &entity, "diameter_mm")
        ));
        out.push_str(&format!(
            "    max_pressure_bar {}\n",
            sanitize(pipe.max_pressure_bar, &entity, "max_pressure_bar")
        ));
        out.push_str(&format!("    kind \"{}\"\n", kind_code(pipe.kind)));
        out.push_str("  ]\n");
    }
    out.push_str("]\n");
    out
}

/// Load a network from a GML file, recomputing capacities and the per-graph
/// capacity normalization.
pub fn read_gml(path: impl AsRef<Path>) -> Result<GmlImport> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading GML '{}'; ensure file exists", path.display()))?;
    parse_gml(&contents).with_context(|| format!("parsing GML '{}'", path.display()))
}

struct RawNode {
    id: usize,
    label: String,
    x: f64,
    y: f64,
    supply: f64,
    members: Option<Vec<String>>,
    member_data: Option<String>,
}

struct RawEdge {
    source: usize,
    target: usize,
    length_km: f64,
    diameter_mm: f64,
    max_pressure_bar: f64,
    kind: Option<String>,
}

#[derive(PartialEq, Eq)]
enum Section {
    Top,
    Graph,
    Node,
    Edge,
}

/// Parse a GML string into a network.
pub fn parse_gml(contents: &str) -> Result<GmlImport> {
    let mut diagnostics = Diagnostics::new();
    let mut section = Section::Top;
    let mut attrs: HashMap<String, String> = HashMap::new();
    let mut raw_nodes: Vec<RawNode> = Vec::new();
    let mut raw_edges: Vec<RawEdge> = Vec::new();
    let mut saw_graph = false;

    for (lineno, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        let lineno = lineno + 1;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match section {
            Section::Top => {
                if opens_block(line, "graph") {
                    saw_graph = true;
                    section = Section::Graph;
                }
                // Creator lines and other preamble are skipped
            }
            Section::Graph => {
                if opens_block(line, "node") {
                    attrs.clear();
                    section = Section::Node;
                } else if opens_block(line, "edge") {
                    attrs.clear();
                    section = Section::Edge;
                } else if line == "]" {
                    section = Section::Top;
                } else {
                    let (key, value) = split_attr(line, lineno)?;
                    if key == "directed" && value == "0" {
                        diagnostics.add_warning(
                            "structure",
                            "GML declares an undirected graph; edges read as directed",
                        );
                    }
                }
            }
            Section::Node => {
                if line == "]" {
                    raw_nodes.push(build_raw_node(&attrs, lineno, &mut diagnostics)?);
                    section = Section::Graph;
                } else {
                    let (key, value) = split_attr(line, lineno)?;
                    attrs.insert(key.to_string(), value);
                }
            }
            Section::Edge => {
                if line == "]" {
                    raw_edges.push(build_raw_edge(&attrs, lineno, &mut diagnostics)?);
                    section = Section::Graph;
                } else {
                    let (key, value) = split_attr(line, lineno)?;
                    attrs.insert(key.to_string(), value);
                }
            }
        }
    }
    if !saw_graph {
        return Err(GmlError::MissingGraph.into());
    }

    let mut network = Network::new();
    let mut label_by_id: HashMap<usize, String> = HashMap::new();
    for raw in raw_nodes {
        if network.contains(&raw.label) {
            diagnostics.add_warning_with_entity(
                "data",
                "duplicate node label; later record replaces the earlier one",
                &raw.label,
            );
        }
        let mut node = Node::new(raw.label.clone(), (raw.x, raw.y), raw.supply);
        node.original_nodes = raw.members;
        if let Some(json) = raw.member_data {
            match serde_json::from_str::<Vec<SnapshotRecord>>(&json) {
                Ok(records) => {
                    node.original_node_data =
                        Some(records.into_iter().map(NodeSnapshot::from).collect());
                }
                Err(err) => diagnostics.add_warning_with_entity(
                    "data",
                    &format!("unreadable member_data ignored: {err}"),
                    &raw.label,
                ),
            }
        }
        label_by_id.insert(raw.id, raw.label);
        network.add_node(node);
    }
    for raw in raw_edges {
        let from = label_by_id
            .get(&raw.source)
            .ok_or(GmlError::UnknownNode { index: raw.source })?;
        let to = label_by_id
            .get(&raw.target)
            .ok_or(GmlError::UnknownNode { index: raw.target })?;
        let kind = match raw.kind.as_deref() {
            None => PipeKind::Pipe,
            Some(code) => parse_kind(code).unwrap_or_else(|| {
                diagnostics.add_warning_with_entity(
                    "data",
                    &format!("unknown pipe kind '{code}', treated as plain pipe"),
                    &format!("pipe {from}->{to}"),
                );
                PipeKind::Pipe
            }),
        };
        let pipe = Pipe::new(raw.length_km, raw.diameter_mm, raw.max_pressure_bar).with_kind(kind);
        network.add_pipe(from, to, pipe)?;
    }
    capacity::normalize_capacities(&mut network);
    debug!(
        nodes = network.graph.node_count(),
        pipes = network.graph.edge_count(),
        "GML parsed"
    );

    Ok(GmlImport {
        network,
        diagnostics,
    })
}

fn opens_block(line: &str, keyword: &str) -> bool {
    line.starts_with(keyword) && line.ends_with('[')
}

/// Split a `key value` line; quoted values may contain spaces.
fn split_attr(line: &str, lineno: usize) -> Result<(&str, String), GmlError> {
    let key_end = line.find(char::is_whitespace).ok_or_else(|| GmlError::Syntax {
        line: lineno,
        message: format!("expected 'key value', got '{line}'"),
    })?;
    let key = &line[..key_end];
    let rest = line[key_end..].trim();
    let value = if let Some(inner) = rest.strip_prefix('"') {
        let inner = inner.strip_suffix('"').ok_or_else(|| GmlError::Syntax {
            line: lineno,
            message: "unterminated string value".to_string(),
        })?;
        unescape(inner)
    } else {
        rest.to_string()
    };
    Ok((key, value))
}

fn required_usize(
    attrs: &HashMap<String, String>,
    key: &str,
    lineno: usize,
) -> Result<usize, GmlError> {
    attrs
        .get(key)
        .and_then(|v| v.parse::<usize>().ok())
        .ok_or_else(|| GmlError::Syntax {
            line: lineno,
            message: format!("missing or non-integer '{key}'"),
        })
}

fn float_or_default(
    attrs: &HashMap<String, String>,
    key: &str,
    entity: &str,
    diagnostics: &mut Diagnostics,
) -> f64 {
    match attrs.get(key) {
        Some(value) => match value.parse::<f64>() {
            Ok(parsed) => parsed,
            Err(_) => {
                diagnostics.add_warning_with_entity(
                    "data",
                    &format!("non-numeric '{key}' defaulted to 0"),
                    entity,
                );
                0.0
            }
        },
        None => {
            diagnostics.add_warning_with_entity(
                "data",
                &format!("missing '{key}' defaulted to 0"),
                entity,
            );
            0.0
        }
    }
}

fn build_raw_node(
    attrs: &HashMap<String, String>,
    lineno: usize,
    diagnostics: &mut Diagnostics,
) -> Result<RawNode, GmlError> {
    let id = required_usize(attrs, "id", lineno)?;
    let label = attrs.get("label").cloned().ok_or_else(|| GmlError::Syntax {
        line: lineno,
        message: format!("node {id} has no label"),
    })?;
    // Supply is not part of the persisted form; a foreign file carrying it
    // is still read rather than rejected
    let supply = match attrs.get("supply") {
        None => 0.0,
        Some(_) => float_or_default(attrs, "supply", &label, diagnostics),
    };
    Ok(RawNode {
        id,
        x: float_or_default(attrs, "x", &label, diagnostics),
        y: float_or_default(attrs, "y", &label, diagnostics),
        supply,
        members: attrs
            .get("members")
            .map(|list| list.split(',').map(str::to_string).collect()),
        member_data: attrs.get("member_data").cloned(),
        label,
    })
}

fn build_raw_edge(
    attrs: &HashMap<String, String>,
    lineno: usize,
    diagnostics: &mut Diagnostics,
) -> Result<RawEdge, GmlError> {
    let source = required_usize(attrs, "source", lineno)?;
    let target = required_usize(attrs, "target", lineno)?;
    let entity = format!("edge {source}->{target}");
    Ok(RawEdge {
        source,
        target,
        length_km: float_or_default(attrs, "length_km", &entity, diagnostics),
        diameter_mm: float_or_default(attrs, "diameter_mm", &entity, diagnostics),
        max_pressure_bar: float_or_default(attrs, "max_pressure_bar", &entity, diagnostics),
        kind: attrs.get("kind").cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gns_core::capacity::estimate_capacity;

    fn sample_network() -> Network {
        let mut network = Network::new();
        network.add_node(Node::new("GPR_1", (4.2e6, 3.1e6), 120.0));
        network.add_node(Node::new("X_1", (4.25e6, 3.15e6), 0.0));
        network.add_node(Node::new("IND_1", (4.3e6, 3.2e6), -120.0));
        network
            .add_pipe("GPR_1", "X_1", Pipe::new(42.0, 500.0, 60.0))
            .unwrap();
        network
            .add_pipe("X_1", "IND_1", Pipe::new(18.5, 800.0, 80.0))
            .unwrap();
        network
    }

    #[test]
    fn test_round_trip() {
        let original = sample_network();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.gml");

        write_gml(&original, &path).unwrap();
        let imported = read_gml(&path).unwrap();
        assert!(!imported.diagnostics.has_errors());

        let loaded = imported.network;
        assert_eq!(loaded.graph.node_count(), 3);
        assert_eq!(loaded.graph.edge_count(), 2);
        let gpr = loaded.node("GPR_1").unwrap();
        // Live supply is not persisted; it comes back via apply_supply
        assert_eq!(gpr.supply, 0.0);
        assert_eq!(gpr.coord.x, 4.2e6);

        let pipe = loaded.graph.edge_weights().next().unwrap();
        assert_eq!(pipe.length_km, 42.0);
        // Capacity is derived on load, not read from the file
        assert!((pipe.capacity - estimate_capacity(60.0, 500.0, 42.0)).abs() < 1e-12);
        let norm = pipe.norm_capacity.unwrap();
        assert!((0.01..=1.0).contains(&norm));
    }

    #[test]
    fn test_cluster_members_round_trip() {
        let mut network = Network::new();
        let mut cluster = Node::new("C_0", (1.0, 2.0), 15.0);
        cluster.original_nodes = Some(vec!["GPR_1".to_string(), "X_9".to_string()]);
        cluster.original_node_data = Some(vec![
            NodeSnapshot {
                id: "GPR_1".to_string(),
                coord: Coord::new(0.5, 2.0),
                supply: 15.0,
            },
            NodeSnapshot {
                id: "X_9".to_string(),
                coord: Coord::new(1.5, 2.0),
                supply: 0.0,
            },
        ]);
        network.add_node(cluster);

        let imported = parse_gml(&render_gml(&network)).unwrap();
        let loaded = imported.network.node("C_0").unwrap();
        assert!(loaded.is_cluster());
        assert_eq!(
            loaded.original_nodes.as_deref().unwrap(),
            ["GPR_1".to_string(), "X_9".to_string()]
        );
        let data = loaded.original_node_data.as_deref().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].id, "GPR_1");
        assert_eq!(data[0].supply, 15.0);
        assert_eq!(data[1].coord, Coord::new(1.5, 2.0));
    }

    #[test]
    fn test_pipe_kind_round_trip() {
        let mut network = Network::new();
        network.add_node(Node::new("X_1", (0.0, 0.0), 0.0));
        network.add_node(Node::new("X_2", (1.0, 0.0), 0.0));
        network
            .add_pipe(
                "X_1",
                "X_2",
                Pipe::new(30.0, 600.0, 70.0).with_kind(PipeKind::Contracted),
            )
            .unwrap();

        let imported = parse_gml(&render_gml(&network)).unwrap();
        let pipe = imported.network.graph.edge_weights().next().unwrap();
        assert_eq!(pipe.kind, PipeKind::Contracted);
    }

    #[test]
    fn test_quoted_label_escaping() {
        let mut network = Network::new();
        network.add_node(Node::new("X_\"odd\"&co", (0.0, 0.0), 0.0));
        let imported = parse_gml(&render_gml(&network)).unwrap();
        assert!(imported.network.contains("X_\"odd\"&co"));
    }

    #[test]
    fn test_non_finite_scalars_sanitized() {
        let mut network = Network::new();
        network.add_node(Node::new("X_1", (f64::NAN, 0.0), 0.0));
        network.add_node(Node::new("X_2", (1.0, 1.0), 0.0));
        network
            .add_pipe("X_1", "X_2", Pipe::new(f64::INFINITY, 300.0, 40.0))
            .unwrap();
        let imported = parse_gml(&render_gml(&network)).unwrap();
        let node = imported.network.node("X_1").unwrap();
        assert_eq!(node.coord.x, 0.0);
        let pipe = imported.network.graph.edge_weights().next().unwrap();
        assert_eq!(pipe.length_km, 0.0);
    }

    #[test]
    fn test_edge_to_undeclared_node_fails() {
        let text = "graph [\n  directed 1\n  node [\n    id 0\n    label \"X_1\"\n    x 0\n    y 0\n    supply 0\n  ]\n  edge [\n    source 0\n    target 7\n    length_km 1\n    diameter_mm 100\n    max_pressure_bar 10\n  ]\n]\n";
        assert!(parse_gml(text).is_err());
    }

    #[test]
    fn test_missing_graph_block_fails() {
        assert!(parse_gml("Creator \"someone\"\n").is_err());
    }

    #[test]
    fn test_unknown_kind_warns_and_defaults() {
        let text = "graph [\n  directed 1\n  node [\n    id 0\n    label \"X_1\"\n    x 0\n    y 0\n    supply 0\n  ]\n  node [\n    id 1\n    label \"X_2\"\n    x 1\n    y 0\n    supply 0\n  ]\n  edge [\n    source 0\n    target 1\n    length_km 5\n    diameter_mm 300\n    max_pressure_bar 40\n    kind \"weird\"\n  ]\n]\n";
        let imported = parse_gml(text).unwrap();
        assert!(imported.diagnostics.warning_count() >= 1);
        let pipe = imported.network.graph.edge_weights().next().unwrap();
        assert_eq!(pipe.kind, PipeKind::Pipe);
    }

    #[test]
    fn test_missing_physical_attrs_default_with_warning() {
        let text = "graph [\n  directed 1\n  node [\n    id 0\n    label \"X_1\"\n    x 0\n    y 0\n    supply 0\n  ]\n  node [\n    id 1\n    label \"X_2\"\n    x 1\n    y 0\n    supply 0\n  ]\n  edge [\n    source 0\n    target 1\n  ]\n]\n";
        let imported = parse_gml(text).unwrap();
        assert!(imported.diagnostics.warning_count() >= 3);
        let pipe = imported.network.graph.edge_weights().next().unwrap();
        assert_eq!(pipe.length_km, 0.0);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_gml("/nonexistent/net.gml").unwrap_err();
        assert!(err.to_string().contains("ensure file exists"));
    }
}
