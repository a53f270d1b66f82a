//! Structural preservation scores: network portrait similarity, betweenness
//! distribution similarity, and spectral similarity of capacity-weighted
//! Laplacians.
//!
//! All three compare an undirected original against an undirected
//! simplified network and return values in [0, 1], higher meaning more
//! structure preserved. Shortest-path based measures sample their source
//! nodes on large graphs; sampling is seeded and deterministic.

use gns_core::UndiNetwork;
use petgraph::visit::EdgeRef;
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::collections::{BinaryHeap, HashMap};

/// Above this many sampled sources, shortest-path measures subsample.
const SAMPLE_THRESHOLD: usize = 300;
/// Fraction of nodes used as sources when subsampling.
const SAMPLE_FRACTION: f64 = 0.2;
/// Relative tolerance for equal-length shortest paths.
const PATH_EPS: f64 = 1e-9;

/// Mean of the three structural similarity measures.
pub fn structure_score(original: &UndiNetwork, simplified: &UndiNetwork, seed: u64) -> f64 {
    let portrait = portrait_similarity(original, simplified, seed);
    let betweenness = betweenness_similarity(original, simplified, seed);
    let spectral = spectral_similarity(original, simplified);
    (portrait + betweenness + spectral) / 3.0
}

/// Length-weighted adjacency in graph order.
struct LengthGraph {
    ids: Vec<String>,
    adjacency: Vec<Vec<(usize, f64)>>,
}

impl LengthGraph {
    fn build(network: &UndiNetwork) -> Self {
        let ids: Vec<String> = network.node_ids().map(str::to_string).collect();
        let index: HashMap<&str, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); ids.len()];
        for edge in network.graph.edge_references() {
            let a = index[network.graph[edge.source()].id.as_str()];
            let b = index[network.graph[edge.target()].id.as_str()];
            let length = edge.weight().length_km.max(0.0);
            adjacency[a].push((b, length));
            adjacency[b].push((a, length));
        }
        Self { ids, adjacency }
    }

    fn sample_sources(&self, seed: u64) -> Vec<usize> {
        let n = self.ids.len();
        let k = (n as f64 * SAMPLE_FRACTION) as usize;
        if k <= SAMPLE_THRESHOLD {
            return (0..n).collect();
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut all: Vec<usize> = (0..n).collect();
        all.shuffle(&mut rng);
        all.truncate(k);
        all
    }
}

#[derive(PartialEq)]
struct HeapEntry {
    dist: f64,
    node: usize,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Min-heap on distance
        other
            .dist
            .partial_cmp(&self.dist)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

fn dijkstra(adjacency: &[Vec<(usize, f64)>], source: usize) -> Vec<f64> {
    let mut dist = vec![f64::INFINITY; adjacency.len()];
    dist[source] = 0.0;
    let mut heap = BinaryHeap::new();
    heap.push(HeapEntry {
        dist: 0.0,
        node: source,
    });
    while let Some(HeapEntry { dist: d, node }) = heap.pop() {
        if d > dist[node] {
            continue;
        }
        for &(next, length) in &adjacency[node] {
            let candidate = d + length;
            if candidate < dist[next] {
                dist[next] = candidate;
                heap.push(HeapEntry {
                    dist: candidate,
                    node: next,
                });
            }
        }
    }
    dist
}

// ---- Portrait similarity -------------------------------------------------

/// Network portrait: `B[l][k]` counts sources that see exactly `k` nodes at
/// rounded shortest-path distance `l`.
fn portrait(graph: &LengthGraph, sources: &[usize]) -> HashMap<(usize, usize), f64> {
    let rows: Vec<Vec<(usize, usize)>> = sources
        .par_iter()
        .map(|&source| {
            let dist = dijkstra(&graph.adjacency, source);
            let mut counts: HashMap<usize, usize> = HashMap::new();
            let mut max_level = 0usize;
            for &d in &dist {
                if d.is_finite() {
                    let level = d.round() as usize;
                    *counts.entry(level).or_insert(0) += 1;
                    max_level = max_level.max(level);
                }
            }
            (0..=max_level)
                .map(|level| (level, counts.get(&level).copied().unwrap_or(0)))
                .collect()
        })
        .collect();

    let mut matrix: HashMap<(usize, usize), f64> = HashMap::new();
    for row in rows {
        for (level, count) in row {
            *matrix.entry((level, count)).or_insert(0.0) += 1.0;
        }
    }
    matrix
}

fn js_distance_base2(p: &HashMap<(usize, usize), f64>, q: &HashMap<(usize, usize), f64>) -> f64 {
    let p_sum: f64 = p.values().sum();
    let q_sum: f64 = q.values().sum();
    if p_sum == 0.0 && q_sum == 0.0 {
        return 0.0;
    }
    if p_sum == 0.0 || q_sum == 0.0 {
        return 1.0;
    }

    let mut keys: Vec<(usize, usize)> = p.keys().chain(q.keys()).copied().collect();
    keys.sort_unstable();
    keys.dedup();

    let mut divergence = 0.0;
    for key in keys {
        let pi = p.get(&key).copied().unwrap_or(0.0) / p_sum;
        let qi = q.get(&key).copied().unwrap_or(0.0) / q_sum;
        let mi = (pi + qi) / 2.0;
        if pi > 0.0 {
            divergence += 0.5 * pi * (pi / mi).log2();
        }
        if qi > 0.0 {
            divergence += 0.5 * qi * (qi / mi).log2();
        }
    }
    divergence.max(0.0).sqrt()
}

/// 1 minus the Jensen-Shannon distance (base 2) between the two flattened
/// network portraits. Identical portraits score 1.0.
pub fn portrait_similarity(original: &UndiNetwork, simplified: &UndiNetwork, seed: u64) -> f64 {
    let graph_orig = LengthGraph::build(original);
    let graph_simp = LengthGraph::build(simplified);
    let portrait_orig = portrait(&graph_orig, &graph_orig.sample_sources(seed));
    let portrait_simp = portrait(&graph_simp, &graph_simp.sample_sources(seed));
    1.0 - js_distance_base2(&portrait_orig, &portrait_simp)
}

// ---- Betweenness similarity ----------------------------------------------

/// Length-weighted betweenness centrality (Brandes), accumulated from the
/// given sources and averaged over them.
fn betweenness(graph: &LengthGraph, sources: &[usize]) -> Vec<f64> {
    let n = graph.ids.len();
    if n == 0 || sources.is_empty() {
        return vec![0.0; n];
    }
    let partials: Vec<Vec<f64>> = sources
        .par_iter()
        .map(|&source| single_source_dependencies(&graph.adjacency, source))
        .collect();

    let mut centrality = vec![0.0; n];
    for partial in partials {
        for (value, p) in centrality.iter_mut().zip(partial) {
            *value += p;
        }
    }
    for value in centrality.iter_mut() {
        *value /= sources.len() as f64;
    }
    centrality
}

fn single_source_dependencies(adjacency: &[Vec<(usize, f64)>], source: usize) -> Vec<f64> {
    let n = adjacency.len();
    let mut dist = vec![f64::INFINITY; n];
    let mut sigma = vec![0.0f64; n];
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut settled = vec![false; n];
    let mut order: Vec<usize> = Vec::with_capacity(n);

    dist[source] = 0.0;
    sigma[source] = 1.0;
    let mut heap = BinaryHeap::new();
    heap.push(HeapEntry {
        dist: 0.0,
        node: source,
    });

    while let Some(HeapEntry { dist: d, node }) = heap.pop() {
        if settled[node] {
            continue;
        }
        settled[node] = true;
        order.push(node);
        for &(next, length) in &adjacency[node] {
            let candidate = d + length;
            let tol = PATH_EPS * (1.0 + dist[next].abs().min(candidate.abs()));
            if candidate < dist[next] - tol {
                dist[next] = candidate;
                sigma[next] = sigma[node];
                preds[next].clear();
                preds[next].push(node);
                heap.push(HeapEntry {
                    dist: candidate,
                    node: next,
                });
            } else if (candidate - dist[next]).abs() <= tol && !settled[next] {
                sigma[next] += sigma[node];
                preds[next].push(node);
            }
        }
    }

    let mut delta = vec![0.0f64; n];
    let mut dependency = vec![0.0f64; n];
    for &node in order.iter().rev() {
        for &pred in &preds[node] {
            if sigma[node] > 0.0 {
                delta[pred] += sigma[pred] / sigma[node] * (1.0 + delta[node]);
            }
        }
        if node != source {
            dependency[node] = delta[node];
        }
    }
    dependency
}

/// First Wasserstein distance between two 1-D samples.
fn wasserstein_1d(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let mut a_sorted = a.to_vec();
    let mut b_sorted = b.to_vec();
    a_sorted.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
    b_sorted.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));

    let mut values: Vec<f64> = a_sorted.iter().chain(&b_sorted).copied().collect();
    values.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
    values.dedup();

    let mut distance = 0.0;
    let (mut ia, mut ib) = (0usize, 0usize);
    for window in values.windows(2) {
        while ia < a_sorted.len() && a_sorted[ia] <= window[0] {
            ia += 1;
        }
        while ib < b_sorted.len() && b_sorted[ib] <= window[0] {
            ib += 1;
        }
        let cdf_a = ia as f64 / a_sorted.len() as f64;
        let cdf_b = ib as f64 / b_sorted.len() as f64;
        distance += (cdf_a - cdf_b).abs() * (window[1] - window[0]);
    }
    distance
}

/// Betweenness distribution similarity over the original node set.
///
/// Simplified centralities are mapped back onto original nodes: a cluster
/// member inherits its super-node's value, a surviving node keeps its own,
/// and a dropped node gets 0. The score is one minus the Wasserstein
/// distance between the two value samples, relative to the largest original
/// centrality; a flat original (max 0) scores 1.0.
pub fn betweenness_similarity(original: &UndiNetwork, simplified: &UndiNetwork, seed: u64) -> f64 {
    let graph_orig = LengthGraph::build(original);
    let values_orig = betweenness(&graph_orig, &graph_orig.sample_sources(seed));

    let graph_simp = LengthGraph::build(simplified);
    let values_simp_raw = betweenness(&graph_simp, &graph_simp.sample_sources(seed));
    let by_simplified_id: HashMap<&str, f64> = graph_simp
        .ids
        .iter()
        .map(String::as_str)
        .zip(values_simp_raw)
        .collect();

    // Cluster member -> super-node value
    let mut member_value: HashMap<&str, f64> = HashMap::new();
    for node in simplified.graph.node_weights() {
        if let Some(members) = &node.original_nodes {
            let value = by_simplified_id.get(node.id.as_str()).copied().unwrap_or(0.0);
            for member in members {
                member_value.insert(member.as_str(), value);
            }
        }
    }

    let values_simp: Vec<f64> = graph_orig
        .ids
        .iter()
        .map(|id| {
            member_value
                .get(id.as_str())
                .or_else(|| by_simplified_id.get(id.as_str()))
                .copied()
                .unwrap_or(0.0)
        })
        .collect();

    let max_orig = values_orig.iter().copied().fold(0.0f64, f64::max);
    if max_orig <= 0.0 {
        return 1.0;
    }
    (1.0 - wasserstein_1d(&values_orig, &values_simp) / max_orig).clamp(0.0, 1.0)
}

// ---- Spectral similarity -------------------------------------------------

fn frobenius(matrix: &[Vec<f64>]) -> f64 {
    matrix
        .iter()
        .flatten()
        .map(|v| v * v)
        .sum::<f64>()
        .sqrt()
}

fn laplacian_from_adjacency(adjacency: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    let n = adjacency.len();
    let mut laplacian = adjacency;
    for i in 0..n {
        let degree: f64 = laplacian[i].iter().sum();
        for value in laplacian[i].iter_mut() {
            *value = -*value;
        }
        laplacian[i][i] += degree;
    }
    laplacian
}

/// Spectral similarity of normalized-capacity-weighted Laplacians, both
/// expressed over the original node set.
///
/// For a clustered simplified network the projected adjacency places
/// weight 1.0 between members of the same cluster and the aggregated
/// pipe's normalized capacity between members of linked clusters. An
/// unclustered simplified network is embedded at its original node
/// positions. Score is `exp(-|L1 - L2|_F / (|L1|_F + |L2|_F))`; two zero
/// Laplacians score 1.0.
pub fn spectral_similarity(original: &UndiNetwork, simplified: &UndiNetwork) -> f64 {
    let ids: Vec<&str> = original.node_ids().collect();
    let index: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let n = ids.len();
    if n == 0 {
        return 1.0;
    }

    let mut adjacency_orig = vec![vec![0.0; n]; n];
    for edge in original.graph.edge_references() {
        let a = index[original.graph[edge.source()].id.as_str()];
        let b = index[original.graph[edge.target()].id.as_str()];
        let weight = edge.weight().norm_capacity.unwrap_or(0.0);
        if a != b {
            adjacency_orig[a][b] += weight;
            adjacency_orig[b][a] += weight;
        }
    }

    let clustered = simplified.graph.node_weights().any(|node| node.is_cluster());
    let mut adjacency_simp = vec![vec![0.0; n]; n];
    if clustered {
        let mut members_of: HashMap<&str, Vec<usize>> = HashMap::new();
        for node in simplified.graph.node_weights() {
            if let Some(members) = &node.original_nodes {
                let indices: Vec<usize> = members
                    .iter()
                    .filter_map(|m| index.get(m.as_str()).copied())
                    .collect();
                // Same-cluster pairs are maximally coupled
                for (pos, &i) in indices.iter().enumerate() {
                    for &j in &indices[pos + 1..] {
                        adjacency_simp[i][j] = 1.0;
                        adjacency_simp[j][i] = 1.0;
                    }
                }
                members_of.insert(node.id.as_str(), indices);
            }
        }
        for edge in simplified.graph.edge_references() {
            let from = simplified.graph[edge.source()].id.as_str();
            let to = simplified.graph[edge.target()].id.as_str();
            let weight = edge.weight().norm_capacity.unwrap_or(0.0);
            if let (Some(a_members), Some(b_members)) = (members_of.get(from), members_of.get(to))
            {
                for &i in a_members {
                    for &j in b_members {
                        adjacency_simp[i][j] = weight;
                        adjacency_simp[j][i] = weight;
                    }
                }
            }
        }
    } else {
        for edge in simplified.graph.edge_references() {
            let from = simplified.graph[edge.source()].id.as_str();
            let to = simplified.graph[edge.target()].id.as_str();
            if let (Some(&a), Some(&b)) = (index.get(from), index.get(to)) {
                let weight = edge.weight().norm_capacity.unwrap_or(0.0);
                if a != b {
                    adjacency_simp[a][b] += weight;
                    adjacency_simp[b][a] += weight;
                }
            }
        }
    }

    let laplacian_orig = laplacian_from_adjacency(adjacency_orig);
    let laplacian_simp = laplacian_from_adjacency(adjacency_simp);
    let mut diff = laplacian_orig.clone();
    for (row, simp_row) in diff.iter_mut().zip(&laplacian_simp) {
        for (value, s) in row.iter_mut().zip(simp_row) {
            *value -= s;
        }
    }
    let denom = frobenius(&laplacian_orig) + frobenius(&laplacian_simp);
    if denom == 0.0 {
        return 1.0;
    }
    (-frobenius(&diff) / denom).exp()
}
