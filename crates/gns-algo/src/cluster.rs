//! Shared clustering toolkit: seeded k-means, silhouette scoring, feature
//! scaling.
//!
//! Both geographic clustering and embedding clustering reduce to "k-means
//! over a point cloud, pick k by silhouette". The machinery lives here so
//! the two strategies only differ in how they produce their points.
//!
//! Runs are deterministic for a fixed seed: centroid initialization uses
//! k-means++ on a seeded [`StdRng`] and restarts advance the stream
//! predictably.

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

/// Default number of k-means restarts per k.
pub const DEFAULT_N_INIT: usize = 10;
/// Default RNG seed for reproducible clustering runs.
pub const DEFAULT_SEED: u64 = 42;

const MAX_ITER: usize = 300;
const CONVERGENCE_TOL: f64 = 1e-9;

/// Rescale every feature column into [0, 1] in place. A constant column
/// collapses to 0.0.
pub fn min_max_scale(points: &mut [Vec<f64>]) {
    let dims = match points.first() {
        Some(first) => first.len(),
        None => return,
    };
    for dim in 0..dims {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for point in points.iter() {
            min = min.min(point[dim]);
            max = max.max(point[dim]);
        }
        let range = max - min;
        for point in points.iter_mut() {
            point[dim] = if range > 0.0 {
                (point[dim] - min) / range
            } else {
                0.0
            };
        }
    }
}

fn sq_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Seeded k-means with k-means++ initialization and restarts.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub k: usize,
    pub n_init: usize,
    pub seed: u64,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            n_init: DEFAULT_N_INIT,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Cluster labels for each point, from the restart with the lowest
    /// inertia. Returns `None` when there are fewer points than clusters.
    pub fn fit(&self, points: &[Vec<f64>]) -> Option<Vec<usize>> {
        if self.k == 0 || points.len() < self.k {
            return None;
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<(f64, Vec<usize>)> = None;
        for _ in 0..self.n_init.max(1) {
            let (inertia, labels) = self.single_run(points, &mut rng);
            if best.as_ref().map_or(true, |(b, _)| inertia < *b) {
                best = Some((inertia, labels));
            }
        }
        best.map(|(_, labels)| labels)
    }

    fn single_run(&self, points: &[Vec<f64>], rng: &mut StdRng) -> (f64, Vec<usize>) {
        let mut centroids = self.init_plus_plus(points, rng);
        let mut labels = vec![0usize; points.len()];
        let mut assign_dists = vec![0.0f64; points.len()];
        let mut inertia = f64::INFINITY;

        for _ in 0..MAX_ITER {
            // Assignment step
            let mut new_inertia = 0.0;
            for (i, point) in points.iter().enumerate() {
                let (best_c, best_d) = centroids
                    .iter()
                    .enumerate()
                    .map(|(c, centroid)| (c, sq_dist(point, centroid)))
                    .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .expect("at least one centroid");
                labels[i] = best_c;
                assign_dists[i] = best_d;
                new_inertia += best_d;
            }

            // Update step
            let dims = points[0].len();
            let mut sums = vec![vec![0.0; dims]; self.k];
            let mut counts = vec![0usize; self.k];
            for (point, &label) in points.iter().zip(&labels) {
                counts[label] += 1;
                for (s, v) in sums[label].iter_mut().zip(point) {
                    *s += v;
                }
            }
            for (c, centroid) in centroids.iter_mut().enumerate() {
                if counts[c] == 0 {
                    // Empty cluster: reseed on the worst-fitted point
                    let far = assign_dists
                        .iter()
                        .enumerate()
                        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                        .map(|(i, _)| i);
                    if let Some(i) = far {
                        *centroid = points[i].clone();
                    }
                    continue;
                }
                for (dim, s) in sums[c].iter().enumerate() {
                    centroid[dim] = s / counts[c] as f64;
                }
            }

            if (inertia - new_inertia).abs() < CONVERGENCE_TOL {
                inertia = new_inertia;
                break;
            }
            inertia = new_inertia;
        }
        (inertia, labels)
    }

    /// k-means++: each next centroid is sampled proportionally to squared
    /// distance from the nearest already-chosen one.
    fn init_plus_plus(&self, points: &[Vec<f64>], rng: &mut StdRng) -> Vec<Vec<f64>> {
        let mut centroids = Vec::with_capacity(self.k);
        centroids.push(points[rng.gen_range(0..points.len())].clone());
        let mut min_dists: Vec<f64> = points
            .iter()
            .map(|p| sq_dist(p, &centroids[0]))
            .collect();

        while centroids.len() < self.k {
            let total: f64 = min_dists.iter().sum();
            let next = if total <= 0.0 {
                rng.gen_range(0..points.len())
            } else {
                let mut target = rng.gen::<f64>() * total;
                let mut chosen = points.len() - 1;
                for (i, d) in min_dists.iter().enumerate() {
                    target -= d;
                    if target <= 0.0 {
                        chosen = i;
                        break;
                    }
                }
                chosen
            };
            centroids.push(points[next].clone());
            for (i, point) in points.iter().enumerate() {
                let d = sq_dist(point, centroids.last().expect("just pushed"));
                if d < min_dists[i] {
                    min_dists[i] = d;
                }
            }
        }
        centroids
    }
}

/// Mean silhouette coefficient of a labeling, in [-1, 1].
///
/// Returns `None` for degenerate labelings (fewer than 2 distinct clusters,
/// or fewer points than clusters) where the measure is undefined.
pub fn silhouette_score(points: &[Vec<f64>], labels: &[usize]) -> Option<f64> {
    let n = points.len();
    if n < 2 {
        return None;
    }
    let k = labels.iter().copied().max()? + 1;
    let mut counts = vec![0usize; k];
    for &label in labels {
        counts[label] += 1;
    }
    if counts.iter().filter(|&&c| c > 0).count() < 2 {
        return None;
    }

    let scores: Vec<f64> = (0..n)
        .into_par_iter()
        .map(|i| {
            if counts[labels[i]] <= 1 {
                return 0.0;
            }
            let mut dist_sums = vec![0.0; k];
            for j in 0..n {
                if i != j {
                    dist_sums[labels[j]] += sq_dist(&points[i], &points[j]).sqrt();
                }
            }
            let own = labels[i];
            let a = dist_sums[own] / (counts[own] - 1) as f64;
            let b = (0..k)
                .filter(|&c| c != own && counts[c] > 0)
                .map(|c| dist_sums[c] / counts[c] as f64)
                .fold(f64::INFINITY, f64::min);
            if a.max(b) > 0.0 {
                (b - a) / a.max(b)
            } else {
                0.0
            }
        })
        .collect();

    Some(scores.iter().sum::<f64>() / n as f64)
}

/// Best labeling over a range of cluster counts, judged by silhouette.
///
/// Candidate values of k that produce a degenerate labeling are skipped.
/// Returns `(k, labels, silhouette)` for the winner, or `None` when no
/// candidate produced a scorable labeling.
pub fn best_labels_by_silhouette(
    points: &[Vec<f64>],
    candidate_ks: impl IntoIterator<Item = usize>,
    seed: u64,
) -> Option<(usize, Vec<usize>, f64)> {
    let mut best: Option<(usize, Vec<usize>, f64)> = None;
    for k in candidate_ks {
        let labels = match KMeans::new(k).with_seed(seed).fit(points) {
            Some(labels) => labels,
            None => continue,
        };
        let score = match silhouette_score(points, &labels) {
            Some(score) => score,
            None => continue,
        };
        if best.as_ref().map_or(true, |(_, _, b)| score > *b) {
            best = Some((k, labels, score));
        }
    }
    best
}
