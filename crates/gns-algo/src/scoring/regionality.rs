//! Regionality score: does the simplified network still cover the same
//! geographic regions?

use gns_core::{Coord, UndiNetwork};
use std::collections::HashSet;

/// Maps a coordinate to a region identifier, or `None` outside all regions.
pub trait RegionLookup {
    fn region_of(&self, coord: Coord) -> Option<usize>;
}

/// Regions given as simple polygons (outer rings, no holes).
pub struct PolygonRegions {
    polygons: Vec<Vec<(f64, f64)>>,
}

impl PolygonRegions {
    /// Polygons may be open or closed; the ring is treated as closed either
    /// way. Degenerate rings (< 3 vertices) never match.
    pub fn new(polygons: Vec<Vec<(f64, f64)>>) -> Self {
        Self { polygons }
    }
}

impl RegionLookup for PolygonRegions {
    fn region_of(&self, coord: Coord) -> Option<usize> {
        self.polygons
            .iter()
            .position(|ring| point_in_polygon(coord.x, coord.y, ring))
    }
}

/// Ray casting; boundary points count as inside on one side only, which is
/// irrelevant for occupancy counting.
fn point_in_polygon(x: f64, y: f64, ring: &[(f64, f64)]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Uniform rectangular grid over a bounding box, the default region model
/// when no administrative polygons are supplied.
pub struct GridRegions {
    min_x: f64,
    min_y: f64,
    cell_w: f64,
    cell_h: f64,
    cols: usize,
    rows: usize,
}

impl GridRegions {
    /// Grid covering the bounding box of the given network's nodes.
    /// Returns `None` for an empty network.
    pub fn covering(network: &UndiNetwork, cols: usize, rows: usize) -> Option<Self> {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for node in network.graph.node_weights() {
            min_x = min_x.min(node.coord.x);
            min_y = min_y.min(node.coord.y);
            max_x = max_x.max(node.coord.x);
            max_y = max_y.max(node.coord.y);
        }
        if !min_x.is_finite() {
            return None;
        }
        Some(Self {
            min_x,
            min_y,
            cell_w: ((max_x - min_x) / cols as f64).max(f64::MIN_POSITIVE),
            cell_h: ((max_y - min_y) / rows as f64).max(f64::MIN_POSITIVE),
            cols: cols.max(1),
            rows: rows.max(1),
        })
    }
}

impl RegionLookup for GridRegions {
    fn region_of(&self, coord: Coord) -> Option<usize> {
        let col = ((coord.x - self.min_x) / self.cell_w) as isize;
        let row = ((coord.y - self.min_y) / self.cell_h) as isize;
        let col = col.clamp(0, self.cols as isize - 1) as usize;
        let row = row.clamp(0, self.rows as isize - 1) as usize;
        Some(row * self.cols + col)
    }
}

fn occupied_regions(network: &UndiNetwork, regions: &dyn RegionLookup) -> HashSet<usize> {
    network
        .graph
        .node_weights()
        .filter_map(|node| regions.region_of(node.coord))
        .collect()
}

/// Fraction of the original's occupied regions still occupied after
/// simplification, in [0, 1]. An original occupying no region scores 1.0.
pub fn regionality_score(
    original: &UndiNetwork,
    simplified: &UndiNetwork,
    regions: &dyn RegionLookup,
) -> f64 {
    let occupied_orig = occupied_regions(original, regions);
    if occupied_orig.is_empty() {
        return 1.0;
    }
    let occupied_simp = occupied_regions(simplified, regions);
    let kept = occupied_orig.intersection(&occupied_simp).count();
    kept as f64 / occupied_orig.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use gns_core::Node;

    fn spread_network(coords: &[(f64, f64)]) -> UndiNetwork {
        let mut network = UndiNetwork::new();
        for (i, &coord) in coords.iter().enumerate() {
            network.add_node(Node::new(format!("X_{i}"), coord, 0.0));
        }
        network
    }

    #[test]
    fn test_point_in_polygon() {
        let square = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        assert!(point_in_polygon(5.0, 5.0, &square));
        assert!(!point_in_polygon(15.0, 5.0, &square));
        assert!(!point_in_polygon(5.0, -1.0, &square));
    }

    #[test]
    fn test_polygon_regions_lookup() {
        let regions = PolygonRegions::new(vec![
            vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            vec![(20.0, 0.0), (30.0, 0.0), (30.0, 10.0), (20.0, 10.0)],
        ]);
        assert_eq!(regions.region_of(Coord::new(5.0, 5.0)), Some(0));
        assert_eq!(regions.region_of(Coord::new(25.0, 5.0)), Some(1));
        assert_eq!(regions.region_of(Coord::new(15.0, 5.0)), None);
    }

    #[test]
    fn test_full_coverage_scores_one() {
        let original = spread_network(&[(1.0, 1.0), (25.0, 25.0), (45.0, 45.0)]);
        let regions = GridRegions::covering(&original, 3, 3).unwrap();
        assert_eq!(regionality_score(&original, &original, &regions), 1.0);
    }

    #[test]
    fn test_lost_region_lowers_score() {
        let original = spread_network(&[(1.0, 1.0), (25.0, 25.0), (49.0, 49.0)]);
        let simplified = spread_network(&[(1.0, 1.0), (25.0, 25.0)]);
        let regions = GridRegions::covering(&original, 3, 3).unwrap();
        let score = regionality_score(&original, &simplified, &regions);
        assert!((score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_original_scores_one() {
        let empty = UndiNetwork::new();
        let other = spread_network(&[(1.0, 1.0)]);
        let regions = GridRegions::covering(&other, 2, 2).unwrap();
        assert_eq!(regionality_score(&empty, &other, &regions), 1.0);
    }
}
