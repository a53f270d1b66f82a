//! Shared builders for unit and integration tests.

use gns_core::{Network, Node, Pipe};

/// Bidirectional chain of nodes with uniform pipes. The first node supplies
/// `throughput` kg/s and the last consumes it; interior nodes are passive.
pub fn bidirectional_chain(ids: &[&str], segment_km: f64, throughput: f64) -> Network {
    let mut network = Network::new();
    for (i, id) in ids.iter().enumerate() {
        let supply = if i == 0 {
            throughput
        } else if i + 1 == ids.len() {
            -throughput
        } else {
            0.0
        };
        network.add_node(Node::new(*id, (i as f64 * segment_km, 0.0), supply));
    }
    for pair in ids.windows(2) {
        let pipe = Pipe::new(segment_km, 500.0, 60.0);
        network
            .add_pipe(pair[0], pair[1], pipe.clone())
            .expect("chain nodes exist");
        network
            .add_pipe(pair[1], pair[0], pipe)
            .expect("chain nodes exist");
    }
    network
}

/// Grid of passive junctions at unit spacing, bidirectionally piped.
pub fn junction_grid(rows: usize, cols: usize) -> Network {
    let mut network = Network::new();
    let id = |r: usize, c: usize| format!("X_{r}_{c}");
    for r in 0..rows {
        for c in 0..cols {
            network.add_node(Node::new(id(r, c), (c as f64, r as f64), 0.0));
        }
    }
    let mut link = |network: &mut Network, a: String, b: String| {
        let pipe = Pipe::new(1.0, 400.0, 50.0);
        network.add_pipe(&a, &b, pipe.clone()).expect("grid nodes exist");
        network.add_pipe(&b, &a, pipe).expect("grid nodes exist");
    };
    for r in 0..rows {
        for c in 0..cols {
            if c + 1 < cols {
                link(&mut network, id(r, c), id(r, c + 1));
            }
            if r + 1 < rows {
                link(&mut network, id(r, c), id(r + 1, c));
            }
        }
    }
    network
}
