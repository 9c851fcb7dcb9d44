//! Brute-force Kruskal oracle over the complete mutual reachability graph.

use crate::{
    distance::Metric,
    mst::Edge,
    points::{DenseMatrix, PointSource},
};

/// Computes the spanning tree of every point pair weighted by
/// `max(core(a), core(b), d(a, b))`, sorted by [`Edge`]'s ordering.
pub(super) fn kruskal_oracle(points: &DenseMatrix, metric: &dyn Metric, cores: &[f64]) -> Vec<Edge> {
    let len = points.len();
    let mut candidates = Vec::with_capacity(len * len.saturating_sub(1) / 2);
    for left in 0..len {
        for right in (left + 1)..len {
            let distance = metric
                .distance(points.point(left), points.point(right))
                .max(cores[left])
                .max(cores[right]);
            candidates.push(Edge::new(left, right, distance));
        }
    }
    candidates.sort_unstable();

    let mut parent: Vec<usize> = (0..len).collect();
    let mut accepted = Vec::with_capacity(len.saturating_sub(1));
    for edge in candidates {
        let left = find_root(&mut parent, edge.source());
        let right = find_root(&mut parent, edge.target());
        if left != right {
            parent[left.max(right)] = left.min(right);
            accepted.push(edge);
        }
    }
    accepted
}

fn find_root(parent: &mut [usize], mut node: usize) -> usize {
    while parent[node] != node {
        parent[node] = parent[parent[node]];
        node = parent[node];
    }
    node
}
