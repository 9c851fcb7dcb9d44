//! Stable ordering of spanning tree edges by weight.
//!
//! Spanning tree edges usually arrive close to sorted (Borůvka rounds emit
//! increasingly heavy edges), so short inputs use an insertion sort. Longer
//! inputs use the standard library's stable merge sort. Both keep equal
//! weights in input order, so the resulting dendrogram does not depend on
//! which path ran.

use crate::mst::Edge;

/// Inputs at or below this length use [`insertion_sort_by_distance`].
pub(super) const INSERTION_SORT_THRESHOLD: usize = 64;

pub(super) fn sort_by_distance(edges: &mut [Edge]) {
    if edges.len() <= INSERTION_SORT_THRESHOLD {
        insertion_sort_by_distance(edges);
    } else {
        edges.sort_by(|left, right| left.distance().total_cmp(&right.distance()));
    }
}

/// Stable in-place insertion sort; linear on already sorted input.
pub(super) fn insertion_sort_by_distance(edges: &mut [Edge]) {
    for index in 1..edges.len() {
        let mut position = index;
        while position > 0 && edges[position - 1].distance() > edges[position].distance() {
            edges.swap(position - 1, position);
            position -= 1;
        }
    }
}
