//! Single-linkage dendrogram recovered from spanning tree edges.

use tracing::instrument;

use crate::mst::Edge;

use super::{HierarchyError, sort::sort_by_distance, union_find::MergingUnionFind};

/// Binary merge tree over `n` points.
///
/// Nodes `0..n` are points; node `n + i` is the `i`-th merge in order of
/// increasing distance. Every merge id is larger than both of its children,
/// and merge heights never decrease towards the root.
///
/// # Examples
/// ```
/// use dendra_core::{ClusterHierarchy, Edge};
///
/// let edges = [Edge::new(0, 1, 1.0), Edge::new(1, 2, 3.0)];
/// let hierarchy = ClusterHierarchy::from_edges(3, &edges)?;
/// assert_eq!(hierarchy.root(), Some(4));
/// assert_eq!(hierarchy.children(4), Some((3, 2)));
/// assert_eq!(hierarchy.lambda(4), 3.0);
/// assert_eq!(hierarchy.size(4), 3);
/// # Ok::<(), dendra_core::HierarchyError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterHierarchy {
    point_count: usize,
    left: Vec<usize>,
    right: Vec<usize>,
    lambda: Vec<f64>,
    size: Vec<usize>,
}

impl ClusterHierarchy {
    /// Builds the dendrogram of a spanning tree over `point_count` points.
    ///
    /// Edges are ordered by distance with a stable sort, so equal distances
    /// merge in input order.
    ///
    /// # Errors
    /// Returns [`HierarchyError::EdgeCountMismatch`] unless exactly
    /// `point_count - 1` edges are supplied,
    /// [`HierarchyError::InvalidNodeId`] for out-of-range endpoints,
    /// [`HierarchyError::InvalidEdgeWeight`] for negative or non-finite
    /// distances, and [`HierarchyError::CycleDetected`] when the edges do not
    /// form a tree.
    #[instrument(
        name = "core.hierarchy",
        err,
        skip(edges),
        fields(edges = edges.len()),
    )]
    pub fn from_edges(point_count: usize, edges: &[Edge]) -> Result<Self, HierarchyError> {
        let expected = point_count.saturating_sub(1);
        if edges.len() != expected {
            return Err(HierarchyError::EdgeCountMismatch {
                expected,
                actual: edges.len(),
            });
        }
        validate_edges(point_count, edges)?;

        let mut sorted = edges.to_vec();
        sort_by_distance(&mut sorted);

        let mut hierarchy = Self {
            point_count,
            left: Vec::with_capacity(expected),
            right: Vec::with_capacity(expected),
            lambda: Vec::with_capacity(expected),
            size: vec![1; point_count],
        };
        hierarchy.size.reserve(expected);

        let mut sets = MergingUnionFind::new(point_count);
        for edge in sorted {
            let left = sets.find(edge.source());
            let right = sets.find(edge.target());
            if left == right {
                return Err(HierarchyError::CycleDetected {
                    left: edge.source(),
                    right: edge.target(),
                });
            }
            sets.merge(left, right);
            hierarchy.left.push(left);
            hierarchy.right.push(right);
            hierarchy.lambda.push(edge.distance());
            hierarchy.size.push(hierarchy.size[left] + hierarchy.size[right]);
        }
        Ok(hierarchy)
    }

    /// Returns the number of points.
    #[must_use]
    #[rustfmt::skip]
    pub fn point_count(&self) -> usize { self.point_count }

    /// Returns the number of merges, `n - 1` for a non-empty dataset.
    #[must_use]
    #[rustfmt::skip]
    pub fn merge_count(&self) -> usize { self.lambda.len() }

    /// Returns the total number of nodes, points and merges combined.
    #[must_use]
    #[rustfmt::skip]
    pub fn node_count(&self) -> usize { self.size.len() }

    /// Returns the last merge id, or the single point for a one-point dataset.
    #[must_use]
    pub fn root(&self) -> Option<usize> {
        self.size.len().checked_sub(1)
    }

    /// Returns `true` when `node` is an original point.
    #[must_use]
    pub fn is_leaf(&self, node: usize) -> bool {
        node < self.point_count
    }

    /// Returns the `(left, right)` children of a merge, or `None` for points.
    #[must_use]
    pub fn children(&self, node: usize) -> Option<(usize, usize)> {
        let merge = node.checked_sub(self.point_count)?;
        Some((*self.left.get(merge)?, *self.right.get(merge)?))
    }

    /// Returns the distance at which `node` was formed; points sit at `0`.
    ///
    /// # Panics
    /// Panics when `node` is not below [`Self::node_count`].
    #[must_use]
    pub fn lambda(&self, node: usize) -> f64 {
        assert!(node < self.node_count(), "node {node} out of range");
        node.checked_sub(self.point_count)
            .map_or(0.0, |merge| self.lambda[merge])
    }

    /// Returns the number of points below `node`.
    ///
    /// # Panics
    /// Panics when `node` is not below [`Self::node_count`].
    #[must_use]
    pub fn size(&self, node: usize) -> usize {
        self.size[node]
    }

    /// Collects the points below `node` in depth-first order.
    pub(super) fn leaves(&self, node: usize, out: &mut Vec<usize>) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            match self.children(current) {
                Some((left, right)) => {
                    stack.push(right);
                    stack.push(left);
                }
                None => out.push(current),
            }
        }
    }
}

fn validate_edges(point_count: usize, edges: &[Edge]) -> Result<(), HierarchyError> {
    for edge in edges {
        if edge.target() >= point_count {
            return Err(HierarchyError::InvalidNodeId {
                node: edge.target(),
                point_count,
            });
        }
        let weight = edge.distance();
        if !weight.is_finite() || weight < 0.0 {
            return Err(HierarchyError::InvalidEdgeWeight {
                left: edge.source(),
                right: edge.target(),
                weight,
            });
        }
    }
    Ok(())
}
