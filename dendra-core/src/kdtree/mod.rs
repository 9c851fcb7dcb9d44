//! Balanced k-d tree over point ids.
//!
//! The tree owns a permutation of the point ids. Every node covers a
//! contiguous half-open range of that permutation; internal nodes split their
//! range at the median of the axis with the widest spread. Nodes live in a
//! flat arena addressed by id with the root at id `0`.

mod build;

use std::num::NonZeroUsize;

use thiserror::Error;

use crate::{aabb::Aabb, execution::Cancelled};

pub(crate) use self::build::ROOT;

/// Axis and coordinate at which an internal node splits its range.
///
/// Every point of the left child has a coordinate `<= value` on `dimension`;
/// every point of the right child has a coordinate `>= value`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitInformation {
    value: f64,
    dimension: usize,
}

impl SplitInformation {
    /// Returns the median coordinate.
    #[must_use]
    #[rustfmt::skip]
    pub fn value(&self) -> f64 { self.value }

    /// Returns the split axis.
    #[must_use]
    #[rustfmt::skip]
    pub fn dimension(&self) -> usize { self.dimension }
}

/// A node of the [`KdTree`] arena.
#[derive(Clone, Debug, PartialEq)]
pub struct KdNode {
    id: usize,
    start: usize,
    end: usize,
    parent: Option<usize>,
    sibling: Option<usize>,
    children: Option<(usize, usize)>,
    split: Option<SplitInformation>,
    aabb: Aabb,
}

impl KdNode {
    /// Returns the arena index of the node.
    #[must_use]
    #[rustfmt::skip]
    pub fn id(&self) -> usize { self.id }

    /// Returns the first position of the node's range.
    #[must_use]
    #[rustfmt::skip]
    pub fn start(&self) -> usize { self.start }

    /// Returns one past the last position of the node's range.
    #[must_use]
    #[rustfmt::skip]
    pub fn end(&self) -> usize { self.end }

    /// Returns the number of points below the node.
    #[must_use]
    #[rustfmt::skip]
    pub fn len(&self) -> usize { self.end - self.start }

    /// Returns `true` for the leaf of an empty tree.
    #[must_use]
    #[rustfmt::skip]
    pub fn is_empty(&self) -> bool { self.start == self.end }

    /// Returns `true` when the node has no children.
    #[must_use]
    #[rustfmt::skip]
    pub fn is_leaf(&self) -> bool { self.children.is_none() }

    /// Returns the parent id, `None` for the root.
    #[must_use]
    #[rustfmt::skip]
    pub fn parent(&self) -> Option<usize> { self.parent }

    /// Returns the other child of the parent, `None` for the root.
    #[must_use]
    #[rustfmt::skip]
    pub fn sibling(&self) -> Option<usize> { self.sibling }

    /// Returns the `(left, right)` child ids of an internal node.
    #[must_use]
    #[rustfmt::skip]
    pub fn children(&self) -> Option<(usize, usize)> { self.children }

    /// Returns the split of an internal node.
    #[must_use]
    #[rustfmt::skip]
    pub fn split(&self) -> Option<SplitInformation> { self.split }

    /// Returns the bounds of the node's points.
    #[must_use]
    #[rustfmt::skip]
    pub fn aabb(&self) -> &Aabb { &self.aabb }
}

/// Errors raised while building a [`KdTree`].
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum KdTreeError {
    /// The termination flag stopped construction.
    #[error(transparent)]
    Cancelled {
        /// Cancellation raised by the execution context.
        #[from]
        source: Cancelled,
    },
    /// Construction finished without filling every arena slot.
    #[error("k-d tree arena has {missing} unfilled slots out of {allocated}")]
    IncompleteArena {
        /// Number of ids allocated but never built.
        missing: usize,
        /// Number of ids allocated.
        allocated: usize,
    },
}

impl KdTreeError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> KdTreeErrorCode {
        match self {
            Self::Cancelled { .. } => KdTreeErrorCode::Cancelled,
            Self::IncompleteArena { .. } => KdTreeErrorCode::IncompleteArena,
        }
    }
}

/// Machine-readable error codes for [`KdTreeError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum KdTreeErrorCode {
    /// The termination flag stopped construction.
    Cancelled,
    /// Construction finished without filling every arena slot.
    IncompleteArena,
}

impl KdTreeErrorCode {
    /// Returns the symbolic identifier for logging and metrics surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cancelled => "KD_TREE_CANCELLED",
            Self::IncompleteArena => "KD_TREE_INCOMPLETE_ARENA",
        }
    }
}

/// Balanced spatial index over a point source.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
///
/// use dendra_core::{DenseMatrix, ExecutionContext, KdTree};
///
/// let rows: Vec<[f64; 1]> = (0..8).map(|x| [f64::from(x)]).collect();
/// let points = DenseMatrix::from_rows("line", &rows)?;
/// let leaf_size = NonZeroUsize::new(2).expect("non-zero");
/// let tree = KdTree::build(&points, leaf_size, &ExecutionContext::sequential())?;
/// assert_eq!(tree.tree_node_count(), 7);
/// assert_eq!(tree.leaf_count(), 4);
/// assert_eq!(tree.nodes_contained(tree.root()).len(), 8);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct KdTree {
    ids: Vec<usize>,
    nodes: Vec<KdNode>,
    leaf_count: usize,
    leaf_size: NonZeroUsize,
}

impl KdTree {
    /// Returns the root node.
    #[must_use]
    pub fn root(&self) -> &KdNode {
        &self.nodes[ROOT]
    }

    /// Returns the node with arena index `id`.
    ///
    /// # Panics
    /// Panics when `id >= self.tree_node_count()`.
    #[must_use]
    pub fn node(&self, id: usize) -> &KdNode {
        &self.nodes[id]
    }

    /// Returns every node ordered by id.
    #[must_use]
    #[rustfmt::skip]
    pub fn nodes(&self) -> &[KdNode] { &self.nodes }

    /// Returns the number of internal and leaf nodes.
    #[must_use]
    #[rustfmt::skip]
    pub fn tree_node_count(&self) -> usize { self.nodes.len() }

    /// Returns the number of leaves.
    #[must_use]
    #[rustfmt::skip]
    pub fn leaf_count(&self) -> usize { self.leaf_count }

    /// Returns the leaf capacity the tree was built with.
    #[must_use]
    #[rustfmt::skip]
    pub fn leaf_size(&self) -> NonZeroUsize { self.leaf_size }

    /// Returns the permuted point ids.
    #[must_use]
    #[rustfmt::skip]
    pub fn ids(&self) -> &[usize] { &self.ids }

    /// Returns the number of indexed points.
    #[must_use]
    #[rustfmt::skip]
    pub fn len(&self) -> usize { self.ids.len() }

    /// Returns `true` when the tree indexes no points.
    #[must_use]
    #[rustfmt::skip]
    pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    /// Returns the point ids covered by `node`.
    #[must_use]
    pub fn nodes_contained(&self, node: &KdNode) -> &[usize] {
        &self.ids[node.start..node.end]
    }

    /// Returns whether `node` lies below `ancestor`.
    ///
    /// Ranges form a laminar family, so range containment decides descent.
    /// With `strict` a node does not descend from itself.
    #[must_use]
    pub fn descends_from(&self, node: &KdNode, ancestor: &KdNode, strict: bool) -> bool {
        let contained = ancestor.start <= node.start && node.end <= ancestor.end;
        if strict {
            contained && node.id != ancestor.id
        } else {
            contained
        }
    }
}
