//! Single-linkage hierarchy and flat cluster extraction.
//!
//! The spanning tree encodes the single-linkage hierarchy of the mutual
//! reachability graph. This module recovers it and reduces it to labels:
//!
//! - [`ClusterHierarchy`] sorts the edges by weight and replays them through a
//!   union-find that allocates a fresh id for every merge, producing a binary
//!   dendrogram whose merge ids start at the point count.
//! - [`CondensedTree`] walks the dendrogram top-down and keeps only the splits
//!   where both sides hold at least `min_cluster_size` points. Smaller sides
//!   are recorded as points leaving the surviving cluster.
//! - [`Stabilities`] scores every condensed cluster by its excess of mass and
//!   [`ClusterSelection`] keeps the most persistent, non-overlapping ones.
//! - [`label_points`] maps each point to its nearest selected ancestor.
//!
//! These stages are sequential. Their cost is linear in the point count
//! apart from the edge sort, which is dwarfed by the spanning tree search.

mod condense;
mod dendrogram;
mod labels;
mod sort;
mod stability;
mod union_find;

use thiserror::Error;

use crate::execution::Cancelled;

pub use self::{
    condense::CondensedTree,
    dendrogram::ClusterHierarchy,
    labels::label_points,
    stability::{ClusterSelection, Stabilities},
};

/// Errors returned while building or reducing the cluster hierarchy.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum HierarchyError {
    /// A spanning tree over `n` points must carry exactly `n - 1` edges.
    #[error("expected {expected} edges for the hierarchy but received {actual}")]
    EdgeCountMismatch {
        /// Edge count implied by the point count.
        expected: usize,
        /// Edge count supplied by the caller.
        actual: usize,
    },
    /// An edge referenced a point outside the dataset.
    #[error("edge endpoint {node} is out of range for {point_count} points")]
    InvalidNodeId {
        /// Offending endpoint.
        node: usize,
        /// Number of points in the dataset.
        point_count: usize,
    },
    /// An edge weight was negative or not finite.
    #[error("invalid edge weight {weight} for edge ({left}, {right})")]
    InvalidEdgeWeight {
        /// Smaller endpoint of the offending edge.
        left: usize,
        /// Larger endpoint of the offending edge.
        right: usize,
        /// Invalid weight observed on the edge.
        weight: f64,
    },
    /// An edge joined two points that were already connected.
    #[error("edge ({left}, {right}) closes a cycle")]
    CycleDetected {
        /// Smaller endpoint of the offending edge.
        left: usize,
        /// Larger endpoint of the offending edge.
        right: usize,
    },
    /// A cluster id did not name a cluster of the condensed tree.
    #[error("cluster {cluster} is not part of the condensed tree")]
    UnknownCluster {
        /// Offending cluster id.
        cluster: usize,
    },
    /// Scores or selections were computed for a different condensed tree.
    #[error("expected {expected} clusters but the input describes {actual}")]
    SelectionMismatch {
        /// Cluster count of the condensed tree.
        expected: usize,
        /// Cluster count described by the stabilities or selection.
        actual: usize,
    },
    /// More clusters were selected than a signed label can address.
    #[error("{clusters} selected clusters exceed the label range")]
    LabelOverflow {
        /// Number of selected clusters.
        clusters: usize,
    },
    /// The termination flag stopped condensation.
    #[error(transparent)]
    Cancelled {
        /// Cancellation raised by the execution context.
        #[from]
        source: Cancelled,
    },
}

impl HierarchyError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> HierarchyErrorCode {
        match self {
            Self::EdgeCountMismatch { .. } => HierarchyErrorCode::EdgeCountMismatch,
            Self::InvalidNodeId { .. } => HierarchyErrorCode::InvalidNodeId,
            Self::InvalidEdgeWeight { .. } => HierarchyErrorCode::InvalidEdgeWeight,
            Self::CycleDetected { .. } => HierarchyErrorCode::CycleDetected,
            Self::UnknownCluster { .. } => HierarchyErrorCode::UnknownCluster,
            Self::SelectionMismatch { .. } => HierarchyErrorCode::SelectionMismatch,
            Self::LabelOverflow { .. } => HierarchyErrorCode::LabelOverflow,
            Self::Cancelled { .. } => HierarchyErrorCode::Cancelled,
        }
    }
}

/// Machine-readable error codes for [`HierarchyError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum HierarchyErrorCode {
    /// The edge count did not match the point count.
    EdgeCountMismatch,
    /// An edge endpoint was out of range.
    InvalidNodeId,
    /// An edge weight was negative or not finite.
    InvalidEdgeWeight,
    /// The edges did not form a forest.
    CycleDetected,
    /// A cluster id was out of range.
    UnknownCluster,
    /// Inputs belonged to different condensed trees.
    SelectionMismatch,
    /// Too many clusters were selected.
    LabelOverflow,
    /// The computation was cancelled.
    Cancelled,
}

impl HierarchyErrorCode {
    /// Returns the symbolic identifier for logging and metrics surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EdgeCountMismatch => "HIERARCHY_EDGE_COUNT_MISMATCH",
            Self::InvalidNodeId => "HIERARCHY_INVALID_NODE_ID",
            Self::InvalidEdgeWeight => "HIERARCHY_INVALID_EDGE_WEIGHT",
            Self::CycleDetected => "HIERARCHY_CYCLE_DETECTED",
            Self::UnknownCluster => "HIERARCHY_UNKNOWN_CLUSTER",
            Self::SelectionMismatch => "HIERARCHY_SELECTION_MISMATCH",
            Self::LabelOverflow => "HIERARCHY_LABEL_OVERFLOW",
            Self::Cancelled => "HIERARCHY_CANCELLED",
        }
    }
}

#[cfg(test)]
mod tests;
