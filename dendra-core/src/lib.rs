//! Dendra core library.
//!
//! Density-based clustering over dense feature vectors: a parallel k-d tree,
//! exact core distances, a dual-tree Borůvka spanning tree under mutual
//! reachability, and HDBSCAN-style condensation and cluster selection.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod aabb;
mod builder;
mod clustering_quality;
mod core_distance;
mod distance;
mod error;
mod execution;
mod hdbscan;
mod hierarchy;
mod kdtree;
mod mst;
mod points;
mod result;

#[cfg(test)]
mod test_utils;

pub use crate::{
    aabb::Aabb,
    builder::HdbscanBuilder,
    clustering_quality::{
        ClusteringQualityError, ClusteringQualityScore, adjusted_rand_index,
        clustering_quality_score, normalized_mutual_information,
    },
    core_distance::{
        CoreDistanceError, CoreDistanceErrorCode, CoreDistances, CoreResult, Neighbour, ZeroCores,
    },
    distance::{DistanceError, DistanceErrorCode, Euclidean, Manhattan, Metric},
    error::{DendraError, DendraErrorCode, Result},
    execution::{
        CancellationFlag, Cancelled, ExecutionContext, NoProgress, ProgressSink, RunToCompletion,
        Stage, TerminationFlag, TracingProgress,
    },
    hdbscan::Hdbscan,
    hierarchy::{
        ClusterHierarchy, ClusterSelection, CondensedTree, HierarchyError, HierarchyErrorCode,
        Stabilities, label_points,
    },
    kdtree::{KdNode, KdTree, KdTreeError, KdTreeErrorCode, SplitInformation},
    mst::{
        Candidate, ClosestDistanceTracker, DualTreeMst, Edge, MinimumSpanningTree, MstError,
        MstErrorCode,
    },
    points::{DenseMatrix, PointSource, PointSourceError, PointSourceErrorCode},
    result::{ClusteringResult, NOISE},
};
