//! Benchmark parameter types.
//!
//! Each type renders as a criterion benchmark id.

use std::fmt;

/// Parameters for a k-d tree construction run.
#[derive(Clone, Debug)]
pub struct KdTreeBenchParams {
    /// Number of points in the dataset.
    pub point_count: usize,
    /// Maximum points per leaf.
    pub leaf_size: usize,
}

impl fmt::Display for KdTreeBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},leaf={}", self.point_count, self.leaf_size)
    }
}

/// Parameters for a spanning tree or pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineBenchParams {
    /// Number of points in the dataset.
    pub point_count: usize,
    /// Worker count used by the run.
    pub concurrency: usize,
}

impl fmt::Display for PipelineBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},threads={}", self.point_count, self.concurrency)
    }
}

/// Parameters for a hierarchy extraction run.
#[derive(Clone, Debug)]
pub struct ExtractionBenchParams {
    /// Number of points in the dataset.
    pub point_count: usize,
    /// Minimum cluster size for condensation.
    pub min_cluster_size: usize,
}

impl fmt::Display for ExtractionBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},min={}", self.point_count, self.min_cluster_size)
    }
}
