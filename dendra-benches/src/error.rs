//! Benchmark setup error type.
//!
//! Setup helpers propagate failures with `?` and the bench entry points turn
//! them into a single panic message.

use dendra_core::{CoreDistanceError, DendraError, HierarchyError, KdTreeError, MstError};

use crate::source::SyntheticError;

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Synthetic data generation failed.
    #[error("synthetic data generation failed: {0}")]
    Synthetic(#[from] SyntheticError),
    /// Building the k-d tree failed.
    #[error("k-d tree construction failed: {0}")]
    KdTree(#[from] KdTreeError),
    /// Computing core distances failed.
    #[error("core distance computation failed: {0}")]
    CoreDistance(#[from] CoreDistanceError),
    /// Computing the spanning tree failed.
    #[error("spanning tree computation failed: {0}")]
    Mst(#[from] MstError),
    /// Hierarchy extraction failed.
    #[error("hierarchy extraction failed: {0}")]
    Hierarchy(#[from] HierarchyError),
    /// Configuring or running the pipeline failed.
    #[error("pipeline failed: {0}")]
    Pipeline(#[from] DendraError),
    /// A zero value was passed where a non-zero integer was required.
    #[error("expected a non-zero value for {context}")]
    ZeroValue {
        /// The parameter that was unexpectedly zero.
        context: &'static str,
    },
}
