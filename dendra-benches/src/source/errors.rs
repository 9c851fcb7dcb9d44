//! Error types for synthetic benchmark data generation.

use dendra_core::PointSourceError;

/// Errors that may occur while generating benchmark point sets.
#[derive(Debug, thiserror::Error)]
pub enum SyntheticError {
    /// The requested point count was zero.
    #[error("point count must be greater than zero")]
    ZeroPoints,
    /// The requested dimension count was zero.
    #[error("dimension count must be greater than zero")]
    ZeroDimensions,
    /// The requested cluster count was zero.
    #[error("cluster count must be greater than zero")]
    ZeroClusters,
    /// The configured cluster count exceeded the available points.
    #[error("cluster count ({cluster_count}) must not exceed point count ({point_count})")]
    ClusterCountExceedsPointCount {
        /// Number of clusters requested.
        cluster_count: usize,
        /// Number of points requested.
        point_count: usize,
    },
    /// The requested `point_count * dimensions` overflowed `usize`.
    #[error("point_count * dimensions overflows usize")]
    Overflow,
    /// A floating-point generator parameter was invalid.
    #[error("invalid floating-point parameter `{parameter}`")]
    InvalidFloatParameter {
        /// Name of the invalid parameter.
        parameter: &'static str,
    },
    /// The generated values were rejected by the point matrix.
    #[error(transparent)]
    Points(#[from] PointSourceError),
}
