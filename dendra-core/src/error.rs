//! Error types for the dendra core library.
//!
//! Stage modules define their own error enums; this module hosts the
//! top-level [`DendraError`] returned by [`crate::Hdbscan`] together with the
//! macro that gives every error enum a stable machine-readable code.

use std::sync::Arc;

use thiserror::Error;

use crate::execution::{Cancelled, Stage};

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl ::std::fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

pub(crate) use define_error_codes;

/// Error type produced when configuring or running [`crate::Hdbscan`].
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DendraError {
    /// Minimum cluster size must be greater than zero.
    #[error("min_cluster_size must be at least 1 (got {got})")]
    InvalidMinClusterSize {
        /// The invalid minimum cluster size supplied by the caller.
        got: usize,
    },
    /// The core-distance neighbour count must be greater than zero.
    #[error("samples must be at least 1 (got {got})")]
    InvalidSamples {
        /// The invalid neighbour count supplied by the caller.
        got: usize,
    },
    /// K-d tree leaves must hold at least one point.
    #[error("leaf_size must be at least 1 (got {got})")]
    InvalidLeafSize {
        /// The invalid leaf size supplied by the caller.
        got: usize,
    },
    /// At least one worker thread is required.
    #[error("concurrency must be at least 1 (got {got})")]
    InvalidConcurrency {
        /// The invalid worker count supplied by the caller.
        got: usize,
    },
    /// The worker pool could not be created.
    #[error("failed to build a worker pool with {threads} threads: {message}")]
    ThreadPool {
        /// Requested worker count.
        threads: usize,
        /// Message reported by the pool builder.
        message: Arc<str>,
    },
    /// The termination flag stopped the computation.
    #[error("computation cancelled during {stage}")]
    Cancelled {
        /// Stage that observed the cancellation.
        stage: Stage,
    },
    /// Building the spatial index failed.
    #[error("k-d tree construction failed ({code}): {message}")]
    TreeBuildFailure {
        /// Stable code of the underlying error.
        code: Arc<str>,
        /// Rendered message of the underlying error.
        message: Arc<str>,
    },
    /// Computing core distances failed.
    #[error("core distance computation failed ({code}): {message}")]
    CoreDistanceFailure {
        /// Stable code of the underlying error.
        code: Arc<str>,
        /// Rendered message of the underlying error.
        message: Arc<str>,
    },
    /// The spanning tree computation failed.
    #[error("spanning tree computation failed ({code}): {message}")]
    MstFailure {
        /// Stable code of the underlying error.
        code: Arc<str>,
        /// Rendered message of the underlying error.
        message: Arc<str>,
    },
    /// Hierarchy construction, condensation, or labelling failed.
    #[error("hierarchy extraction failed ({code}): {message}")]
    HierarchyFailure {
        /// Stable code of the underlying error.
        code: Arc<str>,
        /// Rendered message of the underlying error.
        message: Arc<str>,
    },
}

define_error_codes! {
    /// Stable codes describing [`DendraError`] variants.
    enum DendraErrorCode for DendraError {
        /// Minimum cluster size must be greater than zero.
        InvalidMinClusterSize => InvalidMinClusterSize { .. } => "DENDRA_INVALID_MIN_CLUSTER_SIZE",
        /// The core-distance neighbour count must be greater than zero.
        InvalidSamples => InvalidSamples { .. } => "DENDRA_INVALID_SAMPLES",
        /// K-d tree leaves must hold at least one point.
        InvalidLeafSize => InvalidLeafSize { .. } => "DENDRA_INVALID_LEAF_SIZE",
        /// At least one worker thread is required.
        InvalidConcurrency => InvalidConcurrency { .. } => "DENDRA_INVALID_CONCURRENCY",
        /// The worker pool could not be created.
        ThreadPool => ThreadPool { .. } => "DENDRA_THREAD_POOL",
        /// The termination flag stopped the computation.
        Cancelled => Cancelled { .. } => "DENDRA_CANCELLED",
        /// Building the spatial index failed.
        TreeBuildFailure => TreeBuildFailure { .. } => "DENDRA_TREE_BUILD_FAILURE",
        /// Computing core distances failed.
        CoreDistanceFailure => CoreDistanceFailure { .. } => "DENDRA_CORE_DISTANCE_FAILURE",
        /// The spanning tree computation failed.
        MstFailure => MstFailure { .. } => "DENDRA_MST_FAILURE",
        /// Hierarchy construction, condensation, or labelling failed.
        HierarchyFailure => HierarchyFailure { .. } => "DENDRA_HIERARCHY_FAILURE",
    }
}

impl DendraError {
    /// Returns the cancelled stage when the run was stopped by its termination flag.
    #[must_use]
    pub const fn cancelled_stage(&self) -> Option<Stage> {
        match self {
            Self::Cancelled { stage } => Some(*stage),
            _ => None,
        }
    }
}

impl From<Cancelled> for DendraError {
    fn from(cancelled: Cancelled) -> Self {
        Self::Cancelled {
            stage: cancelled.stage(),
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, DendraError>;
