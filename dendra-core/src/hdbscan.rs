//! Clustering orchestration.
//!
//! [`Hdbscan`] chains the stages inside a dedicated `rayon` pool sized by the
//! configured concurrency:
//!
//! 1. k-d tree construction,
//! 2. core distances from exact k-nearest-neighbour queries,
//! 3. the mutual reachability spanning tree,
//! 4. the single-linkage dendrogram and its condensation,
//! 5. stability scoring, selection, and labelling.
//!
//! Stage errors are folded into [`DendraError`] as code and message pairs;
//! cancellation surfaces as [`DendraError::Cancelled`] whichever stage saw it.

use std::{num::NonZeroUsize, sync::Arc};

use tracing::{Span, info, instrument, warn};

use crate::{
    Result,
    core_distance::{CoreDistanceError, CoreDistances, CoreResult},
    distance::{Euclidean, Metric},
    error::DendraError,
    execution::{
        ExecutionContext, NoProgress, ProgressSink, RunToCompletion, Stage, TerminationFlag,
    },
    hierarchy::{
        ClusterHierarchy, ClusterSelection, CondensedTree, HierarchyError, Stabilities,
        label_points,
    },
    kdtree::{KdTree, KdTreeError},
    mst::{DualTreeMst, MstError},
    points::PointSource,
    result::ClusteringResult,
};

/// Entry point for running the clustering pipeline.
///
/// # Examples
/// ```
/// use dendra_core::{DenseMatrix, HdbscanBuilder};
///
/// let points = DenseMatrix::from_rows(
///     "two-groups",
///     &[[0.0, 0.0], [0.1, 0.0], [0.0, 0.1], [5.0, 5.0], [5.1, 5.0], [5.0, 5.1]],
/// )?;
/// let hdbscan = HdbscanBuilder::new()
///     .with_min_cluster_size(2)
///     .with_samples(2)
///     .with_concurrency(1)
///     .build()?;
/// let result = hdbscan.run(&points)?;
/// assert_eq!(result.cluster_count(), 2);
/// assert_eq!(result.labels()[0], result.labels()[1]);
/// assert_ne!(result.labels()[0], result.labels()[3]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Hdbscan {
    min_cluster_size: NonZeroUsize,
    samples: NonZeroUsize,
    leaf_size: NonZeroUsize,
    concurrency: NonZeroUsize,
}

impl Hdbscan {
    pub(crate) const fn new(
        min_cluster_size: NonZeroUsize,
        samples: NonZeroUsize,
        leaf_size: NonZeroUsize,
        concurrency: NonZeroUsize,
    ) -> Self {
        Self {
            min_cluster_size,
            samples,
            leaf_size,
            concurrency,
        }
    }

    /// Returns the smallest group of points reported as a cluster.
    #[must_use]
    #[rustfmt::skip]
    pub const fn min_cluster_size(&self) -> NonZeroUsize { self.min_cluster_size }

    /// Returns the neighbour count that defines core distances.
    #[must_use]
    #[rustfmt::skip]
    pub const fn samples(&self) -> NonZeroUsize { self.samples }

    /// Returns the k-d tree leaf capacity.
    #[must_use]
    #[rustfmt::skip]
    pub const fn leaf_size(&self) -> NonZeroUsize { self.leaf_size }

    /// Returns the worker count.
    #[must_use]
    #[rustfmt::skip]
    pub const fn concurrency(&self) -> NonZeroUsize { self.concurrency }

    /// Clusters `points` under the Euclidean metric, running to completion.
    ///
    /// # Errors
    /// See [`Self::run_with`].
    pub fn run<P: PointSource + ?Sized>(&self, points: &P) -> Result<ClusteringResult> {
        self.run_with(points, &Euclidean, &RunToCompletion, &NoProgress)
    }

    /// Clusters `points` under `metric`.
    ///
    /// `termination` is polled at task boundaries of every stage and
    /// `progress` observes per-stage percentages. An empty point set yields an
    /// empty result without building any structure.
    ///
    /// # Errors
    /// Returns [`DendraError::ThreadPool`] when the worker pool cannot be
    /// created, [`DendraError::Cancelled`] once `termination` stops the run,
    /// and a `*Failure` variant carrying the stage's error code otherwise.
    pub fn run_with<P, M>(
        &self,
        points: &P,
        metric: &M,
        termination: &dyn TerminationFlag,
        progress: &dyn ProgressSink,
    ) -> Result<ClusteringResult>
    where
        P: PointSource + ?Sized,
        M: Metric + ?Sized,
    {
        self.run_pipeline(points, metric, None, termination, progress)
    }

    /// Clusters `points` using caller-supplied core distances.
    ///
    /// The core distance stage is skipped; `cores` must cover every point.
    ///
    /// # Errors
    /// See [`Self::run_with`].
    pub fn run_with_core_result<P, M>(
        &self,
        points: &P,
        metric: &M,
        cores: &dyn CoreResult,
        termination: &dyn TerminationFlag,
        progress: &dyn ProgressSink,
    ) -> Result<ClusteringResult>
    where
        P: PointSource + ?Sized,
        M: Metric + ?Sized,
    {
        self.run_pipeline(points, metric, Some(cores), termination, progress)
    }

    #[instrument(
        name = "core.run",
        err,
        skip(self, points, metric, cores, termination, progress),
        fields(
            data_source = %points.name(),
            points = points.len(),
            dimension = points.dimension(),
            min_cluster_size = %self.min_cluster_size,
            samples = %self.samples,
            concurrency = %self.concurrency,
        ),
    )]
    fn run_pipeline<P, M>(
        &self,
        points: &P,
        metric: &M,
        cores: Option<&dyn CoreResult>,
        termination: &dyn TerminationFlag,
        progress: &dyn ProgressSink,
    ) -> Result<ClusteringResult>
    where
        P: PointSource + ?Sized,
        M: Metric + ?Sized,
    {
        if points.is_empty() {
            warn!(data_source = points.name(), "point source is empty");
            return Ok(ClusteringResult::empty());
        }

        let threads = self.concurrency.get();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("dendra-worker-{index}"))
            .build()
            .map_err(|error| DendraError::ThreadPool {
                threads,
                message: Arc::from(error.to_string()),
            })?;

        let ctx = ExecutionContext::new(self.concurrency)
            .with_termination(termination)
            .with_progress(progress);
        // Pool threads do not inherit the caller's subscriber or span.
        let dispatch = tracing::dispatcher::get_default(Clone::clone);
        let run_span = Span::current();
        let result = pool.install(|| {
            tracing::dispatcher::with_default(&dispatch, || {
                run_span.in_scope(|| self.cluster(points, metric, cores, &ctx))
            })
        })?;
        info!(
            clusters = result.cluster_count(),
            noise = result.noise_count(),
            "clustering completed"
        );
        Ok(result)
    }

    fn cluster<P, M>(
        &self,
        points: &P,
        metric: &M,
        cores: Option<&dyn CoreResult>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<ClusteringResult>
    where
        P: PointSource + ?Sized,
        M: Metric + ?Sized,
    {
        let tree = KdTree::build(points, self.leaf_size, ctx).map_err(map_tree_error)?;

        let computed;
        let cores: &dyn CoreResult = match cores {
            Some(cores) => cores,
            None => {
                computed = CoreDistances::compute(points, &tree, metric, self.samples, ctx)
                    .map_err(map_core_distance_error)?;
                &computed
            }
        };

        let spanning_tree = DualTreeMst::create(points, &tree, metric, cores)
            .and_then(|solver| solver.compute(ctx))
            .map_err(map_mst_error)?;

        ctx.ensure_running(Stage::Hierarchy)?;
        let hierarchy_progress = ctx.track(Stage::Hierarchy, 1);
        let hierarchy = ClusterHierarchy::from_edges(points.len(), spanning_tree.edges())
            .map_err(map_hierarchy_error)?;
        hierarchy_progress.finish();

        let condensed = CondensedTree::condense(&hierarchy, self.min_cluster_size, ctx)
            .map_err(map_hierarchy_error)?;

        ctx.ensure_running(Stage::Extraction)?;
        let extraction = ctx.track(Stage::Extraction, 3);
        let stabilities = Stabilities::compute(&condensed);
        extraction.advance(1);
        let selection =
            ClusterSelection::select(&condensed, &stabilities).map_err(map_hierarchy_error)?;
        extraction.advance(1);
        let result = label_points(&condensed, &selection).map_err(map_hierarchy_error)?;
        extraction.finish();
        Ok(result)
    }
}

fn map_tree_error(error: KdTreeError) -> DendraError {
    match error {
        KdTreeError::Cancelled { source } => source.into(),
        other => DendraError::TreeBuildFailure {
            code: Arc::from(other.code().as_str()),
            message: Arc::from(other.to_string()),
        },
    }
}

fn map_core_distance_error(error: CoreDistanceError) -> DendraError {
    match error {
        CoreDistanceError::Cancelled { source } => source.into(),
        other => DendraError::CoreDistanceFailure {
            code: Arc::from(other.code().as_str()),
            message: Arc::from(other.to_string()),
        },
    }
}

fn map_mst_error(error: MstError) -> DendraError {
    match error {
        MstError::Cancelled { source } => source.into(),
        other => DendraError::MstFailure {
            code: Arc::from(other.code().as_str()),
            message: Arc::from(other.to_string()),
        },
    }
}

fn map_hierarchy_error(error: HierarchyError) -> DendraError {
    match error {
        HierarchyError::Cancelled { source } => source.into(),
        other => DendraError::HierarchyFailure {
            code: Arc::from(other.code().as_str()),
            message: Arc::from(other.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        HdbscanBuilder, core_distance::Neighbour, error::DendraErrorCode,
        execution::CancellationFlag, test_utils::matrix,
    };

    #[test]
    fn stage_errors_keep_their_codes() {
        let err = map_hierarchy_error(HierarchyError::CycleDetected { left: 1, right: 2 });
        assert_eq!(err.code(), DendraErrorCode::HierarchyFailure);
        assert_eq!(
            err,
            DendraError::HierarchyFailure {
                code: Arc::from("HIERARCHY_CYCLE_DETECTED"),
                message: Arc::from("edge (1, 2) closes a cycle"),
            }
        );
    }

    #[test]
    fn cancellation_is_not_wrapped() {
        let flag = CancellationFlag::new();
        flag.cancel();
        let ctx = ExecutionContext::sequential().with_termination(&flag);
        let cancelled = ctx
            .ensure_running(Stage::Condensation)
            .expect_err("flag is tripped");
        let err = map_hierarchy_error(HierarchyError::from(cancelled));
        assert_eq!(err.cancelled_stage(), Some(Stage::Condensation));
    }

    struct FixedCores {
        distances: Vec<f64>,
    }

    impl CoreResult for FixedCores {
        fn core_distance(&self, id: usize) -> f64 {
            self.distances[id]
        }

        fn neighbours_of(&self, _id: usize) -> &[Neighbour] {
            &[]
        }
    }

    #[test]
    fn supplied_core_distances_skip_the_search() {
        let points = matrix(&[[0.0], [1.0], [2.0], [10.0], [11.0], [12.0]]);
        let hdbscan = HdbscanBuilder::new()
            .with_min_cluster_size(2)
            .with_concurrency(2)
            .build()
            .expect("configuration is valid");
        let cores = FixedCores {
            distances: vec![1.0; 6],
        };
        let result = hdbscan
            .run_with_core_result(&points, &Euclidean, &cores, &RunToCompletion, &NoProgress)
            .expect("run succeeds");
        assert_eq!(result.labels(), &[0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn invalid_supplied_cores_surface_as_spanning_tree_failures() {
        let points = matrix(&[[0.0], [1.0]]);
        let hdbscan = HdbscanBuilder::new()
            .with_concurrency(1)
            .build()
            .expect("configuration is valid");
        let cores = FixedCores {
            distances: vec![0.0, -1.0],
        };
        let err = hdbscan
            .run_with_core_result(&points, &Euclidean, &cores, &RunToCompletion, &NoProgress)
            .expect_err("negative core distances are rejected");
        assert_eq!(err.code(), DendraErrorCode::MstFailure);
    }
}
