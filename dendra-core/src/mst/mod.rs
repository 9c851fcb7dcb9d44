//! Dual-tree Borůvka minimum spanning tree under mutual reachability.
//!
//! Every round, each component finds its closest outside point with a
//! dual-tree traversal of the k-d tree, pruning node pairs whose box and core
//! distance lower bound cannot beat the component's best candidate. Accepted
//! candidates merge their components; rounds repeat until one component
//! remains. Mutual reachability between `a` and `b` is
//! `max(core(a), core(b), d(a, b))`; with [`DualTreeMst::create_with_zero_cores`]
//! it is the plain metric distance.

mod components;
mod tracker;
mod traversal;

use std::cmp::Ordering;

use tracing::{debug, instrument};

use crate::{
    core_distance::{CoreResult, ZeroCores},
    distance::{DistanceError, Metric},
    execution::{Cancelled, ExecutionContext, Stage},
    kdtree::KdTree,
    points::PointSource,
};

use self::{
    components::Components,
    traversal::{NodeBounds, Round, TraversalStats, node_min_cores, single_components},
};

pub use self::tracker::{Candidate, ClosestDistanceTracker};

/// Errors returned while computing the spanning tree.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum MstError {
    /// The tree was built over a different number of points.
    #[error("k-d tree indexes {tree} points but the source holds {points}")]
    TreeMismatch {
        /// Points indexed by the tree.
        tree: usize,
        /// Points in the source.
        points: usize,
    },
    /// A core distance was NaN, infinite, or negative.
    #[error("core distance of point {point} is invalid: {value}")]
    InvalidCoreDistance {
        /// Offending point.
        point: usize,
        /// Offending value.
        value: f64,
    },
    /// The metric produced an unusable distance.
    #[error(transparent)]
    InvalidDistance {
        /// Underlying metric failure.
        #[from]
        source: DistanceError,
    },
    /// The termination flag stopped the computation.
    #[error(transparent)]
    Cancelled {
        /// Cancellation raised by the execution context.
        #[from]
        source: Cancelled,
    },
    /// A round finished without joining any components.
    #[error("Borůvka round added no edges with {components} components left")]
    Stalled {
        /// Components remaining when progress stopped.
        components: usize,
    },
}

impl MstError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> MstErrorCode {
        match self {
            Self::TreeMismatch { .. } => MstErrorCode::TreeMismatch,
            Self::InvalidCoreDistance { .. } => MstErrorCode::InvalidCoreDistance,
            Self::InvalidDistance { .. } => MstErrorCode::InvalidDistance,
            Self::Cancelled { .. } => MstErrorCode::Cancelled,
            Self::Stalled { .. } => MstErrorCode::Stalled,
        }
    }
}

/// Machine-readable error codes for [`MstError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MstErrorCode {
    /// The tree was built over a different number of points.
    TreeMismatch,
    /// A core distance was NaN, infinite, or negative.
    InvalidCoreDistance,
    /// The metric produced an unusable distance.
    InvalidDistance,
    /// The termination flag stopped the computation.
    Cancelled,
    /// A round finished without joining any components.
    Stalled,
}

impl MstErrorCode {
    /// Returns the symbolic identifier for logging and metrics surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TreeMismatch => "MST_TREE_MISMATCH",
            Self::InvalidCoreDistance => "MST_INVALID_CORE_DISTANCE",
            Self::InvalidDistance => "MST_INVALID_DISTANCE",
            Self::Cancelled => "MST_CANCELLED",
            Self::Stalled => "MST_STALLED",
        }
    }
}

/// An undirected spanning tree edge in canonical form (`source <= target`).
///
/// # Examples
/// ```
/// use dendra_core::Edge;
///
/// assert_eq!(Edge::new(4, 1, 2.5), Edge::new(1, 4, 2.5));
/// assert_eq!(Edge::new(4, 1, 2.5).source(), 1);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    source: usize,
    target: usize,
    distance: f64,
}

impl Edge {
    /// Creates an edge, ordering the endpoints.
    #[must_use]
    pub fn new(source: usize, target: usize, distance: f64) -> Self {
        Self {
            source: source.min(target),
            target: source.max(target),
            distance,
        }
    }

    /// Returns the smaller endpoint id.
    #[must_use]
    #[rustfmt::skip]
    pub fn source(&self) -> usize { self.source }

    /// Returns the larger endpoint id.
    #[must_use]
    #[rustfmt::skip]
    pub fn target(&self) -> usize { self.target }

    /// Returns the mutual reachability distance.
    #[must_use]
    #[rustfmt::skip]
    pub fn distance(&self) -> f64 { self.distance }
}

impl Eq for Edge {}

impl Ord for Edge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.source.cmp(&other.source))
            .then_with(|| self.target.cmp(&other.target))
    }
}

impl PartialOrd for Edge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Edges of a spanning tree with their summed distance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MinimumSpanningTree {
    edges: Vec<Edge>,
    total_distance: f64,
}

impl MinimumSpanningTree {
    /// Wraps edges, summing their distances.
    #[must_use]
    pub fn new(edges: Vec<Edge>) -> Self {
        let total_distance = edges.iter().map(Edge::distance).sum();
        Self {
            edges,
            total_distance,
        }
    }

    /// Returns the edges in the order they were accepted.
    #[must_use]
    #[rustfmt::skip]
    pub fn edges(&self) -> &[Edge] { &self.edges }

    /// Returns the sum of all edge distances.
    #[must_use]
    #[rustfmt::skip]
    pub fn total_distance(&self) -> f64 { self.total_distance }

    /// Returns the number of edges.
    #[must_use]
    #[rustfmt::skip]
    pub fn len(&self) -> usize { self.edges.len() }

    /// Returns `true` when the tree has no edges.
    #[must_use]
    #[rustfmt::skip]
    pub fn is_empty(&self) -> bool { self.edges.is_empty() }

    /// Consumes the tree and returns its edges.
    #[must_use]
    pub fn into_edges(self) -> Vec<Edge> {
        self.edges
    }
}

/// Dual-tree Borůvka solver bound to one point set and k-d tree.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
///
/// use dendra_core::{DenseMatrix, DualTreeMst, Euclidean, ExecutionContext, KdTree};
///
/// let points = DenseMatrix::from_rows("square", &[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]])?;
/// let ctx = ExecutionContext::sequential();
/// let tree = KdTree::build(&points, NonZeroUsize::MIN, &ctx)?;
/// let mst = DualTreeMst::create_with_zero_cores(&points, &tree, &Euclidean)?.compute(&ctx)?;
/// assert_eq!(mst.len(), 3);
/// assert_eq!(mst.total_distance(), 3.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct DualTreeMst<'a, P: ?Sized, M: ?Sized> {
    points: &'a P,
    tree: &'a KdTree,
    metric: &'a M,
    cores: Vec<f64>,
    seeds: &'a dyn CoreResult,
}

impl<'a, P, M> DualTreeMst<'a, P, M>
where
    P: PointSource + ?Sized,
    M: Metric + ?Sized,
{
    /// Prepares a solver weighting edges by mutual reachability.
    ///
    /// The neighbours listed by `cores` seed each round's candidates.
    ///
    /// # Errors
    /// Returns [`MstError::TreeMismatch`] when `tree` indexes a different
    /// number of points and [`MstError::InvalidCoreDistance`] for NaN,
    /// infinite, or negative core distances.
    pub fn create(
        points: &'a P,
        tree: &'a KdTree,
        metric: &'a M,
        cores: &'a dyn CoreResult,
    ) -> Result<Self, MstError> {
        if tree.len() != points.len() {
            return Err(MstError::TreeMismatch {
                tree: tree.len(),
                points: points.len(),
            });
        }
        let core_distances = (0..points.len())
            .map(|point| {
                let value = cores.core_distance(point);
                if value.is_finite() && value >= 0.0 {
                    Ok(value)
                } else {
                    Err(MstError::InvalidCoreDistance { point, value })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            points,
            tree,
            metric,
            cores: core_distances,
            seeds: cores,
        })
    }

    /// Prepares a solver for the plain metric spanning tree.
    ///
    /// # Errors
    /// Returns [`MstError::TreeMismatch`] when `tree` indexes a different
    /// number of points.
    pub fn create_with_zero_cores(
        points: &'a P,
        tree: &'a KdTree,
        metric: &'a M,
    ) -> Result<Self, MstError> {
        Self::create(points, tree, metric, &ZeroCores)
    }

    /// Runs Borůvka rounds until a single component remains.
    ///
    /// Yields `n - 1` edges for `n` points; empty and single-point inputs
    /// produce an empty tree without evaluating any distance. Equal distances
    /// are resolved by endpoint ids, so the result does not depend on the
    /// worker count.
    ///
    /// # Errors
    /// Returns [`MstError::InvalidDistance`] when the metric yields NaN or a
    /// negative value, [`MstError::Cancelled`] when the termination flag
    /// stops a round, and [`MstError::Stalled`] if a round cannot join any
    /// components.
    #[instrument(
        name = "core.mst",
        err,
        skip(self, ctx),
        fields(points = self.points.len(), metric = self.metric.name()),
    )]
    pub fn compute(&self, ctx: &ExecutionContext<'_>) -> Result<MinimumSpanningTree, MstError> {
        let len = self.points.len();
        if len < 2 {
            return Ok(MinimumSpanningTree::default());
        }
        let progress = ctx.track(Stage::SpanningTree, len - 1);
        let min_core = node_min_cores(self.tree, &self.cores);
        let bounds = NodeBounds::new(self.tree.tree_node_count());
        let mut components = Components::new(len);
        let mut tracker = ClosestDistanceTracker::new(len);
        let mut edges = Vec::with_capacity(len - 1);
        let mut rounds = 0_usize;

        while components.count() > 1 {
            ctx.ensure_running(Stage::SpanningTree)?;
            let component_of = components.snapshot();
            let single = single_components(self.tree, &component_of);
            tracker.reset_all();
            tracker.seed(&component_of, self.seeds);
            bounds.reset(self.tree, &component_of, &tracker);

            let round = Round {
                points: self.points,
                tree: self.tree,
                metric: self.metric,
                cores: &self.cores,
                min_core: &min_core,
                component_of: &component_of,
                single: &single,
                seed: &tracker,
                bounds: &bounds,
                ctx,
            };
            let (candidates, stats) = round.run()?;
            tracker.merge_min(candidates);

            let added = accept_candidates(&tracker, &mut components, &mut edges);
            if added == 0 {
                return Err(MstError::Stalled {
                    components: components.count(),
                });
            }
            rounds += 1;
            record_round(stats);
            debug!(
                round = rounds,
                added,
                components = components.count(),
                base_cases = stats.base_cases,
                pruned_pairs = stats.pruned_pairs,
                "Borůvka round finished"
            );
            progress.advance(added);
        }
        progress.finish();
        Ok(MinimumSpanningTree::new(edges))
    }
}

/// Joins components along their best candidates, cheapest first; returns the
/// number of edges added.
fn accept_candidates(
    tracker: &ClosestDistanceTracker,
    components: &mut Components,
    edges: &mut Vec<Edge>,
) -> usize {
    let mut accepted: Vec<Edge> = tracker
        .candidates()
        .filter_map(|(_, candidate)| {
            Some(Edge::new(
                candidate.inside()?,
                candidate.outside()?,
                candidate.distance(),
            ))
        })
        .collect();
    accepted.sort_unstable();
    accepted.dedup();
    let before = edges.len();
    for edge in accepted {
        if components.union(edge.source, edge.target) {
            edges.push(edge);
        }
    }
    edges.len() - before
}

#[cfg(feature = "metrics")]
fn record_round(stats: TraversalStats) {
    metrics::counter!("dual_tree_rounds").increment(1);
    metrics::counter!("dual_tree_base_cases").increment(stats.base_cases);
    metrics::counter!("dual_tree_pruned_pairs").increment(stats.pruned_pairs);
}

#[cfg(not(feature = "metrics"))]
fn record_round(_stats: TraversalStats) {}


#[cfg(test)]
mod property;
