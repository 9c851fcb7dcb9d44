//! Exact k-nearest-neighbour search over the k-d tree.

use std::{cmp::Ordering, collections::BinaryHeap, num::NonZeroUsize};

use rayon::prelude::*;
use tracing::{debug, instrument};

use super::{CoreDistanceError, CoreDistances, Neighbour};
use crate::{
    distance::{Metric, checked_distance},
    execution::{ExecutionContext, Stage, StageProgress},
    kdtree::{KdNode, KdTree},
    points::PointSource,
};

/// Heap entry ordered by distance, then id.
#[derive(Clone, Copy, Debug)]
struct Entry {
    distance: f64,
    id: usize,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.id.cmp(&other.id))
    }
}

struct Search<'a, P: ?Sized, M: ?Sized> {
    points: &'a P,
    tree: &'a KdTree,
    metric: &'a M,
    k: usize,
}

impl<P, M> Search<'_, P, M>
where
    P: PointSource + ?Sized,
    M: Metric + ?Sized,
{
    /// Returns the `k` nearest other points of `query`, nearest first.
    fn nearest(&self, query: usize) -> Result<Vec<Neighbour>, CoreDistanceError> {
        let mut heap = BinaryHeap::with_capacity(self.k + 1);
        if self.k > 0 {
            self.visit(self.tree.root(), query, &mut heap)?;
        }
        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|entry| Neighbour::new(entry.id, entry.distance))
            .collect())
    }

    fn visit(
        &self,
        node: &KdNode,
        query: usize,
        heap: &mut BinaryHeap<Entry>,
    ) -> Result<(), CoreDistanceError> {
        let point = self.points.point(query);
        if self.is_pruned(heap, self.metric.point_to_box(point, node.aabb())) {
            return Ok(());
        }
        let Some((left, right)) = node.children() else {
            for &candidate in self.tree.nodes_contained(node) {
                if candidate == query {
                    continue;
                }
                let entry = Entry {
                    distance: checked_distance(self.points, self.metric, query, candidate)?,
                    id: candidate,
                };
                if heap.len() < self.k {
                    heap.push(entry);
                } else if heap.peek().is_some_and(|worst| entry < *worst) {
                    heap.pop();
                    heap.push(entry);
                }
            }
            return Ok(());
        };
        let left = self.tree.node(left);
        let right = self.tree.node(right);
        let left_bound = self.metric.point_to_box(point, left.aabb());
        let right_bound = self.metric.point_to_box(point, right.aabb());
        let (near, far) = if right_bound < left_bound {
            (right, left)
        } else {
            (left, right)
        };
        self.visit(near, query, heap)?;
        self.visit(far, query, heap)
    }

    fn is_pruned(&self, heap: &BinaryHeap<Entry>, lower_bound: f64) -> bool {
        heap.len() == self.k && heap.peek().is_some_and(|worst| lower_bound > worst.distance)
    }
}

impl CoreDistances {
    /// Computes each point's distance to its `samples`-th nearest other point.
    ///
    /// Points with fewer than `samples` others use the farthest available
    /// neighbour; a lone point has core distance `0`. The neighbours found
    /// are kept, nearest first, for [`crate::CoreResult::neighbours_of`].
    ///
    /// # Errors
    /// Returns [`CoreDistanceError::InvalidDistance`] when the metric yields
    /// NaN or a negative value and [`CoreDistanceError::Cancelled`] when the
    /// termination flag stops the search.
    #[instrument(
        name = "core.core_distances",
        err,
        skip(points, tree, metric, ctx),
        fields(points = points.len(), samples = samples.get(), metric = metric.name()),
    )]
    pub fn compute<P, M>(
        points: &P,
        tree: &KdTree,
        metric: &M,
        samples: NonZeroUsize,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Self, CoreDistanceError>
    where
        P: PointSource + ?Sized,
        M: Metric + ?Sized,
    {
        let len = points.len();
        let search = Search {
            points,
            tree,
            metric,
            k: samples.get().min(len.saturating_sub(1)),
        };
        let progress = ctx.track(Stage::CoreDistances, len);
        let query = |id: usize| query_point(&search, &progress, ctx, id);
        let neighbours = if ctx.is_parallel() {
            (0..len)
                .into_par_iter()
                .map(query)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            (0..len).map(query).collect::<Result<Vec<_>, _>>()?
        };
        progress.finish();

        let distances = neighbours
            .iter()
            .map(|list| list.last().map_or(0.0, |neighbour| neighbour.distance))
            .collect();
        debug!(k = search.k, "core distances computed");
        Ok(Self::flatten(distances, neighbours))
    }
}

fn query_point<P, M>(
    search: &Search<'_, P, M>,
    progress: &StageProgress<'_>,
    ctx: &ExecutionContext<'_>,
    id: usize,
) -> Result<Vec<Neighbour>, CoreDistanceError>
where
    P: PointSource + ?Sized,
    M: Metric + ?Sized,
{
    ctx.ensure_running(Stage::CoreDistances)?;
    let neighbours = search.nearest(id)?;
    progress.advance(1);
    Ok(neighbours)
}
