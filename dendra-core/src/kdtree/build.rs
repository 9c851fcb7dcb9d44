//! Fork-join construction of the k-d tree arena.

use std::{
    num::NonZeroUsize,
    sync::atomic::{AtomicUsize, Ordering},
};

use tracing::{debug, instrument};

use super::{KdNode, KdTree, KdTreeError, SplitInformation};
use crate::{
    aabb::Aabb,
    execution::{ExecutionContext, Stage, StageProgress},
    points::PointSource,
};

/// Arena index of the root node.
pub(crate) const ROOT: usize = 0;

/// Ranges at least this long fork their children onto separate tasks.
const PARALLEL_SPLIT_THRESHOLD: usize = 2048;

/// Identity of a node before its range is built.
#[derive(Clone, Copy)]
struct Slot {
    id: usize,
    parent: Option<usize>,
    sibling: Option<usize>,
}

struct Builder<'a, P: ?Sized> {
    points: &'a P,
    leaf_size: usize,
    ctx: &'a ExecutionContext<'a>,
    progress: StageProgress<'a>,
    next_id: AtomicUsize,
    leaves: AtomicUsize,
}

impl KdTree {
    /// Builds a balanced tree over every point of `points`.
    ///
    /// Ranges of at most `leaf_size` points become leaves. Larger ranges are
    /// partitioned in place around the median of their widest axis; equal
    /// coordinates are ordered by point id so the partition is deterministic.
    /// Node ids come from a shared counter; the root always receives `0`.
    ///
    /// # Errors
    /// Returns [`KdTreeError::Cancelled`] when the context's termination flag
    /// stops construction.
    #[instrument(
        name = "core.kdtree",
        err,
        skip(points, ctx),
        fields(points = points.len(), leaf_size = leaf_size.get()),
    )]
    pub fn build<P: PointSource + ?Sized>(
        points: &P,
        leaf_size: NonZeroUsize,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Self, KdTreeError> {
        let mut ids: Vec<usize> = (0..points.len()).collect();
        let builder = Builder {
            points,
            leaf_size: leaf_size.get(),
            ctx,
            progress: ctx.track(Stage::TreeBuild, ids.len()),
            next_id: AtomicUsize::new(ROOT + 1),
            leaves: AtomicUsize::new(0),
        };
        let root = Slot {
            id: ROOT,
            parent: None,
            sibling: None,
        };
        let built = builder.build_range(&mut ids, 0, root)?;
        let allocated = builder.next_id.load(Ordering::Relaxed);
        let leaf_count = builder.leaves.load(Ordering::Relaxed);
        builder.progress.finish();

        let nodes = into_arena(built, allocated)?;
        debug!(nodes = nodes.len(), leaves = leaf_count, "k-d tree built");
        Ok(Self {
            ids,
            nodes,
            leaf_count,
            leaf_size,
        })
    }
}

impl<P: PointSource + ?Sized> Builder<'_, P> {
    fn build_range(
        &self,
        ids: &mut [usize],
        start: usize,
        slot: Slot,
    ) -> Result<Vec<KdNode>, KdTreeError> {
        self.ctx.ensure_running(Stage::TreeBuild)?;
        let forking = self.ctx.is_parallel() && ids.len() >= PARALLEL_SPLIT_THRESHOLD;
        let aabb = if forking {
            Aabb::create_in_parallel(self.points, ids, self.ctx.concurrency())
        } else {
            Aabb::create(self.points, ids)
        };
        let end = start + ids.len();

        if ids.len() <= self.leaf_size {
            self.leaves.fetch_add(1, Ordering::Relaxed);
            self.progress.advance(ids.len());
            return Ok(vec![KdNode {
                id: slot.id,
                start,
                end,
                parent: slot.parent,
                sibling: slot.sibling,
                children: None,
                split: None,
                aabb,
            }]);
        }

        let split = self.partition(ids, aabb.most_spread_dimension());
        let left_id = self.next_id.fetch_add(2, Ordering::Relaxed);
        let right_id = left_id + 1;
        let left_slot = Slot {
            id: left_id,
            parent: Some(slot.id),
            sibling: Some(right_id),
        };
        let right_slot = Slot {
            id: right_id,
            parent: Some(slot.id),
            sibling: Some(left_id),
        };
        let mid = ids.len() / 2;
        let (left_ids, right_ids) = ids.split_at_mut(mid);
        let (left, right) = if forking {
            rayon::join(
                || self.build_range(left_ids, start, left_slot),
                || self.build_range(right_ids, start + mid, right_slot),
            )
        } else {
            (
                self.build_range(left_ids, start, left_slot),
                self.build_range(right_ids, start + mid, right_slot),
            )
        };

        let mut nodes = left?;
        nodes.append(&mut right?);
        nodes.push(KdNode {
            id: slot.id,
            start,
            end,
            parent: slot.parent,
            sibling: slot.sibling,
            children: Some((left_id, right_id)),
            split: Some(split),
            aabb,
        });
        Ok(nodes)
    }

    /// Moves the median of `dimension` to the middle of `ids`.
    fn partition(&self, ids: &mut [usize], dimension: usize) -> SplitInformation {
        let points = self.points;
        let mid = ids.len() / 2;
        let (_, median, _) = ids.select_nth_unstable_by(mid, |&left, &right| {
            points.point(left)[dimension]
                .total_cmp(&points.point(right)[dimension])
                .then(left.cmp(&right))
        });
        SplitInformation {
            value: points.point(*median)[dimension],
            dimension,
        }
    }
}

fn into_arena(built: Vec<KdNode>, allocated: usize) -> Result<Vec<KdNode>, KdTreeError> {
    let mut slots: Vec<Option<KdNode>> = (0..allocated).map(|_| None).collect();
    for node in built {
        let id = node.id;
        if let Some(slot) = slots.get_mut(id) {
            *slot = Some(node);
        }
    }
    let missing = slots.iter().filter(|slot| slot.is_none()).count();
    if missing > 0 {
        return Err(KdTreeError::IncompleteArena { missing, allocated });
    }
    Ok(slots.into_iter().flatten().collect())
}
