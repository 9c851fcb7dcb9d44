//! Condensation of the dendrogram by minimum cluster size.
//!
//! A merge only counts as a split when both sides hold at least
//! `min_cluster_size` points. When one side is smaller, its points leave the
//! surviving cluster at the merge distance and the cluster continues down the
//! larger side under the same id. When both sides are smaller, the cluster
//! ends and every remaining point leaves at that distance.

use std::{num::NonZeroUsize, ops::Range};

use tracing::instrument;

use crate::execution::{ExecutionContext, Stage};

use super::{ClusterHierarchy, HierarchyError};

/// Clusters that survive condensation and the height at which every point
/// left them.
///
/// Cluster ids are compact and start at the point count `n`; the root
/// cluster is `n` and is born at distance `+inf`. Child ids are always larger
/// than their parent's. Each point records the cluster it fell out of and the
/// merge distance at which that happened.
#[derive(Clone, Debug, PartialEq)]
pub struct CondensedTree {
    point_count: usize,
    parent: Vec<Option<usize>>,
    lambda: Vec<f64>,
    size: Vec<usize>,
    fell_out_of: Vec<usize>,
    point_lambda: Vec<f64>,
}

impl CondensedTree {
    /// Condenses `hierarchy`, discarding splits smaller than `min_cluster_size`.
    ///
    /// A `min_cluster_size` larger than the dataset is valid and leaves only
    /// the root cluster.
    ///
    /// # Errors
    /// Returns [`HierarchyError::Cancelled`] when the context's termination
    /// flag stops the walk.
    #[instrument(
        name = "core.condense",
        err,
        skip(hierarchy, ctx),
        fields(points = hierarchy.point_count(), min_cluster_size = min_cluster_size.get()),
    )]
    pub fn condense(
        hierarchy: &ClusterHierarchy,
        min_cluster_size: NonZeroUsize,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Self, HierarchyError> {
        let n = hierarchy.point_count();
        let mut tree = Self {
            point_count: n,
            parent: Vec::new(),
            lambda: Vec::new(),
            size: Vec::new(),
            fell_out_of: vec![n; n],
            point_lambda: vec![0.0; n],
        };
        if n == 0 {
            return Ok(tree);
        }
        tree.push_cluster(None, f64::INFINITY, n);

        let merges = hierarchy.merge_count();
        let progress = ctx.track(Stage::Condensation, merges);
        let mut cluster_of_merge: Vec<Option<usize>> = vec![None; merges];
        if let Some(root) = cluster_of_merge.last_mut() {
            *root = Some(n);
        }

        let mut leaves = Vec::new();
        for merge in (0..merges).rev() {
            ctx.ensure_running(Stage::Condensation)?;
            progress.advance(1);
            let Some(cluster) = cluster_of_merge[merge] else {
                continue;
            };
            let node = n + merge;
            let Some((left, right)) = hierarchy.children(node) else {
                continue;
            };
            let distance = hierarchy.lambda(node);
            let is_cluster = |child: usize| {
                !hierarchy.is_leaf(child) && hierarchy.size(child) >= min_cluster_size.get()
            };

            match (is_cluster(left), is_cluster(right)) {
                (true, true) => {
                    for child in [left, right] {
                        let id = tree.push_cluster(Some(cluster), distance, hierarchy.size(child));
                        cluster_of_merge[child - n] = Some(id);
                    }
                }
                (true, false) => {
                    tree.fall_out(hierarchy, right, cluster, distance, &mut leaves);
                    cluster_of_merge[left - n] = Some(cluster);
                }
                (false, true) => {
                    tree.fall_out(hierarchy, left, cluster, distance, &mut leaves);
                    cluster_of_merge[right - n] = Some(cluster);
                }
                (false, false) => {
                    tree.fall_out(hierarchy, left, cluster, distance, &mut leaves);
                    tree.fall_out(hierarchy, right, cluster, distance, &mut leaves);
                }
            }
        }
        progress.finish();
        Ok(tree)
    }

    fn push_cluster(&mut self, parent: Option<usize>, lambda: f64, size: usize) -> usize {
        let id = self.point_count + self.parent.len();
        self.parent.push(parent);
        self.lambda.push(lambda);
        self.size.push(size);
        id
    }

    fn fall_out(
        &mut self,
        hierarchy: &ClusterHierarchy,
        node: usize,
        cluster: usize,
        distance: f64,
        scratch: &mut Vec<usize>,
    ) {
        scratch.clear();
        hierarchy.leaves(node, scratch);
        for &point in scratch.iter() {
            self.fell_out_of[point] = cluster;
            self.point_lambda[point] = distance;
        }
    }

    /// Returns the number of points.
    #[must_use]
    #[rustfmt::skip]
    pub fn point_count(&self) -> usize { self.point_count }

    /// Returns the number of condensed clusters.
    #[must_use]
    #[rustfmt::skip]
    pub fn cluster_count(&self) -> usize { self.parent.len() }

    /// Returns the root cluster id, `n`, or `None` for an empty dataset.
    #[must_use]
    pub fn root(&self) -> Option<usize> {
        (!self.parent.is_empty()).then_some(self.point_count)
    }

    /// Returns the largest assigned cluster id.
    #[must_use]
    pub fn maximum_cluster_id(&self) -> Option<usize> {
        self.clusters().next_back()
    }

    /// Returns the ids of every cluster in ascending order.
    #[must_use]
    pub fn clusters(&self) -> Range<usize> {
        self.point_count..self.point_count + self.parent.len()
    }

    /// Returns `true` when `cluster` names a condensed cluster.
    #[must_use]
    pub fn contains_cluster(&self, cluster: usize) -> bool {
        self.clusters().contains(&cluster)
    }

    /// Returns the parent of `cluster`; the root has none.
    ///
    /// # Panics
    /// Panics when `cluster` is not a condensed cluster id.
    #[must_use]
    pub fn parent(&self, cluster: usize) -> Option<usize> {
        self.parent[self.offset(cluster)]
    }

    /// Returns the distance at which `cluster` split from its parent.
    ///
    /// # Panics
    /// Panics when `cluster` is not a condensed cluster id.
    #[must_use]
    pub fn lambda(&self, cluster: usize) -> f64 {
        self.lambda[self.offset(cluster)]
    }

    /// Returns the number of points in `cluster` when it was born.
    ///
    /// # Panics
    /// Panics when `cluster` is not a condensed cluster id.
    #[must_use]
    pub fn size(&self, cluster: usize) -> usize {
        self.size[self.offset(cluster)]
    }

    /// Returns the cluster that `point` left last.
    #[must_use]
    pub fn fell_out_of(&self, point: usize) -> usize {
        self.fell_out_of[point]
    }

    /// Returns the distance at which `point` left [`Self::fell_out_of`].
    #[must_use]
    pub fn point_lambda(&self, point: usize) -> f64 {
        self.point_lambda[point]
    }

    fn offset(&self, cluster: usize) -> usize {
        assert!(
            self.contains_cluster(cluster),
            "cluster {cluster} is not part of the condensed tree"
        );
        cluster - self.point_count
    }
}
