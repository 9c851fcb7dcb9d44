//! Excess-of-mass stability scores and the selection they drive.

use super::{CondensedTree, HierarchyError};

/// Density at distance `distance`; `+inf` maps to `0` and zero distances are
/// clamped to `f64::EPSILON`.
fn density(distance: f64) -> f64 {
    if distance.is_infinite() {
        0.0
    } else {
        1.0 / distance.max(f64::EPSILON)
    }
}

/// Stability of every condensed cluster, indexed by cluster id.
///
/// A cluster accumulates, for each point that fell out of it,
/// `density(point lambda) - density(cluster lambda)`, and for each child
/// cluster, `child size * (density(child lambda) - density(cluster lambda))`.
/// Both terms are non-negative because merge heights never increase going
/// down the tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Stabilities {
    first: usize,
    values: Vec<f64>,
}

impl Stabilities {
    /// Scores every cluster of `condensed`.
    #[must_use]
    pub fn compute(condensed: &CondensedTree) -> Self {
        let first = condensed.point_count();
        let mut values = vec![0.0; condensed.cluster_count()];
        if values.is_empty() {
            return Self { first, values };
        }

        for point in 0..condensed.point_count() {
            let cluster = condensed.fell_out_of(point);
            values[cluster - first] +=
                density(condensed.point_lambda(point)) - density(condensed.lambda(cluster));
        }
        for cluster in condensed.clusters() {
            if let Some(parent) = condensed.parent(cluster) {
                let birth = density(condensed.lambda(parent));
                let split = density(condensed.lambda(cluster));
                values[parent - first] += condensed.size(cluster) as f64 * (split - birth);
            }
        }
        Self { first, values }
    }

    /// Returns the stability of `cluster`.
    ///
    /// # Panics
    /// Panics when `cluster` was not scored.
    #[must_use]
    pub fn get(&self, cluster: usize) -> f64 {
        self.values[cluster - self.first]
    }

    /// Returns the number of scored clusters.
    #[must_use]
    #[rustfmt::skip]
    pub fn len(&self) -> usize { self.values.len() }

    /// Returns `true` when no cluster was scored.
    #[must_use]
    #[rustfmt::skip]
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Returns the scores in ascending cluster id order.
    #[must_use]
    #[rustfmt::skip]
    pub fn as_slice(&self) -> &[f64] { &self.values }
}

/// Non-overlapping set of selected condensed clusters.
///
/// No selected cluster is a descendant of another selected cluster.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClusterSelection {
    first: usize,
    selected: Vec<bool>,
}

impl ClusterSelection {
    /// Picks the clusters that maximise total stability.
    ///
    /// Clusters are visited children first. A cluster is selected when its
    /// own stability strictly exceeds the best total its descendants can
    /// offer; otherwise that total propagates upwards. Selected clusters then
    /// absorb every selected descendant.
    ///
    /// # Errors
    /// Returns [`HierarchyError::SelectionMismatch`] when `stabilities` were
    /// computed for a different tree.
    pub fn select(
        condensed: &CondensedTree,
        stabilities: &Stabilities,
    ) -> Result<Self, HierarchyError> {
        if stabilities.len() != condensed.cluster_count()
            || stabilities.first != condensed.point_count()
        {
            return Err(HierarchyError::SelectionMismatch {
                expected: condensed.cluster_count(),
                actual: stabilities.len(),
            });
        }

        let first = condensed.point_count();
        let mut selected = vec![false; condensed.cluster_count()];
        let mut descendant_total = vec![0.0; condensed.cluster_count()];
        for cluster in condensed.clusters().rev() {
            let offset = cluster - first;
            let own = stabilities.get(cluster);
            let propagated = if own > descendant_total[offset] {
                selected[offset] = true;
                own
            } else {
                descendant_total[offset]
            };
            if let Some(parent) = condensed.parent(cluster) {
                descendant_total[parent - first] += propagated;
            }
        }

        let mut selection = Self { first, selected };
        selection.absorb_descendants(condensed);
        Ok(selection)
    }

    /// Selects every cluster, which after absorption leaves the root alone.
    #[must_use]
    pub fn all(condensed: &CondensedTree) -> Self {
        let mut selection = Self {
            first: condensed.point_count(),
            selected: vec![true; condensed.cluster_count()],
        };
        selection.absorb_descendants(condensed);
        selection
    }

    /// Selects the given clusters, dropping any that descend from another.
    ///
    /// # Errors
    /// Returns [`HierarchyError::UnknownCluster`] for ids outside the tree.
    pub fn from_clusters(
        condensed: &CondensedTree,
        clusters: &[usize],
    ) -> Result<Self, HierarchyError> {
        let first = condensed.point_count();
        let mut selected = vec![false; condensed.cluster_count()];
        for &cluster in clusters {
            if !condensed.contains_cluster(cluster) {
                return Err(HierarchyError::UnknownCluster { cluster });
            }
            selected[cluster - first] = true;
        }
        let mut selection = Self { first, selected };
        selection.absorb_descendants(condensed);
        Ok(selection)
    }

    fn absorb_descendants(&mut self, condensed: &CondensedTree) {
        let mut covered = vec![false; self.selected.len()];
        for cluster in condensed.clusters() {
            let offset = cluster - self.first;
            if let Some(parent) = condensed.parent(cluster) {
                let parent_offset = parent - self.first;
                covered[offset] = self.selected[parent_offset] || covered[parent_offset];
            }
            if covered[offset] {
                self.selected[offset] = false;
            }
        }
    }

    /// Returns `true` when `cluster` is selected.
    #[must_use]
    pub fn is_selected(&self, cluster: usize) -> bool {
        cluster
            .checked_sub(self.first)
            .and_then(|offset| self.selected.get(offset))
            .copied()
            .unwrap_or(false)
    }

    /// Returns the selected cluster ids in ascending order.
    #[must_use]
    pub fn selected_clusters(&self) -> Vec<usize> {
        self.selected
            .iter()
            .enumerate()
            .filter_map(|(offset, &selected)| selected.then_some(self.first + offset))
            .collect()
    }

    /// Returns the number of clusters the selection was made over.
    #[must_use]
    #[rustfmt::skip]
    pub fn cluster_count(&self) -> usize { self.selected.len() }
}
