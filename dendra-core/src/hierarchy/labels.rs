//! Flat labelling from a cluster selection.

use crate::result::{ClusteringResult, NOISE};

use super::{ClusterSelection, CondensedTree, HierarchyError};

/// Labels every point by its nearest selected ancestor cluster.
///
/// Selected clusters are numbered `0..k` in ascending cluster id order.
/// Points whose chain of clusters reaches the root without meeting a
/// selected one are [`NOISE`].
///
/// # Errors
/// Returns [`HierarchyError::SelectionMismatch`] when `selection` was made
/// over a different tree, and [`HierarchyError::LabelOverflow`] when the
/// selected clusters cannot be numbered with `i64` labels.
pub fn label_points(
    condensed: &CondensedTree,
    selection: &ClusterSelection,
) -> Result<ClusteringResult, HierarchyError> {
    if selection.cluster_count() != condensed.cluster_count() {
        return Err(HierarchyError::SelectionMismatch {
            expected: condensed.cluster_count(),
            actual: selection.cluster_count(),
        });
    }
    if condensed.point_count() == 0 {
        return Ok(ClusteringResult::empty());
    }

    let first = condensed.point_count();
    let mut next_label: i64 = 0;
    let mut cluster_labels: Vec<Option<i64>> = Vec::with_capacity(condensed.cluster_count());
    for cluster in condensed.clusters() {
        let label = if selection.is_selected(cluster) {
            let label = next_label;
            next_label = next_label
                .checked_add(1)
                .ok_or(HierarchyError::LabelOverflow {
                    clusters: condensed.cluster_count(),
                })?;
            Some(label)
        } else {
            condensed
                .parent(cluster)
                .and_then(|parent| cluster_labels[parent - first])
        };
        cluster_labels.push(label);
    }

    let labels = (0..condensed.point_count())
        .map(|point| cluster_labels[condensed.fell_out_of(point) - first].unwrap_or(NOISE))
        .collect();
    Ok(ClusteringResult::from_labels(labels))
}
