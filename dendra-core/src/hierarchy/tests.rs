//! Unit tests for the dendrogram, condensation, and cluster extraction.

use std::num::NonZeroUsize;

use proptest::prelude::*;
use rstest::{fixture, rstest};

use super::*;
use crate::{
    execution::{CancellationFlag, ExecutionContext, Stage},
    mst::Edge,
    result::NOISE,
    test_utils::suite_proptest_config,
};

const TOLERANCE: f64 = 1e-12;

fn non_zero(value: usize) -> NonZeroUsize {
    NonZeroUsize::new(value).expect("value must be non-zero")
}

fn condense(hierarchy: &ClusterHierarchy, min_cluster_size: usize) -> CondensedTree {
    CondensedTree::condense(
        hierarchy,
        non_zero(min_cluster_size),
        &ExecutionContext::sequential(),
    )
    .expect("condensation must succeed")
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= TOLERANCE,
        "expected {expected}, got {actual}"
    );
}

/// Two chains, `0-1-2-3` and `4-5-6`, joined by the heaviest edge.
#[fixture]
fn seven_point_hierarchy() -> ClusterHierarchy {
    let edges = [
        Edge::new(0, 1, 1.0),
        Edge::new(1, 2, 1.5),
        Edge::new(2, 3, 2.0),
        Edge::new(4, 5, 1.0),
        Edge::new(5, 6, 1.25),
        Edge::new(3, 4, 3.0),
    ];
    ClusterHierarchy::from_edges(7, &edges).expect("edges form a tree")
}

#[rstest]
fn dendrogram_records_merges_in_distance_order(seven_point_hierarchy: ClusterHierarchy) {
    let hierarchy = seven_point_hierarchy;
    assert_eq!(hierarchy.merge_count(), 6);
    assert_eq!(hierarchy.node_count(), 13);
    assert_eq!(hierarchy.root(), Some(12));

    let children: Vec<_> = (7..13).filter_map(|node| hierarchy.children(node)).collect();
    assert_eq!(
        children,
        vec![(0, 1), (4, 5), (8, 6), (7, 2), (10, 3), (11, 9)]
    );
    let lambdas: Vec<f64> = (7..13).map(|node| hierarchy.lambda(node)).collect();
    assert_eq!(lambdas, vec![1.0, 1.0, 1.25, 1.5, 2.0, 3.0]);
    let sizes: Vec<usize> = (7..13).map(|node| hierarchy.size(node)).collect();
    assert_eq!(sizes, vec![2, 2, 3, 3, 4, 7]);

    assert!(hierarchy.is_leaf(6));
    assert!(!hierarchy.is_leaf(7));
    assert_eq!(hierarchy.children(3), None);
    assert_eq!(hierarchy.lambda(3), 0.0);
}

#[rstest]
#[case::empty(0, vec![], None)]
#[case::single(1, vec![], Some(0))]
#[case::pair(2, vec![Edge::new(1, 0, 0.5)], Some(2))]
fn small_inputs_have_expected_roots(
    #[case] points: usize,
    #[case] edges: Vec<Edge>,
    #[case] root: Option<usize>,
) {
    let hierarchy = ClusterHierarchy::from_edges(points, &edges).expect("valid input");
    assert_eq!(hierarchy.root(), root);
    if let Some(root) = root {
        assert_eq!(hierarchy.size(root), points);
    }
}

#[rstest]
#[case::too_few(3, vec![Edge::new(0, 1, 1.0)], HierarchyErrorCode::EdgeCountMismatch)]
#[case::too_many(1, vec![Edge::new(0, 0, 1.0)], HierarchyErrorCode::EdgeCountMismatch)]
#[case::out_of_range(2, vec![Edge::new(0, 2, 1.0)], HierarchyErrorCode::InvalidNodeId)]
#[case::negative(2, vec![Edge::new(0, 1, -1.0)], HierarchyErrorCode::InvalidEdgeWeight)]
#[case::nan(2, vec![Edge::new(0, 1, f64::NAN)], HierarchyErrorCode::InvalidEdgeWeight)]
#[case::infinite(2, vec![Edge::new(0, 1, f64::INFINITY)], HierarchyErrorCode::InvalidEdgeWeight)]
#[case::cycle(
    3,
    vec![Edge::new(0, 1, 1.0), Edge::new(1, 0, 2.0)],
    HierarchyErrorCode::CycleDetected
)]
fn invalid_edges_are_rejected(
    #[case] points: usize,
    #[case] edges: Vec<Edge>,
    #[case] expected: HierarchyErrorCode,
) {
    let err = ClusterHierarchy::from_edges(points, &edges).expect_err("input must be rejected");
    assert_eq!(err.code(), expected);
}

#[test]
fn error_codes_are_stable() {
    let err = HierarchyError::CycleDetected { left: 0, right: 1 };
    assert_eq!(err.code().as_str(), "HIERARCHY_CYCLE_DETECTED");
    assert_eq!(err.to_string(), "edge (0, 1) closes a cycle");
}

#[rstest]
#[case::min_size_two(
    2,
    vec![8, 8, 8, 8, 9, 9, 9],
    vec![1.0, 1.0, 1.5, 2.0, 1.0, 1.0, 1.25],
)]
#[case::min_size_three(
    3,
    vec![8, 8, 8, 8, 9, 9, 9],
    vec![1.5, 1.5, 1.5, 2.0, 1.25, 1.25, 1.25],
)]
fn condensation_splits_the_two_chains(
    seven_point_hierarchy: ClusterHierarchy,
    #[case] min_cluster_size: usize,
    #[case] fell_out_of: Vec<usize>,
    #[case] point_lambdas: Vec<f64>,
) {
    let condensed = condense(&seven_point_hierarchy, min_cluster_size);
    assert_eq!(condensed.root(), Some(7));
    assert_eq!(condensed.maximum_cluster_id(), Some(9));
    assert_eq!(condensed.parent(7), None);
    assert_eq!(condensed.lambda(7), f64::INFINITY);
    assert_eq!(condensed.size(7), 7);
    for (cluster, size) in [(8, 4), (9, 3)] {
        assert_eq!(condensed.parent(cluster), Some(7));
        assert_eq!(condensed.lambda(cluster), 3.0);
        assert_eq!(condensed.size(cluster), size);
    }

    let actual_clusters: Vec<usize> = (0..7).map(|point| condensed.fell_out_of(point)).collect();
    let actual_lambdas: Vec<f64> = (0..7).map(|point| condensed.point_lambda(point)).collect();
    assert_eq!(actual_clusters, fell_out_of);
    assert_eq!(actual_lambdas, point_lambdas);
}

#[rstest]
fn oversized_min_cluster_size_keeps_only_the_root(seven_point_hierarchy: ClusterHierarchy) {
    let condensed = condense(&seven_point_hierarchy, 4);
    assert_eq!(condensed.root(), Some(7));
    assert_eq!(condensed.maximum_cluster_id(), Some(7));
    let lambdas: Vec<f64> = (0..7).map(|point| condensed.point_lambda(point)).collect();
    assert_eq!(lambdas, vec![2.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0]);
    assert!((0..7).all(|point| condensed.fell_out_of(point) == 7));

    let stabilities = Stabilities::compute(&condensed);
    assert_close(stabilities.get(7), 3.0);

    let larger_than_dataset = condense(&seven_point_hierarchy, 50);
    assert_eq!(larger_than_dataset.cluster_count(), 1);
}

#[test]
fn single_point_leaves_the_root_at_zero() {
    let hierarchy = ClusterHierarchy::from_edges(1, &[]).expect("single point");
    let condensed = condense(&hierarchy, 1);
    assert_eq!(condensed.root(), Some(1));
    assert_eq!(condensed.fell_out_of(0), 1);
    assert_eq!(condensed.point_lambda(0), 0.0);

    let stabilities = Stabilities::compute(&condensed);
    let selection = ClusterSelection::select(&condensed, &stabilities).expect("same tree");
    let result = label_points(&condensed, &selection).expect("labelling succeeds");
    assert_eq!(result.labels(), &[0]);
}

#[test]
fn empty_dataset_condenses_to_nothing() {
    let hierarchy = ClusterHierarchy::from_edges(0, &[]).expect("empty input");
    let condensed = condense(&hierarchy, 3);
    assert_eq!(condensed.root(), None);
    assert_eq!(condensed.maximum_cluster_id(), None);

    let stabilities = Stabilities::compute(&condensed);
    assert!(stabilities.is_empty());
    let selection = ClusterSelection::select(&condensed, &stabilities).expect("same tree");
    let result = label_points(&condensed, &selection).expect("labelling succeeds");
    assert!(result.is_empty());
}

#[rstest]
#[case::min_size_two(2, 7.0 / 3.0, 11.0 / 6.0, 1.8)]
#[case::min_size_three(3, 7.0 / 3.0, 7.0 / 6.0, 1.4)]
fn stabilities_match_hand_computed_values(
    seven_point_hierarchy: ClusterHierarchy,
    #[case] min_cluster_size: usize,
    #[case] root: f64,
    #[case] left: f64,
    #[case] right: f64,
) {
    let condensed = condense(&seven_point_hierarchy, min_cluster_size);
    let stabilities = Stabilities::compute(&condensed);
    assert_close(stabilities.get(7), root);
    assert_close(stabilities.get(8), left);
    assert_close(stabilities.get(9), right);

    let selection = ClusterSelection::select(&condensed, &stabilities).expect("same tree");
    assert_eq!(selection.selected_clusters(), vec![8, 9]);
    let result = label_points(&condensed, &selection).expect("labelling succeeds");
    assert_eq!(result.labels(), &[0, 0, 0, 0, 1, 1, 1]);
    assert_eq!(result.cluster_count(), 2);
    assert_eq!(result.noise_count(), 0);
}

/// Sums, over every point, the density at which it leaves the root cluster.
fn root_stability_from_departures(condensed: &CondensedTree) -> f64 {
    let root = condensed.root().expect("non-empty tree");
    (0..condensed.point_count())
        .map(|point| {
            let mut cluster = condensed.fell_out_of(point);
            let mut departure = condensed.point_lambda(point);
            while let Some(parent) = condensed.parent(cluster) {
                if parent == root {
                    departure = condensed.lambda(cluster);
                }
                cluster = parent;
            }
            1.0 / departure.max(f64::EPSILON)
        })
        .sum()
}

#[rstest]
#[case(2)]
#[case(3)]
#[case(4)]
fn root_stability_agrees_with_departure_sum(
    seven_point_hierarchy: ClusterHierarchy,
    #[case] min_cluster_size: usize,
) {
    let condensed = condense(&seven_point_hierarchy, min_cluster_size);
    let stabilities = Stabilities::compute(&condensed);
    assert_close(stabilities.get(7), root_stability_from_departures(&condensed));
}

#[rstest]
fn selection_is_idempotent(seven_point_hierarchy: ClusterHierarchy) {
    let condensed = condense(&seven_point_hierarchy, 2);
    let stabilities = Stabilities::compute(&condensed);
    let first = ClusterSelection::select(&condensed, &stabilities).expect("same tree");
    let second = ClusterSelection::select(&condensed, &stabilities).expect("same tree");
    assert_eq!(first, second);

    let replayed =
        ClusterSelection::from_clusters(&condensed, &first.selected_clusters()).expect("known ids");
    assert_eq!(replayed, first);
}

#[rstest]
fn selecting_everything_yields_one_label(seven_point_hierarchy: ClusterHierarchy) {
    let condensed = condense(&seven_point_hierarchy, 2);
    let selection = ClusterSelection::all(&condensed);
    assert_eq!(selection.selected_clusters(), vec![7]);

    let result = label_points(&condensed, &selection).expect("labelling succeeds");
    assert_eq!(result.labels(), &[0; 7]);
    assert_eq!(result.cluster_count(), 1);
    assert_eq!(result.noise_count(), 0);
}

#[rstest]
fn explicit_selection_absorbs_descendants(seven_point_hierarchy: ClusterHierarchy) {
    let condensed = condense(&seven_point_hierarchy, 2);
    let selection = ClusterSelection::from_clusters(&condensed, &[9, 7]).expect("known ids");
    assert!(selection.is_selected(7));
    assert!(!selection.is_selected(9));
    assert!(!selection.is_selected(3));

    let partial = ClusterSelection::from_clusters(&condensed, &[9]).expect("known ids");
    let result = label_points(&condensed, &partial).expect("labelling succeeds");
    assert_eq!(result.labels(), &[NOISE, NOISE, NOISE, NOISE, 0, 0, 0]);
    assert_eq!(result.noise_count(), 4);

    let err = ClusterSelection::from_clusters(&condensed, &[3]).expect_err("points are not clusters");
    assert_eq!(err, HierarchyError::UnknownCluster { cluster: 3 });
}

#[rstest]
fn inputs_from_other_trees_are_rejected(seven_point_hierarchy: ClusterHierarchy) {
    let two_clusters = condense(&seven_point_hierarchy, 2);
    let root_only = condense(&seven_point_hierarchy, 4);

    let err = ClusterSelection::select(&root_only, &Stabilities::compute(&two_clusters))
        .expect_err("stabilities belong to another tree");
    assert_eq!(err.code(), HierarchyErrorCode::SelectionMismatch);

    let err = label_points(&root_only, &ClusterSelection::all(&two_clusters))
        .expect_err("selection belongs to another tree");
    assert_eq!(
        err,
        HierarchyError::SelectionMismatch {
            expected: 1,
            actual: 3,
        }
    );
}

#[rstest]
fn cancellation_stops_condensation(seven_point_hierarchy: ClusterHierarchy) {
    let flag = CancellationFlag::new();
    flag.cancel();
    let ctx = ExecutionContext::sequential().with_termination(&flag);
    let err = CondensedTree::condense(&seven_point_hierarchy, non_zero(2), &ctx)
        .expect_err("cancelled flag must stop condensation");
    assert!(matches!(
        err,
        HierarchyError::Cancelled { source } if source.stage() == Stage::Condensation
    ));
    assert_eq!(err.code(), HierarchyErrorCode::Cancelled);
}

/// Random spanning trees: point `i` attaches to an earlier point.
fn random_tree() -> impl Strategy<Value = (usize, Vec<Edge>)> {
    (1usize..60).prop_flat_map(|points| {
        let attachments = (1..points)
            .map(|point| (0..point, 0u8..12))
            .collect::<Vec<_>>();
        attachments.prop_map(move |choices| {
            let edges = choices
                .into_iter()
                .enumerate()
                .map(|(index, (parent, weight))| {
                    Edge::new(index + 1, parent, f64::from(weight) * 0.25)
                })
                .collect();
            (points, edges)
        })
    })
}

proptest! {
    #![proptest_config(suite_proptest_config(128))]

    #[test]
    fn dendrogram_heights_never_decrease((points, edges) in random_tree()) {
        let hierarchy = ClusterHierarchy::from_edges(points, &edges).expect("random tree");
        let root = hierarchy.root().expect("non-empty");
        prop_assert_eq!(hierarchy.size(root), points);

        let mut seen = vec![0usize; hierarchy.node_count()];
        for node in points..hierarchy.node_count() {
            let (left, right) = hierarchy.children(node).expect("merge node");
            prop_assert!(left < node && right < node);
            prop_assert!(hierarchy.lambda(left) <= hierarchy.lambda(node));
            prop_assert!(hierarchy.lambda(right) <= hierarchy.lambda(node));
            prop_assert_eq!(hierarchy.size(node), hierarchy.size(left) + hierarchy.size(right));
            seen[left] += 1;
            seen[right] += 1;
        }
        prop_assert!(seen[..root].iter().all(|&count| count == 1));
    }

    #[test]
    fn extraction_is_consistent(
        (points, edges) in random_tree(),
        min_cluster_size in 1usize..8,
    ) {
        let hierarchy = ClusterHierarchy::from_edges(points, &edges).expect("random tree");
        let condensed = condense(&hierarchy, min_cluster_size);
        for point in 0..points {
            let cluster = condensed.fell_out_of(point);
            prop_assert!(condensed.contains_cluster(cluster));
            prop_assert!(condensed.point_lambda(point) <= condensed.lambda(cluster));
        }
        for cluster in condensed.clusters() {
            if let Some(parent) = condensed.parent(cluster) {
                prop_assert!(parent < cluster);
                prop_assert!(condensed.size(cluster) >= min_cluster_size);
            }
        }

        let stabilities = Stabilities::compute(&condensed);
        prop_assert!(stabilities.as_slice().iter().all(|&value| value >= 0.0));
        let root = condensed.root().expect("non-empty");
        let direct = root_stability_from_departures(&condensed);
        prop_assert!((stabilities.get(root) - direct).abs() <= 1e-9 * direct.max(1.0));

        let selection = ClusterSelection::select(&condensed, &stabilities).expect("same tree");
        let selected = selection.selected_clusters();
        prop_assert!(!selected.is_empty());
        for &cluster in &selected {
            let mut ancestor = condensed.parent(cluster);
            while let Some(current) = ancestor {
                prop_assert!(!selection.is_selected(current));
                ancestor = condensed.parent(current);
            }
        }

        let result = label_points(&condensed, &selection).expect("labelling succeeds");
        prop_assert_eq!(result.len(), points);
        prop_assert_eq!(result.cluster_count(), selected.len());
    }
}
