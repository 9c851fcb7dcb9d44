//! End-to-end tests for the `Hdbscan` pipeline.

mod common;

use common::{RecordingProgress, StopAfter, lattices, nine_points};
use dendra_core::{
    CancellationFlag, DendraError, DenseMatrix, Euclidean, HdbscanBuilder, Manhattan, NOISE,
    NoProgress, RunToCompletion, Stage, TracingProgress, adjusted_rand_index,
    clustering_quality_score,
};
use dendra_test_support::tracing::RecordingLayer;
use rstest::rstest;
use tracing::Level;

fn hdbscan(min_cluster_size: usize, samples: usize, concurrency: usize) -> dendra_core::Hdbscan {
    HdbscanBuilder::new()
        .with_min_cluster_size(min_cluster_size)
        .with_samples(samples)
        .with_concurrency(concurrency)
        .build()
        .expect("configuration must be valid")
}

#[rstest]
#[case::pair(2, 2)]
#[case::triple(3, 3)]
fn separates_two_groups_and_an_outlier(#[case] min_cluster_size: usize, #[case] samples: usize) {
    let result = hdbscan(min_cluster_size, samples, 2)
        .run(&nine_points())
        .expect("run must succeed");
    assert_eq!(result.labels(), &[0, 0, 0, 0, 1, 1, 1, 1, NOISE]);
    assert_eq!(result.cluster_count(), 2);
    assert_eq!(result.noise_count(), 1);
    assert_eq!(result.cluster_sizes(), vec![4, 4]);
}

#[rstest]
fn large_minimum_keeps_a_single_cluster() {
    let result = hdbscan(5, 2, 1)
        .run(&nine_points())
        .expect("run must succeed");
    assert_eq!(result.labels(), &[0; 9]);
    assert_eq!(result.noise_count(), 0);
}

#[rstest]
fn empty_input_yields_empty_result() {
    let empty = DenseMatrix::new("empty", 3, Vec::new()).expect("empty matrix is valid");
    let result = hdbscan(2, 2, 2).run(&empty).expect("run must succeed");
    assert!(result.is_empty());
    assert_eq!(result.cluster_count(), 0);
}

#[rstest]
fn single_point_is_one_cluster() {
    let single = DenseMatrix::from_rows("single", &[[4.0, 2.0]]).expect("row is valid");
    let result = hdbscan(1, 1, 1).run(&single).expect("run must succeed");
    assert_eq!(result.labels(), &[0]);
}

#[rstest]
#[case::leaf_one(1)]
#[case::leaf_eight(8)]
#[case::leaf_larger_than_input(500)]
fn lattice_groups_are_recovered(#[case] leaf_size: usize) {
    let (points, expected) = lattices(5);
    let result = HdbscanBuilder::new()
        .with_min_cluster_size(5)
        .with_samples(5)
        .with_leaf_size(leaf_size)
        .with_concurrency(3)
        .build()
        .expect("configuration must be valid")
        .run(&points)
        .expect("run must succeed");
    let score = clustering_quality_score(&expected, result.labels()).expect("same length");
    assert!((score.ari - 1.0).abs() < 1e-12, "ari = {}", score.ari);
    assert!((score.nmi - 1.0).abs() < 1e-12, "nmi = {}", score.nmi);
    assert_eq!(result.noise_count(), 0);
}

#[rstest]
fn labels_do_not_depend_on_concurrency() {
    let (points, _) = lattices(6);
    let sequential = hdbscan(8, 4, 1).run(&points).expect("run must succeed");
    for concurrency in [2, 4, 7] {
        let parallel = hdbscan(8, 4, concurrency)
            .run(&points)
            .expect("run must succeed");
        assert_eq!(parallel.labels(), sequential.labels(), "concurrency {concurrency}");
    }
}

#[rstest]
fn manhattan_metric_agrees_on_separated_groups() {
    let points = nine_points();
    let euclidean = hdbscan(2, 2, 2)
        .run_with(&points, &Euclidean, &RunToCompletion, &NoProgress)
        .expect("run must succeed");
    let manhattan = hdbscan(2, 2, 2)
        .run_with(&points, &Manhattan, &RunToCompletion, &TracingProgress)
        .expect("run must succeed");
    let ari = adjusted_rand_index(euclidean.labels(), manhattan.labels()).expect("same length");
    assert!((ari - 1.0).abs() < 1e-12);
}

#[rstest]
fn every_stage_reports_completion() {
    let progress = RecordingProgress::default();
    hdbscan(2, 2, 2)
        .run_with(&nine_points(), &Euclidean, &RunToCompletion, &progress)
        .expect("run must succeed");

    let finished = progress.finished.lock().expect("lock").clone();
    assert_eq!(
        finished,
        vec![
            Stage::TreeBuild,
            Stage::CoreDistances,
            Stage::SpanningTree,
            Stage::Hierarchy,
            Stage::Condensation,
            Stage::Extraction,
        ]
    );
    let updates = progress.updates.lock().expect("lock").clone();
    for stage in &finished {
        let percents: Vec<u8> = updates
            .iter()
            .filter(|(seen, _)| seen == stage)
            .map(|&(_, percent)| percent)
            .collect();
        assert!(percents.windows(2).all(|pair| pair[0] < pair[1]), "{stage}: {percents:?}");
        assert_eq!(percents.last(), Some(&100), "{stage}");
    }
}

#[rstest]
fn tripped_flag_stops_before_the_tree_is_built() {
    let flag = CancellationFlag::new();
    flag.cancel();
    let err = hdbscan(2, 2, 2)
        .run_with(&nine_points(), &Euclidean, &flag, &NoProgress)
        .expect_err("cancelled run must fail");
    assert_eq!(err, DendraError::Cancelled { stage: Stage::TreeBuild });
}

#[rstest]
#[case(1)]
#[case(5)]
#[case(40)]
fn cancellation_mid_run_reports_a_stage(#[case] polls: usize) {
    let (points, _) = lattices(4);
    let err = hdbscan(4, 4, 2)
        .run_with(&points, &Euclidean, &StopAfter::new(polls), &NoProgress)
        .expect_err("flag stops the run");
    assert!(err.cancelled_stage().is_some(), "unexpected error {err}");
}

#[rstest]
fn run_records_stage_spans() {
    let (layer, _guard) = RecordingLayer::install();
    let result = hdbscan(2, 2, 2)
        .run(&nine_points())
        .expect("run must succeed");
    assert_eq!(result.cluster_count(), 2);

    let run = layer.spans_named("core.run").pop().expect("core.run span");
    assert_eq!(run.field("data_source"), Some("nine-points"));
    assert_eq!(run.field("points"), Some("9"));
    assert_eq!(run.field("dimension"), Some("2"));
    assert_eq!(run.field("min_cluster_size"), Some("2"));
    assert_eq!(run.field("concurrency"), Some("2"));

    for name in [
        "core.kdtree",
        "core.core_distances",
        "core.mst",
        "core.hierarchy",
        "core.condense",
    ] {
        assert_eq!(layer.spans_named(name).len(), 1, "{name}");
    }
    let completed = layer
        .events_at(Level::INFO)
        .into_iter()
        .find(|event| event.message() == Some("clustering completed"))
        .expect("completion event");
    assert_eq!(completed.fields.get("clusters").map(String::as_str), Some("2"));
    assert_eq!(completed.fields.get("noise").map(String::as_str), Some("1"));
}

#[rstest]
fn empty_input_logs_a_warning() {
    let (layer, _guard) = RecordingLayer::install();
    let empty = DenseMatrix::new("nothing", 2, Vec::new()).expect("empty matrix is valid");
    hdbscan(2, 2, 1).run(&empty).expect("run must succeed");
    let warnings = layer.events_at(Level::WARN);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message(), Some("point source is empty"));
}
