//! Shared test utilities for `dendra-core`.

use dendra_test_support::ci::property_test_profile::ProptestRunProfile;
use proptest::{collection::vec, prelude::*, test_runner::Config as ProptestConfig};

use crate::points::DenseMatrix;

/// Builds a standard proptest configuration from the shared CI profile.
///
/// This keeps property suites aligned on the same `PROGTEST_CASES` and
/// `DENDRA_PBT_FORK` interpretation.
#[must_use]
pub(crate) fn suite_proptest_config(default_cases: u32) -> ProptestConfig {
    let profile = ProptestRunProfile::load(default_cases, false);
    ProptestConfig {
        cases: profile.cases(),
        fork: profile.fork(),
        ..ProptestConfig::default()
    }
}

/// Builds a matrix from literal rows, panicking on invalid test data.
pub(crate) fn matrix<const D: usize>(rows: &[[f64; D]]) -> DenseMatrix {
    DenseMatrix::from_rows("test", rows).expect("test rows must be valid")
}

/// Generates `1..=max_points` points of dimension `1..=max_dimension` with
/// coordinates drawn from a small integer grid, so duplicates and ties occur.
pub(crate) fn point_matrix(
    max_points: usize,
    max_dimension: usize,
) -> impl Strategy<Value = DenseMatrix> {
    (1..=max_dimension, 1..=max_points).prop_flat_map(|(dimension, count)| {
        vec(-20i32..=20, dimension * count).prop_map(move |grid| {
            let values = grid.into_iter().map(|value| f64::from(value) * 0.5).collect();
            DenseMatrix::new("generated", dimension, values).expect("generated data is valid")
        })
    })
}
