//! Point set generators for spanning tree property tests.

use proptest::prelude::*;
use rand::{Rng, SeedableRng, rngs::SmallRng};

use crate::points::DenseMatrix;

use super::types::{MstFixture, PointLayout};

const MIN_POINTS: usize = 2;
const MAX_POINTS: usize = 80;

/// Generates fixtures across every [`PointLayout`].
pub(super) fn mst_fixture_strategy() -> impl Strategy<Value = MstFixture> {
    (
        prop_oneof![
            Just(PointLayout::Uniform),
            Just(PointLayout::Clustered),
            Just(PointLayout::Lattice),
            Just(PointLayout::Duplicated),
            Just(PointLayout::Collinear),
        ],
        any::<u64>(),
    )
        .prop_map(|(layout, seed)| {
            let mut rng = SmallRng::seed_from_u64(seed);
            generate_fixture(layout, &mut rng)
        })
}

/// Generates a fixture for a specific layout.
pub(super) fn generate_fixture(layout: PointLayout, rng: &mut SmallRng) -> MstFixture {
    let count = rng.gen_range(MIN_POINTS..=MAX_POINTS);
    let dimension: usize = rng.gen_range(1..=3);
    let rows: Vec<Vec<f64>> = match layout {
        PointLayout::Uniform => (0..count)
            .map(|_| (0..dimension).map(|_| rng.gen_range(-50.0..50.0)).collect())
            .collect(),
        PointLayout::Clustered => {
            let centres: Vec<Vec<f64>> = (0..rng.gen_range(1..=4))
                .map(|_| (0..dimension).map(|_| rng.gen_range(-100.0..100.0)).collect())
                .collect();
            (0..count)
                .map(|index| {
                    centres[index % centres.len()]
                        .iter()
                        .map(|centre| centre + rng.gen_range(-1.0..1.0))
                        .collect()
                })
                .collect()
        }
        PointLayout::Lattice => (0..count)
            .map(|_| (0..dimension).map(|_| f64::from(rng.gen_range(0_i32..5))).collect())
            .collect(),
        PointLayout::Duplicated => {
            let distinct = (count / 3).max(1);
            let base: Vec<Vec<f64>> = (0..distinct)
                .map(|_| (0..dimension).map(|_| rng.gen_range(-10.0..10.0)).collect())
                .collect();
            (0..count).map(|index| base[index % distinct].clone()).collect()
        }
        PointLayout::Collinear => (0..count)
            .map(|_| {
                let t: f64 = rng.gen_range(0.0..20.0);
                (0..dimension).map(|axis| t * (axis as f64 + 1.0)).collect()
            })
            .collect(),
    };
    MstFixture {
        points: DenseMatrix::from_rows("generated", &rows).expect("generated rows are valid"),
        samples: rng.gen_range(1..=5),
        leaf_size: rng.gen_range(1..=6),
        layout,
    }
}
