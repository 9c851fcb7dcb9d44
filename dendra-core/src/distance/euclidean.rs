use crate::aabb::Aabb;

use super::Metric;

/// Straight-line (L2) distance.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Euclidean;

fn root_sum_of_squares(values: impl Iterator<Item = f64>) -> f64 {
    values.map(|value| value * value).sum::<f64>().sqrt()
}

impl Metric for Euclidean {
    fn name(&self) -> &str {
        "euclidean"
    }

    fn distance(&self, left: &[f64], right: &[f64]) -> f64 {
        root_sum_of_squares(left.iter().zip(right).map(|(l, r)| l - r))
    }

    fn point_to_box(&self, point: &[f64], aabb: &Aabb) -> f64 {
        root_sum_of_squares(aabb.gaps_to_point(point))
    }

    fn box_to_box(&self, left: &Aabb, right: &Aabb) -> f64 {
        root_sum_of_squares(left.gaps_to_box(right))
    }
}
