use crate::aabb::Aabb;

use super::Metric;

/// Taxicab (L1) distance.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Manhattan;

impl Metric for Manhattan {
    fn name(&self) -> &str {
        "manhattan"
    }

    fn distance(&self, left: &[f64], right: &[f64]) -> f64 {
        left.iter().zip(right).map(|(l, r)| (l - r).abs()).sum()
    }

    fn point_to_box(&self, point: &[f64], aabb: &Aabb) -> f64 {
        aabb.gaps_to_point(point).sum()
    }

    fn box_to_box(&self, left: &Aabb, right: &Aabb) -> f64 {
        left.gaps_to_box(right).sum()
    }
}
