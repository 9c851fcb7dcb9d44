//! Distance metrics over point coordinates.
//!
//! A [`Metric`] provides the exact point-to-point distance together with
//! lower bounds from a point to a box and between two boxes. Pruning in the
//! k-nearest-neighbour search and the dual-tree spanning tree relies on those
//! bounds never exceeding the distance to any point inside the box.

mod euclidean;
mod manhattan;

pub use self::euclidean::Euclidean;
pub use self::manhattan::Manhattan;

use thiserror::Error;

use crate::{aabb::Aabb, error::define_error_codes, points::PointSource};

/// A distance function with sound box lower bounds.
///
/// # Examples
/// ```
/// use dendra_core::{Aabb, Euclidean, Metric};
///
/// let mut aabb = Aabb::empty(2);
/// aabb.extend(&[3.0, 0.0]);
/// aabb.extend(&[4.0, 1.0]);
/// assert_eq!(Euclidean.distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
/// assert_eq!(Euclidean.point_to_box(&[0.0, 0.0], &aabb), 3.0);
/// ```
pub trait Metric: Sync {
    /// Returns a short identifier used in logs.
    fn name(&self) -> &str;

    /// Returns the distance between two points of equal dimension.
    fn distance(&self, left: &[f64], right: &[f64]) -> f64;

    /// Returns a lower bound on the distance from `point` to any point inside
    /// `aabb`; zero when `point` lies inside the box.
    fn point_to_box(&self, point: &[f64], aabb: &Aabb) -> f64;

    /// Returns a lower bound on the distance between any point of `left` and
    /// any point of `right`.
    fn box_to_box(&self, left: &Aabb, right: &Aabb) -> f64;
}

impl<M: Metric + ?Sized> Metric for &M {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn distance(&self, left: &[f64], right: &[f64]) -> f64 {
        (**self).distance(left, right)
    }

    fn point_to_box(&self, point: &[f64], aabb: &Aabb) -> f64 {
        (**self).point_to_box(point, aabb)
    }

    fn box_to_box(&self, left: &Aabb, right: &Aabb) -> f64 {
        (**self).box_to_box(left, right)
    }
}

/// Errors raised when a metric returns an unusable value.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum DistanceError {
    /// The metric produced a NaN or negative distance.
    #[error("distance between points {left} and {right} is invalid: {value}")]
    Invalid {
        /// First point id.
        left: usize,
        /// Second point id.
        right: usize,
        /// Offending value.
        value: f64,
    },
}

define_error_codes! {
    /// Stable codes describing [`DistanceError`] variants.
    enum DistanceErrorCode for DistanceError {
        /// The metric produced a NaN or negative distance.
        Invalid => Invalid { .. } => "DISTANCE_INVALID",
    }
}

/// Computes the distance between two points and rejects NaN or negative
/// results.
pub(crate) fn checked_distance<P, M>(
    points: &P,
    metric: &M,
    left: usize,
    right: usize,
) -> Result<f64, DistanceError>
where
    P: PointSource + ?Sized,
    M: Metric + ?Sized,
{
    let value = metric.distance(points.point(left), points.point(right));
    if value.is_nan() || value < 0.0 {
        return Err(DistanceError::Invalid { left, right, value });
    }
    Ok(value)
}
