//! Axis-aligned bounding boxes over subsets of points.

use std::num::NonZeroUsize;

use rayon::prelude::*;

use crate::points::PointSource;

/// Ranges below this length are scanned on the calling thread.
const PARALLEL_SCAN_THRESHOLD: usize = 4096;

/// Per-dimension `[min, max]` bounds of a point set.
///
/// A box built from no points is empty: every minimum is `+inf` and every
/// maximum `-inf`, so merging it into another box is a no-op.
#[derive(Clone, Debug, PartialEq)]
pub struct Aabb {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl Aabb {
    /// Creates the empty box of the given dimension.
    #[must_use]
    pub fn empty(dimension: usize) -> Self {
        Self {
            min: vec![f64::INFINITY; dimension],
            max: vec![f64::NEG_INFINITY; dimension],
        }
    }

    /// Bounds the points named by `ids` with a single scan.
    #[must_use]
    pub fn create<P: PointSource + ?Sized>(points: &P, ids: &[usize]) -> Self {
        let mut aabb = Self::empty(points.dimension());
        for &id in ids {
            aabb.extend(points.point(id));
        }
        aabb
    }

    /// Bounds the points named by `ids`, splitting the scan across up to
    /// `concurrency` chunks on the current `rayon` pool.
    ///
    /// Produces exactly the bounds of [`Self::create`]; min and max do not
    /// depend on reduction order.
    #[must_use]
    pub fn create_in_parallel<P: PointSource + ?Sized>(
        points: &P,
        ids: &[usize],
        concurrency: NonZeroUsize,
    ) -> Self {
        if concurrency.get() == 1 || ids.len() < PARALLEL_SCAN_THRESHOLD {
            return Self::create(points, ids);
        }
        let chunk = ids.len().div_ceil(concurrency.get());
        let dimension = points.dimension();
        ids.par_chunks(chunk)
            .map(|chunk| Self::create(points, chunk))
            .reduce(
                || Self::empty(dimension),
                |mut left, right| {
                    left.merge(&right);
                    left
                },
            )
    }

    /// Grows the box to include `point`.
    pub fn extend(&mut self, point: &[f64]) {
        for ((min, max), &value) in self.min.iter_mut().zip(&mut self.max).zip(point) {
            *min = min.min(value);
            *max = max.max(value);
        }
    }

    /// Grows the box to include `other`.
    pub fn merge(&mut self, other: &Self) {
        for (min, &other_min) in self.min.iter_mut().zip(&other.min) {
            *min = min.min(other_min);
        }
        for (max, &other_max) in self.max.iter_mut().zip(&other.max) {
            *max = max.max(other_max);
        }
    }

    /// Returns the number of axes.
    #[must_use]
    #[rustfmt::skip]
    pub fn dimension(&self) -> usize { self.min.len() }

    /// Returns `true` when the box bounds no point.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.iter().zip(&self.max).any(|(min, max)| min > max)
    }

    /// Returns the per-axis minima.
    #[must_use]
    #[rustfmt::skip]
    pub fn min(&self) -> &[f64] { &self.min }

    /// Returns the per-axis maxima.
    #[must_use]
    #[rustfmt::skip]
    pub fn max(&self) -> &[f64] { &self.max }

    /// Returns the axis with the widest extent; the lowest index wins ties.
    ///
    /// # Examples
    /// ```
    /// use dendra_core::Aabb;
    ///
    /// let mut aabb = Aabb::empty(3);
    /// aabb.extend(&[0.0, 0.0, 0.0]);
    /// aabb.extend(&[1.0, 4.0, 4.0]);
    /// assert_eq!(aabb.most_spread_dimension(), 1);
    /// ```
    #[must_use]
    pub fn most_spread_dimension(&self) -> usize {
        let mut best = 0;
        let mut best_spread = f64::NEG_INFINITY;
        for (axis, (min, max)) in self.min.iter().zip(&self.max).enumerate() {
            let spread = max - min;
            if spread > best_spread {
                best = axis;
                best_spread = spread;
            }
        }
        best
    }

    /// Returns `true` when `point` lies inside every axis range.
    #[must_use]
    pub fn contains(&self, point: &[f64]) -> bool {
        self.min
            .iter()
            .zip(&self.max)
            .zip(point)
            .all(|((min, max), value)| min <= value && value <= max)
    }

    /// Yields, per axis, how far `point` lies outside the box (0 inside).
    pub fn gaps_to_point<'a>(&'a self, point: &'a [f64]) -> impl Iterator<Item = f64> + 'a {
        self.min
            .iter()
            .zip(&self.max)
            .zip(point)
            .map(|((&min, &max), &value)| axis_gap(min, max, value, value))
    }

    /// Yields, per axis, the separation between two boxes (0 when they
    /// overlap on that axis).
    pub fn gaps_to_box<'a>(&'a self, other: &'a Self) -> impl Iterator<Item = f64> + 'a {
        self.min
            .iter()
            .zip(&self.max)
            .zip(other.min.iter().zip(&other.max))
            .map(|((&min, &max), (&other_min, &other_max))| axis_gap(min, max, other_min, other_max))
    }
}

fn axis_gap(min: f64, max: f64, other_min: f64, other_max: f64) -> f64 {
    if other_max < min {
        min - other_max
    } else if other_min > max {
        other_min - max
    } else {
        0.0
    }
}
