//! Point accessors consumed by the clustering pipeline.

use std::sync::Arc;

use thiserror::Error;

use crate::error::define_error_codes;

/// Fixed-dimension collection of points addressed by dense ids.
///
/// # Examples
/// ```
/// use dendra_core::{DenseMatrix, PointSource};
///
/// let matrix = DenseMatrix::from_rows("demo", &[vec![0.0, 1.0], vec![2.0, 3.0]])?;
/// assert_eq!(matrix.len(), 2);
/// assert_eq!(matrix.dimension(), 2);
/// assert_eq!(matrix.point(1), &[2.0, 3.0]);
/// # Ok::<(), dendra_core::PointSourceError>(())
/// ```
pub trait PointSource: Sync {
    /// Returns the number of points.
    fn len(&self) -> usize;

    /// Returns whether the source holds no points.
    #[must_use]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the shared dimension of every point.
    fn dimension(&self) -> usize;

    /// Returns the coordinates of point `id`.
    ///
    /// # Panics
    /// Implementations may panic when `id >= self.len()`; the pipeline only
    /// requests ids below [`Self::len`].
    fn point(&self, id: usize) -> &[f64];

    /// Returns a human-readable name used in logs.
    fn name(&self) -> &str;
}

/// Errors raised while validating point data.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum PointSourceError {
    /// Points must have at least one coordinate.
    #[error("points must have positive dimension")]
    ZeroDimension,
    /// The flat buffer length was not a multiple of the dimension.
    #[error("buffer of {len} values cannot be split into rows of {dimension}")]
    RaggedData {
        /// Length of the flat buffer.
        len: usize,
        /// Requested dimension.
        dimension: usize,
    },
    /// A row had a different width from the first row.
    #[error("row {row} has {actual} values but {expected} were expected")]
    DimensionMismatch {
        /// Offending row.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        actual: usize,
    },
    /// A coordinate was NaN or infinite.
    #[error("coordinate {axis} of point {point} is not finite")]
    NonFiniteCoordinate {
        /// Offending point id.
        point: usize,
        /// Offending axis.
        axis: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`PointSourceError`] variants.
    enum PointSourceErrorCode for PointSourceError {
        /// Points must have at least one coordinate.
        ZeroDimension => ZeroDimension => "POINTS_ZERO_DIMENSION",
        /// The flat buffer length was not a multiple of the dimension.
        RaggedData => RaggedData { .. } => "POINTS_RAGGED_DATA",
        /// A row had a different width from the first row.
        DimensionMismatch => DimensionMismatch { .. } => "POINTS_DIMENSION_MISMATCH",
        /// A coordinate was NaN or infinite.
        NonFiniteCoordinate => NonFiniteCoordinate { .. } => "POINTS_NON_FINITE_COORDINATE",
    }
}

/// Row-major in-memory point matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix {
    name: Arc<str>,
    dimension: usize,
    values: Vec<f64>,
}

impl DenseMatrix {
    /// Wraps a row-major buffer of `values.len() / dimension` points.
    ///
    /// # Errors
    /// Returns [`PointSourceError::ZeroDimension`] when `dimension == 0`,
    /// [`PointSourceError::RaggedData`] when the buffer cannot be split into
    /// whole rows, and [`PointSourceError::NonFiniteCoordinate`] for NaN or
    /// infinite coordinates.
    pub fn new(
        name: impl Into<Arc<str>>,
        dimension: usize,
        values: Vec<f64>,
    ) -> Result<Self, PointSourceError> {
        if dimension == 0 {
            return Err(PointSourceError::ZeroDimension);
        }
        if values.len() % dimension != 0 {
            return Err(PointSourceError::RaggedData {
                len: values.len(),
                dimension,
            });
        }
        if let Some(index) = values.iter().position(|value| !value.is_finite()) {
            return Err(PointSourceError::NonFiniteCoordinate {
                point: index / dimension,
                axis: index % dimension,
            });
        }
        Ok(Self {
            name: name.into(),
            dimension,
            values,
        })
    }

    /// Builds a matrix from equally sized rows.
    ///
    /// An empty slice yields an empty one-dimensional matrix.
    ///
    /// # Errors
    /// Returns [`PointSourceError::DimensionMismatch`] for ragged rows plus
    /// the errors documented on [`Self::new`].
    pub fn from_rows<R: AsRef<[f64]>>(
        name: impl Into<Arc<str>>,
        rows: &[R],
    ) -> Result<Self, PointSourceError> {
        let Some(first) = rows.first() else {
            return Self::new(name, 1, Vec::new());
        };
        let expected = first.as_ref().len();
        let mut values = Vec::with_capacity(expected.saturating_mul(rows.len()));
        for (row, values_in_row) in rows.iter().enumerate() {
            let values_in_row = values_in_row.as_ref();
            if values_in_row.len() != expected {
                return Err(PointSourceError::DimensionMismatch {
                    row,
                    expected,
                    actual: values_in_row.len(),
                });
            }
            values.extend_from_slice(values_in_row);
        }
        Self::new(name, expected, values)
    }
}

impl PointSource for DenseMatrix {
    fn len(&self) -> usize {
        self.values.len() / self.dimension
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn point(&self, id: usize) -> &[f64] {
        let start = id * self.dimension;
        &self.values[start..start + self.dimension]
    }

    fn name(&self) -> &str {
        &self.name
    }
}
