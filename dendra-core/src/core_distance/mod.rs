//! Per-point core distances and the neighbours that produced them.
//!
//! The spanning tree stage consumes core distances through the
//! [`CoreResult`] trait. [`CoreDistances::compute`] derives them with exact
//! k-nearest-neighbour queries over the k-d tree; callers holding
//! precomputed values wrap them with [`CoreDistances::from_parts`].

mod knn;

use thiserror::Error;

use crate::{distance::DistanceError, execution::Cancelled};

/// A point known to lie within another point's core distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbour {
    /// Id of the neighbouring point.
    pub id: usize,
    /// Distance between the two points.
    pub distance: f64,
}

impl Neighbour {
    /// Creates a neighbour entry.
    #[must_use]
    pub const fn new(id: usize, distance: f64) -> Self {
        Self { id, distance }
    }
}

/// Source of core distances for the mutual reachability spanning tree.
///
/// # Examples
/// ```
/// use dendra_core::{CoreResult, ZeroCores};
///
/// assert_eq!(ZeroCores.core_distance(3), 0.0);
/// assert!(ZeroCores.neighbours_of(3).is_empty());
/// ```
pub trait CoreResult: Sync {
    /// Returns the core distance of point `id`.
    fn core_distance(&self, id: usize) -> f64;

    /// Returns neighbours known to lie within the core distance of `id`.
    ///
    /// The list may be empty; it only seeds spanning tree candidates.
    fn neighbours_of(&self, id: usize) -> &[Neighbour];
}

/// Core result where every core distance is zero.
///
/// Mutual reachability then equals the plain metric distance.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ZeroCores;

impl CoreResult for ZeroCores {
    fn core_distance(&self, _id: usize) -> f64 {
        0.0
    }

    fn neighbours_of(&self, _id: usize) -> &[Neighbour] {
        &[]
    }
}

/// Errors raised while computing or validating core distances.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum CoreDistanceError {
    /// The metric produced an unusable distance.
    #[error(transparent)]
    InvalidDistance {
        /// Underlying metric failure.
        #[from]
        source: DistanceError,
    },
    /// The termination flag stopped the neighbour search.
    #[error(transparent)]
    Cancelled {
        /// Cancellation raised by the execution context.
        #[from]
        source: Cancelled,
    },
    /// Distance and neighbour tables describe different point counts.
    #[error("{distances} core distances were supplied for {neighbours} neighbour lists")]
    LengthMismatch {
        /// Number of core distances.
        distances: usize,
        /// Number of neighbour lists.
        neighbours: usize,
    },
    /// A core distance was NaN, infinite, or negative.
    #[error("core distance of point {point} is invalid: {value}")]
    InvalidCoreDistance {
        /// Offending point.
        point: usize,
        /// Offending value.
        value: f64,
    },
    /// A neighbour list referenced a point outside the data set.
    #[error("point {point} lists neighbour {neighbour} but only {len} points exist")]
    NeighbourOutOfRange {
        /// Point owning the neighbour list.
        point: usize,
        /// Offending neighbour id.
        neighbour: usize,
        /// Number of points.
        len: usize,
    },
}

impl CoreDistanceError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> CoreDistanceErrorCode {
        match self {
            Self::InvalidDistance { .. } => CoreDistanceErrorCode::InvalidDistance,
            Self::Cancelled { .. } => CoreDistanceErrorCode::Cancelled,
            Self::LengthMismatch { .. } => CoreDistanceErrorCode::LengthMismatch,
            Self::InvalidCoreDistance { .. } => CoreDistanceErrorCode::InvalidCoreDistance,
            Self::NeighbourOutOfRange { .. } => CoreDistanceErrorCode::NeighbourOutOfRange,
        }
    }
}

/// Machine-readable error codes for [`CoreDistanceError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CoreDistanceErrorCode {
    /// The metric produced an unusable distance.
    InvalidDistance,
    /// The termination flag stopped the neighbour search.
    Cancelled,
    /// Distance and neighbour tables describe different point counts.
    LengthMismatch,
    /// A core distance was NaN, infinite, or negative.
    InvalidCoreDistance,
    /// A neighbour list referenced a point outside the data set.
    NeighbourOutOfRange,
}

impl CoreDistanceErrorCode {
    /// Returns the symbolic identifier for logging and metrics surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidDistance => "CORE_DISTANCE_INVALID_DISTANCE",
            Self::Cancelled => "CORE_DISTANCE_CANCELLED",
            Self::LengthMismatch => "CORE_DISTANCE_LENGTH_MISMATCH",
            Self::InvalidCoreDistance => "CORE_DISTANCE_INVALID_VALUE",
            Self::NeighbourOutOfRange => "CORE_DISTANCE_NEIGHBOUR_OUT_OF_RANGE",
        }
    }
}

/// Dense table of core distances with flattened neighbour lists.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoreDistances {
    distances: Vec<f64>,
    offsets: Vec<usize>,
    neighbours: Vec<Neighbour>,
}

impl CoreDistances {
    /// Wraps precomputed core distances and neighbour lists.
    ///
    /// # Errors
    /// Returns [`CoreDistanceError::LengthMismatch`] when the tables differ in
    /// length, [`CoreDistanceError::InvalidCoreDistance`] for NaN, infinite, or
    /// negative core distances, [`CoreDistanceError::NeighbourOutOfRange`] for
    /// unknown neighbour ids, and [`CoreDistanceError::InvalidDistance`] for
    /// NaN or negative neighbour distances.
    pub fn from_parts(
        distances: Vec<f64>,
        neighbours: Vec<Vec<Neighbour>>,
    ) -> Result<Self, CoreDistanceError> {
        let len = distances.len();
        if neighbours.len() != len {
            return Err(CoreDistanceError::LengthMismatch {
                distances: len,
                neighbours: neighbours.len(),
            });
        }
        if let Some((point, &value)) = distances
            .iter()
            .enumerate()
            .find(|(_, value)| !value.is_finite() || **value < 0.0)
        {
            return Err(CoreDistanceError::InvalidCoreDistance { point, value });
        }
        for (point, list) in neighbours.iter().enumerate() {
            for neighbour in list {
                if neighbour.id >= len {
                    return Err(CoreDistanceError::NeighbourOutOfRange {
                        point,
                        neighbour: neighbour.id,
                        len,
                    });
                }
                if neighbour.distance.is_nan() || neighbour.distance < 0.0 {
                    return Err(DistanceError::Invalid {
                        left: point,
                        right: neighbour.id,
                        value: neighbour.distance,
                    }
                    .into());
                }
            }
        }
        Ok(Self::flatten(distances, neighbours))
    }

    fn flatten(distances: Vec<f64>, neighbours: Vec<Vec<Neighbour>>) -> Self {
        let mut offsets = Vec::with_capacity(neighbours.len() + 1);
        offsets.push(0);
        let mut flat = Vec::with_capacity(neighbours.iter().map(Vec::len).sum());
        for list in neighbours {
            flat.extend(list);
            offsets.push(flat.len());
        }
        Self {
            distances,
            offsets,
            neighbours: flat,
        }
    }

    /// Returns the core distance of every point.
    #[must_use]
    #[rustfmt::skip]
    pub fn distances(&self) -> &[f64] { &self.distances }

    /// Returns the number of points.
    #[must_use]
    #[rustfmt::skip]
    pub fn len(&self) -> usize { self.distances.len() }

    /// Returns `true` when no point is described.
    #[must_use]
    #[rustfmt::skip]
    pub fn is_empty(&self) -> bool { self.distances.is_empty() }
}

impl CoreResult for CoreDistances {
    fn core_distance(&self, id: usize) -> f64 {
        self.distances[id]
    }

    fn neighbours_of(&self, id: usize) -> &[Neighbour] {
        &self.neighbours[self.offsets[id]..self.offsets[id + 1]]
    }
}
