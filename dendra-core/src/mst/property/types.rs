//! Type definitions for spanning tree property tests.

use crate::points::DenseMatrix;

/// Spatial layout of generated points.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum PointLayout {
    /// Points drawn uniformly from a box.
    Uniform,
    /// Tight blobs around a few random centres.
    Clustered,
    /// Integer lattice coordinates, producing many equal distances.
    Lattice,
    /// Every point repeated several times.
    Duplicated,
    /// Points along a line, stressing degenerate boxes.
    Collinear,
}

/// Generated input with the parameters used to build it.
#[derive(Clone, Debug)]
pub(super) struct MstFixture {
    /// Points to span.
    pub points: DenseMatrix,
    /// Neighbour count for core distances.
    pub samples: usize,
    /// K-d tree leaf capacity.
    pub leaf_size: usize,
    /// Layout used during generation.
    pub layout: PointLayout,
}
