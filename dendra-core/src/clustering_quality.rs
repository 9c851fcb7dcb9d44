//! Agreement scores between two labellings of the same points.
//!
//! Adjusted Rand index (ARI) and normalised mutual information (NMI) are both
//! invariant under label permutation. Noise is treated as one more label, so
//! two runs that agree on which points are noise score higher than runs that
//! disagree.

use std::collections::HashMap;

use thiserror::Error;

/// ARI and NMI values computed from two labellings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusteringQualityScore {
    /// Adjusted Rand index in `[-1.0, 1.0]`.
    pub ari: f64,
    /// Normalised mutual information in `[0.0, 1.0]`.
    pub nmi: f64,
}

/// Errors raised while comparing labellings.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ClusteringQualityError {
    /// The labellings covered different numbers of points.
    #[error("label length mismatch: expected={expected}, actual={actual}")]
    LabelLengthMismatch {
        /// Number of reference labels.
        expected: usize,
        /// Number of compared labels.
        actual: usize,
    },
}

struct Contingency {
    points: usize,
    left: HashMap<i64, usize>,
    right: HashMap<i64, usize>,
    joint: HashMap<(i64, i64), usize>,
}

impl Contingency {
    fn build(expected: &[i64], actual: &[i64]) -> Result<Self, ClusteringQualityError> {
        if expected.len() != actual.len() {
            return Err(ClusteringQualityError::LabelLengthMismatch {
                expected: expected.len(),
                actual: actual.len(),
            });
        }
        let mut table = Self {
            points: expected.len(),
            left: HashMap::new(),
            right: HashMap::new(),
            joint: HashMap::new(),
        };
        for (&left, &right) in expected.iter().zip(actual) {
            *table.left.entry(left).or_insert(0) += 1;
            *table.right.entry(right).or_insert(0) += 1;
            *table.joint.entry((left, right)).or_insert(0) += 1;
        }
        Ok(table)
    }

    fn adjusted_rand_index(&self) -> f64 {
        let total = pairs(self.points);
        if total == 0.0 {
            return 1.0;
        }
        let agreeing: f64 = self.joint.values().copied().map(pairs).sum();
        let left: f64 = self.left.values().copied().map(pairs).sum();
        let right: f64 = self.right.values().copied().map(pairs).sum();

        let expected = left * right / total;
        let denominator = 0.5 * (left + right) - expected;
        if denominator == 0.0 {
            1.0
        } else {
            (agreeing - expected) / denominator
        }
    }

    fn normalized_mutual_information(&self) -> f64 {
        if self.points == 0 {
            return 1.0;
        }
        let points = self.points as f64;
        let mutual_information: f64 = self
            .joint
            .iter()
            .map(|(&(left, right), &count)| {
                let count = count as f64;
                let left = self.left.get(&left).copied().unwrap_or(0) as f64;
                let right = self.right.get(&right).copied().unwrap_or(0) as f64;
                (count / points) * ((count * points) / (left * right)).ln()
            })
            .sum();
        let left_entropy = entropy(&self.left, points);
        let right_entropy = entropy(&self.right, points);

        match (left_entropy == 0.0, right_entropy == 0.0) {
            (true, true) => 1.0,
            (true, false) | (false, true) => 0.0,
            (false, false) => mutual_information / (left_entropy * right_entropy).sqrt(),
        }
    }
}

fn pairs(count: usize) -> f64 {
    let count = count as f64;
    count * (count - 1.0) / 2.0
}

fn entropy(counts: &HashMap<i64, usize>, points: f64) -> f64 {
    counts
        .values()
        .map(|&count| {
            let probability = count as f64 / points;
            -probability * probability.ln()
        })
        .sum()
}

/// Computes the adjusted Rand index of two labellings.
///
/// # Errors
/// Returns [`ClusteringQualityError::LabelLengthMismatch`] when the
/// labellings have different lengths.
///
/// # Examples
/// ```
/// use dendra_core::adjusted_rand_index;
///
/// let score = adjusted_rand_index(&[0, 0, 1, 1, -1], &[1, 1, 0, 0, -1])?;
/// assert!((score - 1.0).abs() < 1e-12);
/// # Ok::<(), dendra_core::ClusteringQualityError>(())
/// ```
pub fn adjusted_rand_index(
    expected: &[i64],
    actual: &[i64],
) -> Result<f64, ClusteringQualityError> {
    Ok(Contingency::build(expected, actual)?.adjusted_rand_index())
}

/// Computes the normalised mutual information of two labellings.
///
/// # Errors
/// Returns [`ClusteringQualityError::LabelLengthMismatch`] when the
/// labellings have different lengths.
pub fn normalized_mutual_information(
    expected: &[i64],
    actual: &[i64],
) -> Result<f64, ClusteringQualityError> {
    Ok(Contingency::build(expected, actual)?.normalized_mutual_information())
}

/// Computes ARI and NMI from one contingency table.
///
/// # Errors
/// Returns [`ClusteringQualityError::LabelLengthMismatch`] when the
/// labellings have different lengths.
pub fn clustering_quality_score(
    expected: &[i64],
    actual: &[i64],
) -> Result<ClusteringQualityScore, ClusteringQualityError> {
    let table = Contingency::build(expected, actual)?;
    Ok(ClusteringQualityScore {
        ari: table.adjusted_rand_index(),
        nmi: table.normalized_mutual_information(),
    })
}
