//! Flat clustering output.

/// Label assigned to points that belong to no selected cluster.
pub const NOISE: i64 = -1;

/// One label per point plus summary counts.
///
/// Cluster labels are contiguous from `0`; [`NOISE`] marks unclustered points.
///
/// # Examples
/// ```
/// use dendra_core::{ClusteringResult, NOISE};
///
/// let result = ClusteringResult::from_labels(vec![0, 0, 1, NOISE]);
/// assert_eq!(result.cluster_count(), 2);
/// assert_eq!(result.noise_count(), 1);
/// assert_eq!(result.cluster_sizes(), vec![2, 1]);
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClusteringResult {
    labels: Vec<i64>,
    cluster_count: usize,
    noise_count: usize,
}

impl ClusteringResult {
    /// Returns the result for an empty dataset.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            labels: Vec::new(),
            cluster_count: 0,
            noise_count: 0,
        }
    }

    /// Wraps labels, deriving the counts from them.
    ///
    /// The cluster count is one more than the largest label, so labels are
    /// expected to be contiguous. Every negative label counts as noise.
    #[must_use]
    pub fn from_labels(labels: Vec<i64>) -> Self {
        let cluster_count = labels
            .iter()
            .filter_map(|&label| usize::try_from(label).ok())
            .max()
            .map_or(0, |max| max + 1);
        let noise_count = labels.iter().filter(|&&label| label < 0).count();
        Self {
            labels,
            cluster_count,
            noise_count,
        }
    }

    /// Returns the label of every point.
    #[must_use]
    #[rustfmt::skip]
    pub fn labels(&self) -> &[i64] { &self.labels }

    /// Consumes the result and returns the labels.
    #[must_use]
    pub fn into_labels(self) -> Vec<i64> {
        self.labels
    }

    /// Returns the number of distinct clusters.
    #[must_use]
    #[rustfmt::skip]
    pub fn cluster_count(&self) -> usize { self.cluster_count }

    /// Returns the number of noise points.
    #[must_use]
    #[rustfmt::skip]
    pub fn noise_count(&self) -> usize { self.noise_count }

    /// Returns the number of points.
    #[must_use]
    #[rustfmt::skip]
    pub fn len(&self) -> usize { self.labels.len() }

    /// Returns `true` for an empty dataset.
    #[must_use]
    #[rustfmt::skip]
    pub fn is_empty(&self) -> bool { self.labels.is_empty() }

    /// Returns the number of points carrying each cluster label.
    #[must_use]
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.cluster_count];
        for &label in &self.labels {
            if let Ok(index) = usize::try_from(label) {
                sizes[index] += 1;
            }
        }
        sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case(vec![], 0, 0)]
    #[case(vec![NOISE, NOISE], 0, 2)]
    #[case(vec![0, 1, 2, 1], 3, 0)]
    #[case(vec![1, NOISE, 0], 2, 1)]
    fn counts_follow_labels(
        #[case] labels: Vec<i64>,
        #[case] clusters: usize,
        #[case] noise: usize,
    ) {
        let result = ClusteringResult::from_labels(labels);
        assert_eq!(result.cluster_count(), clusters);
        assert_eq!(result.noise_count(), noise);
        assert_eq!(result.cluster_sizes().iter().sum::<usize>() + noise, result.len());
    }

    #[test]
    fn empty_result_has_no_points() {
        let result = ClusteringResult::empty();
        assert!(result.is_empty());
        assert_eq!(result, ClusteringResult::from_labels(Vec::new()));
    }
}
