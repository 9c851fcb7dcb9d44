//! Builder utilities for configuring [`Hdbscan`] runs.

use std::num::NonZeroUsize;

use crate::{Result, error::DendraError, hdbscan::Hdbscan};

/// Configures and constructs [`Hdbscan`] instances.
///
/// # Examples
/// ```
/// use dendra_core::HdbscanBuilder;
///
/// let hdbscan = HdbscanBuilder::new()
///     .with_min_cluster_size(8)
///     .with_concurrency(2)
///     .build()
///     .expect("builder configuration is valid");
/// assert_eq!(hdbscan.min_cluster_size().get(), 8);
/// assert_eq!(hdbscan.concurrency().get(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct HdbscanBuilder {
    min_cluster_size: usize,
    samples: usize,
    leaf_size: usize,
    concurrency: usize,
}

impl Default for HdbscanBuilder {
    fn default() -> Self {
        Self {
            min_cluster_size: 5,
            samples: 10,
            leaf_size: 1,
            concurrency: 4,
        }
    }
}

impl HdbscanBuilder {
    /// Creates a builder populated with default parameters.
    ///
    /// # Examples
    /// ```
    /// use dendra_core::HdbscanBuilder;
    ///
    /// let builder = HdbscanBuilder::new();
    /// assert_eq!(builder.min_cluster_size(), 5);
    /// assert_eq!(builder.samples(), 10);
    /// assert_eq!(builder.leaf_size(), 1);
    /// assert_eq!(builder.concurrency(), 4);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the smallest group of points reported as a cluster.
    #[must_use]
    pub fn with_min_cluster_size(mut self, size: usize) -> Self {
        self.min_cluster_size = size;
        self
    }

    /// Returns the configured minimum cluster size.
    #[must_use]
    pub fn min_cluster_size(&self) -> usize {
        self.min_cluster_size
    }

    /// Overrides the neighbour count that defines each point's core distance.
    #[must_use]
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    /// Returns the configured neighbour count.
    #[must_use]
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Overrides the k-d tree leaf capacity.
    #[must_use]
    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size;
        self
    }

    /// Returns the configured leaf capacity.
    #[must_use]
    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Overrides the number of worker threads.
    ///
    /// # Examples
    /// ```
    /// use dendra_core::HdbscanBuilder;
    ///
    /// let builder = HdbscanBuilder::new().with_concurrency(1);
    /// assert_eq!(builder.concurrency(), 1);
    /// ```
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Returns the configured worker count.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Validates the configuration and constructs an [`Hdbscan`] instance.
    ///
    /// # Errors
    /// Returns the matching `DendraError::Invalid*` variant when any
    /// parameter is zero.
    ///
    /// # Examples
    /// ```
    /// use dendra_core::{DendraError, HdbscanBuilder};
    ///
    /// let err = HdbscanBuilder::new().with_samples(0).build().unwrap_err();
    /// assert_eq!(err, DendraError::InvalidSamples { got: 0 });
    /// ```
    pub fn build(self) -> Result<Hdbscan> {
        let min_cluster_size = NonZeroUsize::new(self.min_cluster_size).ok_or(
            DendraError::InvalidMinClusterSize {
                got: self.min_cluster_size,
            },
        )?;
        let samples = NonZeroUsize::new(self.samples)
            .ok_or(DendraError::InvalidSamples { got: self.samples })?;
        let leaf_size = NonZeroUsize::new(self.leaf_size).ok_or(DendraError::InvalidLeafSize {
            got: self.leaf_size,
        })?;
        let concurrency = NonZeroUsize::new(self.concurrency).ok_or(
            DendraError::InvalidConcurrency {
                got: self.concurrency,
            },
        )?;

        Ok(Hdbscan::new(min_cluster_size, samples, leaf_size, concurrency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    use crate::error::DendraErrorCode;

    #[rstest]
    #[case(HdbscanBuilder::new().with_min_cluster_size(0), DendraErrorCode::InvalidMinClusterSize)]
    #[case(HdbscanBuilder::new().with_samples(0), DendraErrorCode::InvalidSamples)]
    #[case(HdbscanBuilder::new().with_leaf_size(0), DendraErrorCode::InvalidLeafSize)]
    #[case(HdbscanBuilder::new().with_concurrency(0), DendraErrorCode::InvalidConcurrency)]
    fn zero_parameters_are_rejected(
        #[case] builder: HdbscanBuilder,
        #[case] expected: DendraErrorCode,
    ) {
        let err = builder.build().expect_err("zero must be rejected");
        assert_eq!(err.code(), expected);
    }

    #[test]
    fn valid_configuration_is_carried_over() {
        let hdbscan = HdbscanBuilder::new()
            .with_min_cluster_size(2)
            .with_samples(3)
            .with_leaf_size(16)
            .with_concurrency(1)
            .build()
            .expect("configuration is valid");
        assert_eq!(hdbscan.min_cluster_size().get(), 2);
        assert_eq!(hdbscan.samples().get(), 3);
        assert_eq!(hdbscan.leaf_size().get(), 16);
        assert_eq!(hdbscan.concurrency().get(), 1);
    }
}
