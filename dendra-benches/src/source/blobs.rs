//! Uniform and Gaussian blob generators.

use std::f64::consts::PI;

use dendra_core::DenseMatrix;
use rand::{Rng, SeedableRng, rngs::SmallRng};

use super::SyntheticError;

/// Uniform random points in the unit hypercube.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    /// Number of points to generate.
    pub point_count: usize,
    /// Dimensionality of each point.
    pub dimensions: usize,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

/// Isotropic Gaussian clusters placed on a circle.
#[derive(Clone, Debug)]
pub struct GaussianBlobConfig {
    /// Number of points to generate.
    pub point_count: usize,
    /// Dimensionality of each point.
    pub dimensions: usize,
    /// Number of Gaussian clusters.
    pub cluster_count: usize,
    /// Radius of the circle holding the centroids.
    pub separation: f64,
    /// Standard deviation of every cluster along each axis.
    pub spread: f64,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

/// Generated points with the cluster each one was drawn from.
#[derive(Clone, Debug)]
pub struct LabelledPoints {
    /// Generated matrix.
    pub points: DenseMatrix,
    /// Ground-truth cluster of every point.
    pub labels: Vec<i64>,
}

/// Namespace for the synthetic generators.
#[derive(Clone, Copy, Debug)]
pub struct SyntheticSource;

impl SyntheticSource {
    /// Generates uniform random points in `[0.0, 1.0)`.
    ///
    /// # Errors
    /// Returns [`SyntheticError`] when the configuration is invalid.
    pub fn generate(config: &SyntheticConfig) -> Result<DenseMatrix, SyntheticError> {
        let total = checked_total(config.point_count, config.dimensions)?;
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let values = (0..total).map(|_| rng.gen_range(0.0_f64..1.0)).collect();
        Ok(DenseMatrix::new(
            "synthetic-uniform",
            config.dimensions,
            values,
        )?)
    }

    /// Generates Gaussian blobs with their ground-truth labels.
    ///
    /// Points are assigned to clusters in round-robin order.
    ///
    /// # Errors
    /// Returns [`SyntheticError`] when the configuration is invalid.
    #[expect(
        clippy::float_arithmetic,
        reason = "Gaussian sampling requires floating-point arithmetic"
    )]
    pub fn generate_gaussian_blobs(
        config: &GaussianBlobConfig,
    ) -> Result<LabelledPoints, SyntheticError> {
        let total = checked_total(config.point_count, config.dimensions)?;
        validate_blob_config(config)?;

        let centroids = blob_centroids(config, &mut SmallRng::seed_from_u64(config.seed));
        let mut rng = SmallRng::seed_from_u64(config.seed ^ 0x5EED_B10B_5EED_B10B);
        let mut values = Vec::with_capacity(total);
        let mut labels = Vec::with_capacity(config.point_count);
        for (label, centroid) in (0..config.cluster_count)
            .zip(&centroids)
            .cycle()
            .take(config.point_count)
        {
            labels.push(i64::try_from(label).map_err(|_| SyntheticError::Overflow)?);
            for &coordinate in centroid {
                values.push(coordinate + standard_normal_sample(&mut rng)? * config.spread);
            }
        }

        Ok(LabelledPoints {
            points: DenseMatrix::new("synthetic-gaussian-blobs", config.dimensions, values)?,
            labels,
        })
    }
}

fn checked_total(point_count: usize, dimensions: usize) -> Result<usize, SyntheticError> {
    if point_count == 0 {
        return Err(SyntheticError::ZeroPoints);
    }
    if dimensions == 0 {
        return Err(SyntheticError::ZeroDimensions);
    }
    point_count
        .checked_mul(dimensions)
        .ok_or(SyntheticError::Overflow)
}

fn validate_blob_config(config: &GaussianBlobConfig) -> Result<(), SyntheticError> {
    if config.cluster_count == 0 {
        return Err(SyntheticError::ZeroClusters);
    }
    if config.cluster_count > config.point_count {
        return Err(SyntheticError::ClusterCountExceedsPointCount {
            cluster_count: config.cluster_count,
            point_count: config.point_count,
        });
    }
    if !config.separation.is_finite() || config.separation <= 0.0 {
        return Err(SyntheticError::InvalidFloatParameter {
            parameter: "separation",
        });
    }
    if !config.spread.is_finite() || config.spread <= 0.0 {
        return Err(SyntheticError::InvalidFloatParameter {
            parameter: "spread",
        });
    }
    Ok(())
}

#[expect(
    clippy::cast_precision_loss,
    reason = "cluster indices are small and only place centroids on a circle"
)]
#[expect(
    clippy::float_arithmetic,
    reason = "centroid placement uses trigonometric expressions"
)]
fn blob_centroids(config: &GaussianBlobConfig, rng: &mut SmallRng) -> Vec<Vec<f64>> {
    (0..config.cluster_count)
        .map(|cluster| {
            let angle = (cluster as f64 / config.cluster_count as f64) * (2.0 * PI);
            let mut centroid = vec![0.0; config.dimensions];
            if let Some(value) = centroid.get_mut(0) {
                *value = config.separation * angle.cos();
            }
            if let Some(value) = centroid.get_mut(1) {
                *value = config.separation * angle.sin();
            }
            let jitter = 0.2 * config.separation;
            for value in centroid.iter_mut().skip(2) {
                *value = rng.gen_range(-jitter..jitter);
            }
            centroid
        })
        .collect()
}

/// Draws one standard normal sample with the Box-Muller transform.
#[expect(
    clippy::float_arithmetic,
    reason = "Box-Muller sampling requires floating-point arithmetic"
)]
fn standard_normal_sample(rng: &mut SmallRng) -> Result<f64, SyntheticError> {
    let u1 = rng.gen_range(0.0_f64..1.0).max(f64::EPSILON);
    let u2 = rng.gen_range(0.0_f64..1.0);
    let sample = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    if sample.is_finite() {
        Ok(sample)
    } else {
        Err(SyntheticError::InvalidFloatParameter {
            parameter: "standard_normal_sample",
        })
    }
}
