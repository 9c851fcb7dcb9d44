//! Synthetic benchmark point sets.

mod blobs;
mod errors;

pub use blobs::{GaussianBlobConfig, LabelledPoints, SyntheticConfig, SyntheticSource};
pub use errors::SyntheticError;
