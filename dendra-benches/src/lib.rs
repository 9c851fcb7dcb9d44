//! Benchmark support crate for dendra.
//!
//! Provides synthetic point sets and parameter types used by the criterion
//! benchmarks for tree construction, the spanning tree, hierarchy
//! extraction, and the full pipeline.

pub mod error;
pub mod params;
pub mod source;
