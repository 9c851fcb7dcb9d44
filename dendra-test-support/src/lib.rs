//! Shared test utilities used across dendra crates.

pub mod ci;
pub mod tracing;
