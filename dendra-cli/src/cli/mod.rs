//! Command-line interface for clustering delimited numeric matrices.
//!
//! The `run` command reads one point per line, runs the clustering pipeline,
//! and prints one label per point.

mod commands;
mod matrix;

pub use commands::{
    Cli, CliError, Command, ExecutionSummary, MetricChoice, RunCommand, render_summary, run_cli,
};
pub use matrix::{MatrixReadError, read_matrix};
