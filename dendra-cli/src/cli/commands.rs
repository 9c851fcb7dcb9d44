//! Command implementations and argument parsing for the dendra CLI.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use dendra_core::{
    ClusteringResult, DendraError, Euclidean, Hdbscan, HdbscanBuilder, Manhattan, Metric,
    PointSource, RunToCompletion, TracingProgress,
};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

use super::matrix::{MatrixReadError, read_matrix};

const DEFAULT_MIN_CLUSTER_SIZE: usize = 5;
const DEFAULT_SAMPLES: usize = 10;
const DEFAULT_LEAF_SIZE: usize = 1;
const DEFAULT_CONCURRENCY: usize = 4;

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "dendra", about = "Density-based clustering of numeric matrices.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Cluster the points stored in a delimited text file.
    Run(RunCommand),
}

/// Options accepted by the `run` command.
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to a text file with one point per line.
    pub path: PathBuf,

    /// Field separator; any whitespace character splits on runs of whitespace.
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// Smallest group of points reported as a cluster.
    #[arg(long = "min-cluster-size", default_value_t = DEFAULT_MIN_CLUSTER_SIZE)]
    pub min_cluster_size: usize,

    /// Neighbour count defining each point's core distance.
    #[arg(long, default_value_t = DEFAULT_SAMPLES)]
    pub samples: usize,

    /// Maximum number of points per k-d tree leaf.
    #[arg(long = "leaf-size", default_value_t = DEFAULT_LEAF_SIZE)]
    pub leaf_size: usize,

    /// Number of worker threads.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Distance metric between points.
    #[arg(long, value_enum, default_value_t = MetricChoice::Euclidean)]
    pub metric: MetricChoice,

    /// Override name for the data source (defaults to the file name).
    #[arg(long)]
    pub name: Option<String>,
}

/// Metrics selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricChoice {
    /// Straight-line distance.
    Euclidean,
    /// Sum of absolute coordinate differences.
    Manhattan,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The input file could not be opened.
    #[error("failed to open `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The input file was not a valid matrix.
    #[error("failed to read `{path}`: {source}")]
    Matrix {
        /// Path being read.
        path: PathBuf,
        /// Parse or validation failure.
        #[source]
        source: MatrixReadError,
    },
    /// Configuration or clustering failed.
    #[error(transparent)]
    Core(#[from] DendraError),
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    /// Name reported by the point source.
    pub data_source: String,
    /// Labels produced by the clustering run.
    pub result: ClusteringResult,
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when reading the input or clustering fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use dendra_cli::cli::{Cli, run_cli};
/// # use clap::Parser;
/// # use tempfile::NamedTempFile;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let file = NamedTempFile::new()?;
/// std::fs::write(file.path(), "0,0\n0,1\n9,9\n9,10\n")?;
/// let path = file.path().to_str().ok_or("temp path is not UTF-8")?;
/// let cli = Cli::try_parse_from([
///     "dendra", "run", path, "--min-cluster-size", "2", "--samples", "1",
/// ])?;
/// let summary = run_cli(cli)?;
/// assert_eq!(summary.result.labels(), &[0, 0, 1, 1]);
/// # Ok(())
/// # }
/// ```
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    match cli.command {
        Command::Run(run) => run_command(run),
    }
}

#[instrument(
    name = "cli.run",
    err,
    skip(command),
    fields(path = field::Empty, metric = field::Empty, override_name = field::Empty),
)]
pub(super) fn run_command(command: RunCommand) -> Result<ExecutionSummary, CliError> {
    let span = Span::current();
    span.record("path", field::display(command.path.display()));
    span.record("metric", field::debug(command.metric));
    span.record(
        "override_name",
        field::display(command.name.as_deref().unwrap_or("<derived>")),
    );

    let hdbscan = HdbscanBuilder::new()
        .with_min_cluster_size(command.min_cluster_size)
        .with_samples(command.samples)
        .with_leaf_size(command.leaf_size)
        .with_concurrency(command.concurrency)
        .build()?;

    let name = derive_data_source_name(&command.path, command.name.as_deref());
    let reader = open_reader(&command.path)?;
    let points =
        read_matrix(&name, reader, command.delimiter).map_err(|source| CliError::Matrix {
            path: command.path.clone(),
            source,
        })?;

    let result = match command.metric {
        MetricChoice::Euclidean => cluster(&hdbscan, &points, &Euclidean)?,
        MetricChoice::Manhattan => cluster(&hdbscan, &points, &Manhattan)?,
    };
    info!(
        data_source = points.name(),
        clusters = result.cluster_count(),
        noise = result.noise_count(),
        "run completed"
    );
    Ok(ExecutionSummary {
        data_source: points.name().to_owned(),
        result,
    })
}

fn cluster<P, M>(hdbscan: &Hdbscan, points: &P, metric: &M) -> Result<ClusteringResult, CliError>
where
    P: PointSource,
    M: Metric,
{
    Ok(hdbscan.run_with(points, metric, &RunToCompletion, &TracingProgress)?)
}

#[instrument(name = "cli.open_reader", err, fields(path = field::Empty))]
pub(super) fn open_reader(path: &Path) -> Result<BufReader<File>, CliError> {
    Span::current().record("path", field::display(path.display()));
    let file = File::open(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

pub(super) fn derive_data_source_name(path: &Path, override_name: Option<&str>) -> String {
    if let Some(name) = override_name {
        return name.to_owned();
    }

    path.file_stem()
        .and_then(|value| value.to_str())
        .map_or_else(|| "data_source".to_owned(), ToOwned::to_owned)
}

/// Renders `summary` to `writer` in a tab-separated text format.
///
/// Noise points are printed with label `-1`.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use dendra_cli::cli::{ExecutionSummary, render_summary};
/// # use dendra_core::ClusteringResult;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let summary = ExecutionSummary {
///     data_source: "demo".into(),
///     result: ClusteringResult::from_labels(vec![0, -1]),
/// };
/// let mut buffer = Vec::new();
/// render_summary(&summary, &mut buffer)?;
/// assert_eq!(
///     String::from_utf8(buffer)?,
///     "data source: demo\nclusters: 1\nnoise: 1\n0\t0\n1\t-1\n",
/// );
/// # Ok(())
/// # }
/// ```
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    writeln!(writer, "data source: {}", summary.data_source)?;
    writeln!(writer, "clusters: {}", summary.result.cluster_count())?;
    writeln!(writer, "noise: {}", summary.result.noise_count())?;
    for (index, label) in summary.result.labels().iter().enumerate() {
        writeln!(writer, "{index}\t{label}")?;
    }
    Ok(())
}
