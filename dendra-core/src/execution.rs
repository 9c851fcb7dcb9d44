//! Cooperative cancellation and progress reporting shared by every stage.
//!
//! Stages receive an [`ExecutionContext`] carrying the configured worker
//! count, a [`TerminationFlag`] polled at task boundaries, and a
//! [`ProgressSink`] that observes per-stage completion percentages.

use std::{
    fmt,
    num::NonZeroUsize,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering},
    },
};

use thiserror::Error;
use tracing::debug;

/// Pipeline stages observed by progress sinks and cancellation errors.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Stage {
    /// Building the k-d tree.
    TreeBuild,
    /// Computing core distances with k-nearest-neighbour queries.
    CoreDistances,
    /// Running the dual-tree Borůvka rounds.
    SpanningTree,
    /// Sorting spanning tree edges into the single-linkage dendrogram.
    Hierarchy,
    /// Condensing the dendrogram.
    Condensation,
    /// Scoring, selecting, and labelling clusters.
    Extraction,
}

impl Stage {
    /// Returns the stable identifier used in logs and spans.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TreeBuild => "tree_build",
            Self::CoreDistances => "core_distances",
            Self::SpanningTree => "spanning_tree",
            Self::Hierarchy => "hierarchy",
            Self::Condensation => "condensation",
            Self::Extraction => "extraction",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a [`TerminationFlag`] stops a running stage.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("{stage} was cancelled")]
pub struct Cancelled {
    stage: Stage,
}

impl Cancelled {
    /// Returns the stage that observed the cancellation.
    #[must_use]
    #[rustfmt::skip]
    pub const fn stage(&self) -> Stage { self.stage }
}

/// Pollable flag telling long-running stages whether to continue.
///
/// Implementations must be cheap to query; stages poll once per task or
/// chunk of work.
pub trait TerminationFlag: Sync {
    /// Returns `false` once the computation should stop.
    fn running(&self) -> bool;
}

/// Termination flag that never stops the computation.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunToCompletion;

impl TerminationFlag for RunToCompletion {
    fn running(&self) -> bool {
        true
    }
}

/// A raw atomic reads `true` while the computation may keep running.
impl TerminationFlag for AtomicBool {
    fn running(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// Termination flag backed by an atomic that another thread can trip.
///
/// # Examples
/// ```
/// use dendra_core::{CancellationFlag, TerminationFlag};
///
/// let flag = CancellationFlag::new();
/// assert!(flag.running());
/// flag.cancel();
/// assert!(!flag.running());
/// ```
#[derive(Debug, Default)]
pub struct CancellationFlag {
    cancelled: AtomicBool,
}

impl CancellationFlag {
    /// Creates a flag in the running state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
        }
    }

    /// Requests that every stage polling this flag stops.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns whether [`Self::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl TerminationFlag for CancellationFlag {
    fn running(&self) -> bool {
        !self.is_cancelled()
    }
}

/// Observer for per-stage progress.
///
/// Percentages reported for a stage are monotonically increasing and end at
/// `100` when the stage completes.
pub trait ProgressSink: Sync {
    /// Called once before a stage starts; `work` is the stage's unit count.
    fn stage_started(&self, _stage: Stage, _work: usize) {}

    /// Called whenever the completed percentage of `stage` increases.
    fn progress(&self, stage: Stage, percent: u8);

    /// Called once after a stage has finished.
    fn stage_finished(&self, _stage: Stage) {}
}

/// Progress sink that discards every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&self, _stage: Stage, _percent: u8) {}
}

/// Progress sink that emits `tracing` debug events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn stage_started(&self, stage: Stage, work: usize) {
        debug!(stage = stage.as_str(), work, "stage started");
    }

    fn progress(&self, stage: Stage, percent: u8) {
        debug!(stage = stage.as_str(), percent, "stage progress");
    }

    fn stage_finished(&self, stage: Stage) {
        debug!(stage = stage.as_str(), "stage finished");
    }
}

/// Worker count, termination flag, and progress sink handed to each stage.
///
/// Stages run on the current `rayon` pool; the worker count decides whether
/// they fork at all and how finely they partition their work.
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    concurrency: NonZeroUsize,
    termination: &'a dyn TerminationFlag,
    progress: &'a dyn ProgressSink,
}

impl ExecutionContext<'static> {
    /// Creates a context that never cancels and reports no progress.
    #[must_use]
    pub const fn new(concurrency: NonZeroUsize) -> Self {
        Self {
            concurrency,
            termination: &RunToCompletion,
            progress: &NoProgress,
        }
    }

    /// Creates a single-worker context.
    #[must_use]
    pub const fn sequential() -> Self {
        Self::new(NonZeroUsize::MIN)
    }
}

impl<'a> ExecutionContext<'a> {
    /// Replaces the termination flag.
    #[must_use]
    pub fn with_termination<'b>(self, termination: &'b dyn TerminationFlag) -> ExecutionContext<'b>
    where
        'a: 'b,
    {
        ExecutionContext {
            concurrency: self.concurrency,
            termination,
            progress: self.progress,
        }
    }

    /// Replaces the progress sink.
    #[must_use]
    pub fn with_progress<'b>(self, progress: &'b dyn ProgressSink) -> ExecutionContext<'b>
    where
        'a: 'b,
    {
        ExecutionContext {
            concurrency: self.concurrency,
            termination: self.termination,
            progress,
        }
    }

    /// Returns the configured worker count.
    #[must_use]
    #[rustfmt::skip]
    pub const fn concurrency(&self) -> NonZeroUsize { self.concurrency }

    /// Returns `true` when stages may fork work across threads.
    #[must_use]
    pub const fn is_parallel(&self) -> bool {
        self.concurrency.get() > 1
    }

    /// Polls the termination flag.
    ///
    /// # Errors
    /// Returns [`Cancelled`] tagged with `stage` once the flag stops running.
    pub fn ensure_running(&self, stage: Stage) -> Result<(), Cancelled> {
        if self.termination.running() {
            Ok(())
        } else {
            Err(Cancelled { stage })
        }
    }

    pub(crate) fn track(&self, stage: Stage, work: usize) -> StageProgress<'a> {
        self.progress.stage_started(stage, work);
        StageProgress {
            sink: self.progress,
            stage,
            work,
            completed: AtomicUsize::new(0),
            last_reported: AtomicU8::new(0),
            report: Mutex::new(0),
        }
    }
}

impl fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("concurrency", &self.concurrency)
            .field("running", &self.termination.running())
            .finish_non_exhaustive()
    }
}

/// Shared completion counter for one stage.
///
/// Workers call [`Self::advance`] concurrently; the sink only sees strictly
/// increasing whole percentages.
pub(crate) struct StageProgress<'a> {
    sink: &'a dyn ProgressSink,
    stage: Stage,
    work: usize,
    completed: AtomicUsize,
    last_reported: AtomicU8,
    report: Mutex<u8>,
}

impl StageProgress<'_> {
    pub(crate) fn advance(&self, amount: usize) {
        let done = self
            .completed
            .fetch_add(amount, Ordering::Relaxed)
            .saturating_add(amount);
        self.report(percent_of(done, self.work));
    }

    pub(crate) fn finish(self) {
        self.report(100);
        self.sink.stage_finished(self.stage);
    }

    fn report(&self, percent: u8) {
        if percent <= self.last_reported.load(Ordering::Relaxed) {
            return;
        }
        let Ok(mut reported) = self.report.lock() else {
            return;
        };
        if percent > *reported {
            *reported = percent;
            self.last_reported.store(percent, Ordering::Relaxed);
            self.sink.progress(self.stage, percent);
        }
    }
}

fn percent_of(done: usize, work: usize) -> u8 {
    if work == 0 {
        return 100;
    }
    let clamped = done.min(work) as u128;
    let percent = clamped * 100 / work as u128;
    u8::try_from(percent).unwrap_or(100)
}
