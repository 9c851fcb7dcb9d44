use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use dendra_core::{DenseMatrix, ProgressSink, Stage, TerminationFlag};

/// Two tight groups of four points and one distant outlier.
pub const NINE_POINTS: [[f64; 2]; 9] = [
    [1.0, 1.0],
    [1.2, 1.1],
    [0.9, 1.3],
    [1.1, 0.8],
    [5.0, 5.0],
    [5.2, 5.1],
    [4.9, 5.3],
    [5.1, 4.8],
    [3.0, 15.0],
];

#[must_use]
pub fn nine_points() -> DenseMatrix {
    DenseMatrix::from_rows("nine-points", &NINE_POINTS).expect("fixture rows are valid")
}

/// Four well separated square lattices of `side * side` points each.
#[must_use]
pub fn lattices(side: usize) -> (DenseMatrix, Vec<i64>) {
    let offsets = [(0.0, 0.0), (40.0, 0.0), (0.0, 40.0), (40.0, 40.0)];
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for (group, (x, y)) in offsets.into_iter().enumerate() {
        for i in 0..side {
            for j in 0..side {
                // Jitter breaks exact distance ties between lattice neighbours.
                let jitter = ((i * 7 + j * 13) % 5) as f64 * 0.01;
                rows.push([x + i as f64 + jitter, y + j as f64 - jitter]);
                labels.push(group as i64);
            }
        }
    }
    let matrix = DenseMatrix::from_rows("lattices", &rows).expect("lattice rows are valid");
    (matrix, labels)
}

#[derive(Default)]
pub struct RecordingProgress {
    pub updates: Mutex<Vec<(Stage, u8)>>,
    pub finished: Mutex<Vec<Stage>>,
}

impl ProgressSink for RecordingProgress {
    fn progress(&self, stage: Stage, percent: u8) {
        self.updates.lock().expect("lock").push((stage, percent));
    }

    fn stage_finished(&self, stage: Stage) {
        self.finished.lock().expect("lock").push(stage);
    }
}

/// Termination flag that stops after a fixed number of polls.
pub struct StopAfter {
    remaining: AtomicUsize,
}

impl StopAfter {
    #[must_use]
    pub const fn new(polls: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(polls),
        }
    }
}

impl TerminationFlag for StopAfter {
    fn running(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |left| left.checked_sub(1))
            .is_ok()
    }
}
