//! Batch progress reporting.
//!
//! This module provides [`ProgressCallback`] for monitoring a batch run and
//! [`ProgressInfo`], the snapshot delivered after each file finishes.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use volnorm::{NormalizeOptions, Normalizer, ProgressCallback, ProgressInfo, Transcoder};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{}/{} {}", info.completed, info.total, info.current_file.display());
//!     }
//! }
//!
//! let options = NormalizeOptions::new().with_progress(Arc::new(PrintProgress));
//! let normalizer = Normalizer::new(Transcoder::locate()?, options);
//! let report = normalizer.run(&["a.mp4", "b.mp4"]);
//! # Ok::<(), volnorm::NormalizeError>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A snapshot of batch progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Files finished so far, including skipped and failed ones.
    pub completed: u64,
    /// Files in the batch.
    pub total: u64,
    /// Completion percentage (0.0 – 100.0).
    pub percentage: f32,
    /// Wall-clock time since the batch started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on throughput so far.
    pub estimated_remaining: Option<Duration>,
    /// The file that just finished.
    pub current_file: PathBuf,
}

/// Trait for receiving progress updates during a batch run.
///
/// Implementations must be [`Send`] and [`Sync`] because callbacks may be
/// invoked from rayon worker threads.
///
/// Progress callbacks are **infallible**: they observe but cannot halt
/// the batch.
pub trait ProgressCallback: Send + Sync {
    /// Called once after each file has been processed.
    fn on_progress(&self, info: &ProgressInfo);
}

/// A no-op implementation that discards all progress notifications.
///
/// This is the default when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks batch timing and emits callbacks.
///
/// The counter is atomic so one tracker can be shared by parallel workers.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: u64,
    completed: AtomicU64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: usize) -> Self {
        Self {
            callback,
            total: total as u64,
            completed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record one finished file and fire the callback.
    pub(crate) fn advance(&self, file: &Path) {
        let completed = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        let elapsed = self.start_time.elapsed();

        let percentage = if self.total > 0 {
            (completed as f32 / self.total as f32) * 100.0
        } else {
            100.0
        };

        let remaining = self.total.saturating_sub(completed);
        let estimated_remaining = (completed > 0)
            .then(|| elapsed.div_f64(completed as f64).mul_f64(remaining as f64));

        self.callback.on_progress(&ProgressInfo {
            completed,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_file: file.to_path_buf(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(u64, u64, PathBuf)>>,
    }

    impl ProgressCallback for Recorder {
        fn on_progress(&self, info: &ProgressInfo) {
            self.seen
                .lock()
                .unwrap()
                .push((info.completed, info.total, info.current_file.clone()));
        }
    }

    #[test]
    fn tracker_counts_files() {
        let recorder = Arc::new(Recorder::default());
        let tracker = ProgressTracker::new(recorder.clone(), 2);
        tracker.advance(Path::new("a.mp4"));
        tracker.advance(Path::new("b.mp4"));

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (1, 2, PathBuf::from("a.mp4")),
                (2, 2, PathBuf::from("b.mp4")),
            ]
        );
    }
}
