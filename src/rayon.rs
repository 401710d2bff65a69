//! Parallel batch processing.
//!
//! This module provides [`Normalizer::run_parallel`], which distributes files
//! across a bounded rayon pool. Each file still runs its probe and apply
//! calls in sequence on one worker; only different files overlap.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use ::rayon::ThreadPoolBuilder;
use ::rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::error::NormalizeError;
use crate::normalizer::Normalizer;
use crate::progress::ProgressTracker;
use crate::report::{BatchReport, FileReport};

impl Normalizer {
    /// Process `inputs` concurrently.
    ///
    /// The pool size comes from
    /// [`NormalizeOptions::with_threads`](crate::NormalizeOptions::with_threads).
    /// Reports are returned in input order whatever order files finish in.
    /// Inputs that map to the same output path are processed one after
    /// another, so the second one is skipped exactly as in
    /// [`run`](Normalizer::run).
    ///
    /// In strict mode, a failed analysis stops files that have not started
    /// yet; files already running finish and are reported, files never
    /// started are left out of the report.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::ThreadPool`] if the worker pool cannot be
    /// created. Per-file problems are recorded in the report instead.
    pub fn run_parallel<P: AsRef<Path> + Sync>(
        &self,
        inputs: &[P],
    ) -> Result<BatchReport, NormalizeError> {
        let mut builder = ThreadPoolBuilder::new();
        if let Some(threads) = self.options.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|error| NormalizeError::ThreadPool(error.to_string()))?;

        let tracker = ProgressTracker::new(self.options.progress.clone(), inputs.len());
        let stop = AtomicBool::new(false);
        let strict = self.options.strict;
        let groups = output_groups(
            inputs
                .iter()
                .map(|input| self.options.output_path_for(input.as_ref())),
        );

        let results: Vec<Vec<(usize, FileReport)>> = pool.install(|| {
            groups
                .par_iter()
                .map(|group| {
                    let mut reports = Vec::with_capacity(group.len());
                    for &index in group {
                        if stop.load(Ordering::Acquire) {
                            break;
                        }
                        let input = inputs[index].as_ref();
                        let report = self.process_file(input);
                        tracker.advance(input);
                        if strict && report.aborts_strict_run() {
                            log::error!("Stopping after {} (strict mode)", input.display());
                            stop.store(true, Ordering::Release);
                        }
                        reports.push((index, report));
                    }
                    reports
                })
                .collect()
        });

        let mut files: Vec<(usize, FileReport)> = results.into_iter().flatten().collect();
        files.sort_by_key(|(index, _)| *index);

        Ok(BatchReport {
            files: files.into_iter().map(|(_, report)| report).collect(),
            aborted: stop.load(Ordering::Acquire),
        })
    }
}

/// Group input indices by output path, in order of first appearance.
///
/// Inputs sharing an output run in input order on one worker, so the
/// existence check sees the same state as a sequential run.
fn output_groups<I: IntoIterator<Item = PathBuf>>(outputs: I) -> Vec<Vec<usize>> {
    let mut slots: HashMap<PathBuf, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (index, output) in outputs.into_iter().enumerate() {
        match slots.entry(output) {
            Entry::Occupied(slot) => groups[*slot.get()].push(index),
            Entry::Vacant(slot) => {
                slot.insert(groups.len());
                groups.push(vec![index]);
            }
        }
    }
    groups
}
