//! Per-file and per-batch results.
//!
//! A batch never stops at the first problem (unless strict mode asks it to),
//! so results are collected into a [`BatchReport`] instead of being returned
//! as errors. The report renders as plain text via [`Display`] and as JSON
//! via [`BatchReport::to_json`].

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

use serde_json::{Value, json};

use crate::analysis::VolumeReport;
use crate::error::NormalizeError;
use crate::gain::AdjustmentResult;

/// What happened to one input file.
#[derive(Debug)]
pub enum FileOutcome {
    /// Analyzed only (read-only mode).
    Analyzed,
    /// The normalized output was written.
    Normalized {
        /// The written file.
        output: PathBuf,
    },
    /// Dry run: nothing was written.
    DryRun {
        /// The file that would have been written.
        output: PathBuf,
        /// The command that would have been run.
        command: String,
    },
    /// Left untouched; see [`NormalizeError::is_skip`].
    Skipped(NormalizeError),
    /// Analysis or encoding failed.
    Failed(NormalizeError),
}

/// Result of processing one input file.
#[derive(Debug)]
pub struct FileReport {
    /// The input path as given.
    pub input: PathBuf,
    /// Measured levels, if analysis succeeded.
    pub volume: Option<VolumeReport>,
    /// Computed gain, if analysis succeeded.
    pub adjustment: Option<AdjustmentResult>,
    /// Final outcome.
    pub outcome: FileOutcome,
}

impl FileReport {
    pub(crate) fn new(input: &Path, outcome: FileOutcome) -> Self {
        Self {
            input: input.to_path_buf(),
            volume: None,
            adjustment: None,
            outcome,
        }
    }

    /// The error attached to a skipped or failed file.
    pub fn error(&self) -> Option<&NormalizeError> {
        match &self.outcome {
            FileOutcome::Skipped(error) | FileOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Returns `true` if the file failed.
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, FileOutcome::Failed(_))
    }

    /// Returns `true` if this file stops the batch in strict mode.
    pub fn aborts_strict_run(&self) -> bool {
        matches!(&self.outcome, FileOutcome::Failed(error) if error.is_analysis_failure())
    }

    /// Returns `true` if the computed gain would clip.
    pub fn would_clip(&self) -> bool {
        self.adjustment.is_some_and(|adjustment| adjustment.would_clip)
    }

    fn status(&self) -> &'static str {
        match self.outcome {
            FileOutcome::Analyzed => "analyzed",
            FileOutcome::Normalized { .. } => "normalized",
            FileOutcome::DryRun { .. } => "dry-run",
            FileOutcome::Skipped(_) => "skipped",
            FileOutcome::Failed(_) => "failed",
        }
    }

    /// Machine-readable form of this report.
    pub fn to_json(&self) -> Value {
        let mut value = json!({
            "input": self.input.display().to_string(),
            "status": self.status(),
            "mean_db": self.volume.map(|volume| volume.mean_db),
            "peak_db": self.volume.map(|volume| volume.peak_db),
            "gain_db": self.adjustment.map(|adjustment| adjustment.gain_db),
            "would_clip": self.adjustment.map(|adjustment| adjustment.would_clip),
        });
        match &self.outcome {
            FileOutcome::Normalized { output } => {
                value["output"] = json!(output.display().to_string());
            }
            FileOutcome::DryRun { output, command } => {
                value["output"] = json!(output.display().to_string());
                value["command"] = json!(command);
            }
            FileOutcome::Skipped(error) | FileOutcome::Failed(error) => {
                value["error"] = json!(error.to_string());
            }
            FileOutcome::Analyzed => {}
        }
        value
    }
}

impl Display for FileReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let input = self.input.display();
        match (&self.outcome, self.volume, self.adjustment) {
            (FileOutcome::Skipped(error), ..) => write!(f, "[SKIP] {error}"),
            (FileOutcome::Failed(error), ..) => write!(f, "[FAIL] {error}"),
            (FileOutcome::Analyzed, Some(volume), Some(adjustment)) => write!(
                f,
                "[INFO] {input}: mean {:.1} dB, max {:.1} dB, needs {:+.2} dB",
                volume.mean_db, volume.peak_db, adjustment.gain_db
            ),
            (FileOutcome::Normalized { output }, _, Some(adjustment)) => write!(
                f,
                "[DONE] {input} -> {} ({:+.2} dB)",
                output.display(),
                adjustment.gain_db
            ),
            (FileOutcome::DryRun { command, .. }, ..) => write!(f, "[DRY RUN] {command}"),
            _ => write!(f, "[{}] {input}", self.status().to_ascii_uppercase()),
        }
    }
}

/// Results of a whole batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One entry per processed file.
    pub files: Vec<FileReport>,
    /// `true` if strict mode stopped the batch early.
    pub aborted: bool,
}

impl BatchReport {
    /// Number of files written.
    pub fn normalized_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Normalized { .. }))
    }

    /// Number of files skipped.
    pub fn skipped_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Skipped(_)))
    }

    /// Number of files that failed.
    pub fn failed_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Failed(_)))
    }

    /// Returns `true` if nothing failed and the batch ran to completion.
    ///
    /// Skips do not affect this result.
    pub fn is_success(&self) -> bool {
        !self.aborted && self.failed_count() == 0
    }

    /// One-line count summary, e.g. `3 file(s): 2 normalized, 1 skipped, 0 failed`.
    pub fn summary(&self) -> String {
        format!(
            "{} file(s): {} normalized, {} skipped, {} failed",
            self.files.len(),
            self.normalized_count(),
            self.skipped_count(),
            self.failed_count()
        )
    }

    /// Machine-readable form of this report.
    pub fn to_json(&self) -> Value {
        json!({
            "aborted": self.aborted,
            "normalized": self.normalized_count(),
            "skipped": self.skipped_count(),
            "failed": self.failed_count(),
            "files": self.files.iter().map(FileReport::to_json).collect::<Vec<_>>(),
        })
    }

    fn count(&self, predicate: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|file| predicate(&file.outcome)).count()
    }
}

impl Display for BatchReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for file in &self.files {
            writeln!(f, "{file}")?;
        }
        f.write_str(&self.summary())?;
        if self.aborted {
            write!(f, " (aborted)")?;
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::VolumeMetric;

    fn analyzed(input: &str) -> FileReport {
        let mut report = FileReport::new(Path::new(input), FileOutcome::Analyzed);
        report.volume = Some(VolumeReport {
            mean_db: -20.0,
            peak_db: -3.0,
        });
        report.adjustment = Some(AdjustmentResult {
            gain_db: -6.0,
            would_clip: false,
        });
        report
    }

    #[test]
    fn counts_and_success() {
        let batch = BatchReport {
            files: vec![
                analyzed("a.mp4"),
                FileReport::new(
                    Path::new("b.mp4"),
                    FileOutcome::Skipped(NormalizeError::InputMissing {
                        path: PathBuf::from("b.mp4"),
                    }),
                ),
                FileReport::new(
                    Path::new("c.mp4"),
                    FileOutcome::Normalized {
                        output: PathBuf::from("normalized_c.mp4"),
                    },
                ),
            ],
            aborted: false,
        };

        assert_eq!(batch.normalized_count(), 1);
        assert_eq!(batch.skipped_count(), 1);
        assert_eq!(batch.failed_count(), 0);
        assert!(batch.is_success());
    }

    #[test]
    fn analysis_failure_aborts_strict_run() {
        let report = FileReport::new(
            Path::new("a.mp4"),
            FileOutcome::Failed(NormalizeError::AnalysisParse {
                path: PathBuf::from("a.mp4"),
                metric: VolumeMetric::Mean,
            }),
        );
        assert!(report.aborts_strict_run());
        assert!(report.is_failure());

        let encoding = FileReport::new(
            Path::new("a.mp4"),
            FileOutcome::Failed(NormalizeError::EncodingInvocation {
                path: PathBuf::from("a.mp4"),
                reason: "exit status: 1".to_string(),
            }),
        );
        assert!(!encoding.aborts_strict_run());
    }

    #[test]
    fn display_lines() {
        assert_eq!(
            analyzed("a.mp4").to_string(),
            "[INFO] a.mp4: mean -20.0 dB, max -3.0 dB, needs -6.00 dB"
        );

        let batch = BatchReport {
            files: vec![analyzed("a.mp4")],
            aborted: true,
        };
        assert_eq!(batch.summary(), "1 file(s): 0 normalized, 0 skipped, 0 failed");
        let text = batch.to_string();
        assert!(text.ends_with(&format!("{} (aborted)\n", batch.summary())));
    }

    #[test]
    fn json_fields() {
        let value = analyzed("a.mp4").to_json();
        assert_eq!(value["status"], "analyzed");
        assert_eq!(value["gain_db"], -6.0);
        assert_eq!(value["would_clip"], false);
        assert!(value.get("output").is_none());

        let batch = BatchReport {
            files: vec![analyzed("a.mp4")],
            aborted: false,
        };
        assert_eq!(batch.to_json()["files"].as_array().map(Vec::len), Some(1));
    }
}
