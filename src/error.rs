//! Error types for the `volnorm` crate.
//!
//! This module defines [`NormalizeError`], the unified error type returned by
//! all fallible operations in the crate. Every variant carries the path of
//! the file it concerns so batch reports stay readable without additional
//! logging at the call site.

use std::{io::Error as IoError, path::PathBuf};

use thiserror::Error;

use crate::analysis::VolumeMetric;

/// The unified error type for all `volnorm` operations.
///
/// Variants fall into three classes:
///
/// - **startup** errors ([`ToolNotFound`](Self::ToolNotFound),
///   [`InvalidPattern`](Self::InvalidPattern)) stop the program before any
///   file is touched;
/// - **skips** ([`InputMissing`](Self::InputMissing),
///   [`OutputExists`](Self::OutputExists)) leave a file untouched and let the
///   batch continue, see [`is_skip`](Self::is_skip);
/// - **per-file failures** (everything else) mark the file as failed. An
///   analysis failure additionally aborts the batch in strict mode.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NormalizeError {
    /// The transcoder binary could not be located.
    #[error("{program} could not be found in your PATH")]
    ToolNotFound {
        /// Program name or path that was looked up.
        program: String,
    },

    /// An input file does not exist.
    #[error("file {} does not exist", path.display())]
    InputMissing {
        /// The missing input path.
        path: PathBuf,
    },

    /// The analysis process could not be started.
    #[error("could not run volume analysis for {}: {reason}", path.display())]
    AnalysisInvocation {
        /// The input being analyzed.
        path: PathBuf,
        /// Underlying reason the launch failed.
        reason: String,
    },

    /// The analysis output did not contain a parseable volume value.
    #[error("could not get {metric} volume for {}", path.display())]
    AnalysisParse {
        /// The input being analyzed.
        path: PathBuf,
        /// The metric that was missing from the report.
        metric: VolumeMetric,
    },

    /// The output file already exists and overwriting was not requested.
    #[error("output file {} already exists, skipping (use --force to overwrite)", path.display())]
    OutputExists {
        /// The existing output path.
        path: PathBuf,
    },

    /// The output path resolves to the input file itself.
    #[error("output file {} is the input file, refusing to overwrite it", path.display())]
    OutputIsInput {
        /// The clashing path.
        path: PathBuf,
    },

    /// The encoding process failed to start or exited abnormally.
    #[error("encoding {} failed: {reason}", path.display())]
    EncodingInvocation {
        /// The input being encoded.
        path: PathBuf,
        /// Launch error or the tail of the transcoder's diagnostics.
        reason: String,
    },

    /// An input glob pattern could not be parsed.
    #[error("invalid input pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Parser message.
        reason: String,
    },

    /// The parallel worker pool could not be created.
    #[cfg(feature = "rayon")]
    #[error("could not start worker pool: {0}")]
    ThreadPool(String),

    /// An I/O error occurred while preparing the output location.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl NormalizeError {
    /// Returns `true` for errors that skip a file without counting as a
    /// failure.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            NormalizeError::InputMissing { .. } | NormalizeError::OutputExists { .. }
        )
    }

    /// Returns `true` for errors raised while analyzing a file.
    ///
    /// These are the errors that abort the whole batch in strict mode.
    pub fn is_analysis_failure(&self) -> bool {
        matches!(
            self,
            NormalizeError::AnalysisInvocation { .. } | NormalizeError::AnalysisParse { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_classification() {
        let missing = NormalizeError::InputMissing {
            path: PathBuf::from("a.mp4"),
        };
        let exists = NormalizeError::OutputExists {
            path: PathBuf::from("b.mp4"),
        };
        let encoding = NormalizeError::EncodingInvocation {
            path: PathBuf::from("c.mp4"),
            reason: "exit status 1".to_string(),
        };

        assert!(missing.is_skip());
        assert!(exists.is_skip());
        assert!(!encoding.is_skip());
        assert!(!encoding.is_analysis_failure());
    }

    #[test]
    fn parse_error_message_names_metric() {
        let error = NormalizeError::AnalysisParse {
            path: PathBuf::from("clip.mov"),
            metric: VolumeMetric::Max,
        };
        assert!(error.is_analysis_failure());
        assert_eq!(error.to_string(), "could not get max volume for clip.mov");
    }
}
