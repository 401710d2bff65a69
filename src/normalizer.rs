//! Batch driver.
//!
//! [`Normalizer`] runs the per-file sequence: check the input exists, probe
//! its volume, compute the gain, and (unless read-only) apply it. Each file
//! yields a [`FileReport`]; a batch yields a [`BatchReport`].
//!
//! # Example
//!
//! ```no_run
//! use volnorm::{NormalizeOptions, Normalizer, Transcoder};
//!
//! let normalizer = Normalizer::new(Transcoder::locate()?, NormalizeOptions::new());
//! let report = normalizer.run(&["interview.mov", "b-roll.mp4"]);
//! print!("{report}");
//! # Ok::<(), volnorm::NormalizeError>(())
//! ```

use std::path::Path;

use crate::analysis::{VolumeDetect, VolumeProbe};
use crate::apply::{ApplyOutcome, GainApplier};
use crate::config::NormalizeOptions;
use crate::error::NormalizeError;
use crate::gain::AdjustmentResult;
use crate::progress::ProgressTracker;
use crate::report::{BatchReport, FileOutcome, FileReport};
use crate::transcoder::Transcoder;

/// Normalizes files with one transcoder and one set of options.
///
/// The options are fixed at construction; the normalizer holds no other
/// state, so it can be shared across threads.
pub struct Normalizer {
    pub(crate) transcoder: Transcoder,
    pub(crate) probe: Box<dyn VolumeProbe>,
    pub(crate) options: NormalizeOptions,
}

impl Normalizer {
    /// Create a normalizer measuring volume with ffmpeg's `volumedetect`.
    pub fn new(transcoder: Transcoder, options: NormalizeOptions) -> Self {
        Self {
            probe: Box::new(VolumeDetect::new(transcoder.clone())),
            transcoder,
            options,
        }
    }

    /// Replace the volume probe.
    #[must_use]
    pub fn with_probe(mut self, probe: Box<dyn VolumeProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// The options this normalizer runs with.
    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    /// Process one file.
    ///
    /// Never returns an error: problems are recorded in the report's
    /// [`outcome`](FileReport::outcome).
    pub fn process_file(&self, input: &Path) -> FileReport {
        if !input.exists() {
            let error = NormalizeError::InputMissing {
                path: input.to_path_buf(),
            };
            log::warn!("{error}");
            return FileReport::new(input, FileOutcome::Skipped(error));
        }

        log::info!("Reading file {}", input.display());
        let volume = match self.probe.probe(input) {
            Ok(volume) => volume,
            Err(error) => {
                log::error!("{error}");
                return FileReport::new(input, FileOutcome::Failed(error));
            }
        };
        log::info!("mean volume: {} dB", volume.mean_db);
        log::info!("max volume: {} dB", volume.peak_db);

        let adjustment =
            AdjustmentResult::compute(&volume, self.options.target_level_db, self.options.mode);
        log::info!(
            "{} needs {} dB gain to reach {} dB",
            input.display(),
            adjustment.gain_db,
            self.options.target_level_db
        );
        if adjustment.would_clip {
            log::warn!(
                "adjusting {} will lead to clipping of {} dB",
                input.display(),
                adjustment.adjusted_peak_db(&volume)
            );
        }

        let mut report = FileReport::new(input, FileOutcome::Analyzed);
        report.volume = Some(volume);
        report.adjustment = Some(adjustment);

        if self.options.read_only {
            return report;
        }

        let request = self.options.request(input);
        log::info!("audio bitrate: {} kbps", request.bitrate_kbps);
        log::info!("output path: {}", request.output_path.display());

        report.outcome =
            match GainApplier::from_request(&self.transcoder, &request, adjustment.gain_db).run() {
                Ok(ApplyOutcome::Written(output)) => FileOutcome::Normalized { output },
                Ok(ApplyOutcome::DryRun { output, command }) => {
                    FileOutcome::DryRun { output, command }
                }
                Err(error) if error.is_skip() => {
                    log::warn!("{error}");
                    FileOutcome::Skipped(error)
                }
                Err(error) => {
                    log::error!("{error}");
                    FileOutcome::Failed(error)
                }
            };
        report
    }

    /// Process `inputs` one after another, in order.
    ///
    /// In strict mode the batch stops after the first file whose analysis
    /// fails, and the report is marked [`aborted`](BatchReport::aborted).
    pub fn run<P: AsRef<Path>>(&self, inputs: &[P]) -> BatchReport {
        let tracker = ProgressTracker::new(self.options.progress.clone(), inputs.len());
        let mut batch = BatchReport::default();

        for input in inputs {
            let input = input.as_ref();
            let report = self.process_file(input);
            tracker.advance(input);

            let abort = self.options.strict && report.aborts_strict_run();
            batch.files.push(report);
            if abort {
                log::error!("Stopping after {} (strict mode)", input.display());
                batch.aborted = true;
                break;
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::analysis::{VolumeMetric, VolumeReport};

    /// Probe returning a canned result; `None` fails as unparseable.
    struct FixedProbe(Option<VolumeReport>);

    impl VolumeProbe for FixedProbe {
        fn probe(&self, input: &Path) -> Result<VolumeReport, NormalizeError> {
            self.0.ok_or_else(|| NormalizeError::AnalysisParse {
                path: input.to_path_buf(),
                metric: VolumeMetric::Mean,
            })
        }
    }

    fn normalizer(options: NormalizeOptions, result: Option<VolumeReport>) -> Normalizer {
        Normalizer::new(Transcoder::with_program("volnorm-missing-ffmpeg"), options)
            .with_probe(Box::new(FixedProbe(result)))
    }

    const MEASURED: VolumeReport = VolumeReport {
        mean_db: -20.0,
        peak_db: -3.0,
    };

    #[test]
    fn missing_input_is_skipped() {
        let normalizer = normalizer(NormalizeOptions::new(), Some(MEASURED));
        let report = normalizer.process_file(Path::new("volnorm-does-not-exist.mov"));
        assert!(matches!(
            report.outcome,
            FileOutcome::Skipped(NormalizeError::InputMissing { .. })
        ));
        assert!(report.volume.is_none());
    }

    #[test]
    fn read_only_stops_after_analysis() {
        let directory = tempfile::tempdir().expect("Failed to create temp dir");
        let input = directory.path().join("clip.mov");
        fs::write(&input, b"media").expect("Failed to write input");

        let options = NormalizeOptions::new()
            .with_read_only(true)
            .with_output_dir(directory.path());
        let report = normalizer(options, Some(MEASURED)).process_file(&input);

        assert!(matches!(report.outcome, FileOutcome::Analyzed));
        assert_eq!(report.adjustment.map(|a| a.gain_db), Some(-6.0));
        assert!(!report.would_clip());
        assert!(!directory.path().join("normalized_clip.mp4").exists());
    }

    #[test]
    fn dry_run_reports_command_without_writing() {
        let directory = tempfile::tempdir().expect("Failed to create temp dir");
        let input = directory.path().join("clip.mov");
        fs::write(&input, b"media").expect("Failed to write input");
        let output_dir = directory.path().join("out");

        let options = NormalizeOptions::new()
            .with_dry_run(true)
            .with_output_dir(&output_dir);
        let report = normalizer(options, Some(MEASURED)).process_file(&input);

        match report.outcome {
            FileOutcome::DryRun { output, command } => {
                assert_eq!(output, output_dir.join("normalized_clip.mp4"));
                assert!(command.contains("volume=-6dB"));
            }
            other => panic!("expected dry run, got {other:?}"),
        }
        assert!(!output_dir.exists());
    }

    #[test]
    fn existing_output_is_skipped() {
        let directory = tempfile::tempdir().expect("Failed to create temp dir");
        let input = directory.path().join("clip.mov");
        fs::write(&input, b"media").expect("Failed to write input");
        let existing = directory.path().join("normalized_clip.mp4");
        fs::write(&existing, b"previous").expect("Failed to write output");

        let options = NormalizeOptions::new().with_output_dir(directory.path());
        let report = normalizer(options, Some(MEASURED)).process_file(&input);

        assert!(matches!(
            report.outcome,
            FileOutcome::Skipped(NormalizeError::OutputExists { .. })
        ));
        assert_eq!(fs::read(&existing).unwrap(), b"previous");
    }

    #[test]
    fn missing_transcoder_fails_file() {
        let directory = tempfile::tempdir().expect("Failed to create temp dir");
        let input = directory.path().join("clip.mov");
        fs::write(&input, b"media").expect("Failed to write input");

        let options = NormalizeOptions::new().with_output_dir(directory.path());
        let report = normalizer(options, Some(MEASURED)).process_file(&input);

        assert!(matches!(
            report.outcome,
            FileOutcome::Failed(NormalizeError::EncodingInvocation { .. })
        ));
    }

    #[test]
    fn strict_mode_stops_batch() {
        let directory = tempfile::tempdir().expect("Failed to create temp dir");
        let first = directory.path().join("a.mov");
        let second = directory.path().join("b.mov");
        fs::write(&first, b"media").expect("Failed to write input");
        fs::write(&second, b"media").expect("Failed to write input");

        let strict = normalizer(NormalizeOptions::new().with_strict(true), None);
        let batch = strict.run(&[&first, &second]);
        assert!(batch.aborted);
        assert_eq!(batch.files.len(), 1);

        let lenient = normalizer(NormalizeOptions::new(), None);
        let batch = lenient.run(&[&first, &second]);
        assert!(!batch.aborted);
        assert_eq!(batch.files.len(), 2);
        assert_eq!(batch.failed_count(), 2);
    }

    #[test]
    fn missing_inputs_do_not_fail_batch() {
        let normalizer = normalizer(NormalizeOptions::new().with_read_only(true), Some(MEASURED));
        let batch = normalizer.run(&["volnorm-missing-a.mov", "volnorm-missing-b.mov"]);

        assert_eq!(batch.skipped_count(), 2);
        assert!(batch.is_success());
    }
}
