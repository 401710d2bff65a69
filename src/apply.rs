//! Gain application.
//!
//! This module provides [`GainApplier`] for writing a copy of a media file
//! whose audio is shifted by a fixed gain. The video stream is copied
//! verbatim; the audio stream is re-encoded to AAC because a volume filter
//! cannot run on a copied stream.
//!
//! # Example
//!
//! ```no_run
//! use volnorm::{GainApplier, Transcoder};
//!
//! let transcoder = Transcoder::locate()?;
//! GainApplier::new(&transcoder, "input.mov", "normalized_input.mp4")
//!     .gain(-6.0)
//!     .bitrate(256)
//!     .run()?;
//! # Ok::<(), volnorm::NormalizeError>(())
//! ```

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{DEFAULT_BITRATE_KBPS, NormalizationRequest};
use crate::error::NormalizeError;
use crate::transcoder::{Transcoder, failure_reason};

/// Audio codec of every output file.
pub const AUDIO_CODEC: &str = "aac";

/// What a successful [`GainApplier::run`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The output file was written.
    Written(PathBuf),
    /// Dry run: the command that would have been run.
    DryRun {
        /// The output that would have been written.
        output: PathBuf,
        /// Rendered command line.
        command: String,
    },
}

/// Builder for one gain-application run.
///
/// Obtained via [`GainApplier::new`] or [`GainApplier::from_request`].
/// Overwrite protection is handled here: the transcoder itself is always
/// told to overwrite, and is only started once the existence check passed.
#[derive(Debug, Clone)]
pub struct GainApplier<'a> {
    transcoder: &'a Transcoder,
    input: PathBuf,
    output: PathBuf,
    gain_db: f64,
    bitrate_kbps: u32,
    force_overwrite: bool,
    dry_run: bool,
}

impl<'a> GainApplier<'a> {
    /// Create an applier copying `input` to `output` with 0 dB gain at the
    /// default bitrate.
    pub fn new<P1: AsRef<Path>, P2: AsRef<Path>>(
        transcoder: &'a Transcoder,
        input: P1,
        output: P2,
    ) -> Self {
        Self {
            transcoder,
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            gain_db: 0.0,
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            force_overwrite: false,
            dry_run: false,
        }
    }

    /// Create an applier for a request, with the computed gain.
    pub fn from_request(
        transcoder: &'a Transcoder,
        request: &NormalizationRequest,
        gain_db: f64,
    ) -> Self {
        Self::new(transcoder, &request.input_path, &request.output_path)
            .gain(gain_db)
            .bitrate(request.bitrate_kbps)
            .force_overwrite(request.force_overwrite)
            .dry_run(request.dry_run)
    }

    /// Set the gain in dB.
    pub fn gain(mut self, gain_db: f64) -> Self {
        self.gain_db = gain_db;
        self
    }

    /// Set the output audio bitrate in kbit/s.
    pub fn bitrate(mut self, kbps: u32) -> Self {
        self.bitrate_kbps = kbps;
        self
    }

    /// Replace an existing output file instead of skipping.
    pub fn force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    /// Build the command but do not run it.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Argument vector for the encode run.
    pub fn arguments(&self) -> Vec<OsString> {
        let mut arguments: Vec<OsString> = vec!["-y".into()];
        if let Some(level) = self.transcoder.log_level() {
            arguments.push("-loglevel".into());
            arguments.push(level.as_arg().into());
        }
        arguments.push("-nostdin".into());
        arguments.push("-i".into());
        arguments.push(self.input.as_os_str().to_owned());
        arguments.push("-c:v".into());
        arguments.push("copy".into());
        arguments.push("-filter:a".into());
        arguments.push(volume_filter(self.gain_db).into());
        arguments.push("-c:a".into());
        arguments.push(AUDIO_CODEC.into());
        arguments.push("-b:a".into());
        arguments.push(format!("{}k", self.bitrate_kbps).into());
        arguments.push("-strict".into());
        arguments.push("experimental".into());
        arguments.push(self.output.as_os_str().to_owned());
        arguments
    }

    /// Check the output location, then encode (or describe the encode).
    ///
    /// # Errors
    ///
    /// - [`NormalizeError::OutputExists`] if the output exists and
    ///   overwriting was not requested. Nothing is run or written.
    /// - [`NormalizeError::OutputIsInput`] if the output path names the
    ///   input file.
    /// - [`NormalizeError::EncodingInvocation`] if the transcoder cannot be
    ///   started or exits unsuccessfully.
    /// - [`NormalizeError::IoError`] if the output directory cannot be
    ///   created.
    pub fn run(&self) -> Result<ApplyOutcome, NormalizeError> {
        if self.output.exists() {
            if !self.force_overwrite {
                return Err(NormalizeError::OutputExists {
                    path: self.output.clone(),
                });
            }
            if same_file(&self.input, &self.output) {
                return Err(NormalizeError::OutputIsInput {
                    path: self.output.clone(),
                });
            }
        }

        let arguments = self.arguments();

        if self.dry_run {
            let command = self.transcoder.command_line(&arguments);
            log::info!("[dry run] {command}");
            return Ok(ApplyOutcome::DryRun {
                output: self.output.clone(),
                command,
            });
        }

        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                log::debug!("Creating output directory {}", parent.display());
                fs::create_dir_all(parent)?;
            }
        }

        log::info!(
            "Applying {} dB gain to {} -> {}",
            self.gain_db,
            self.input.display(),
            self.output.display()
        );
        let output = self.transcoder.run(&arguments).map_err(|error| {
            NormalizeError::EncodingInvocation {
                path: self.input.clone(),
                reason: error.to_string(),
            }
        })?;

        if !output.status.success() {
            return Err(NormalizeError::EncodingInvocation {
                path: self.input.clone(),
                reason: failure_reason(&output),
            });
        }

        Ok(ApplyOutcome::Written(self.output.clone()))
    }
}

/// Volume filter expression for `gain_db`, e.g. `volume=-6.5dB`.
///
/// Uses the shortest representation that round-trips, so the filter gets
/// the exact computed gain.
pub fn volume_filter(gain_db: f64) -> String {
    format!("volume={gain_db}dB")
}

fn same_file(first: &Path, second: &Path) -> bool {
    match (fs::canonicalize(first), fs::canonicalize(second)) {
        (Ok(first), Ok(second)) => first == second,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcoder::TranscoderLogLevel;

    #[test]
    fn encode_arguments_in_order() {
        let transcoder = Transcoder::with_program("ffmpeg");
        let applier = GainApplier::new(&transcoder, "in put.mov", "out/normalized_in put.mp4")
            .gain(-6.5)
            .bitrate(192);
        let arguments: Vec<String> = applier
            .arguments()
            .iter()
            .map(|argument| argument.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            arguments,
            vec![
                "-y",
                "-nostdin",
                "-i",
                "in put.mov",
                "-c:v",
                "copy",
                "-filter:a",
                "volume=-6.5dB",
                "-c:a",
                "aac",
                "-b:a",
                "192k",
                "-strict",
                "experimental",
                "out/normalized_in put.mp4",
            ]
        );
    }

    #[test]
    fn log_level_is_passed_through() {
        let transcoder = Transcoder::with_program("ffmpeg").with_log_level(TranscoderLogLevel::Error);
        let arguments = GainApplier::new(&transcoder, "a.mov", "b.mp4").arguments();
        assert_eq!(arguments[1], OsString::from("-loglevel"));
        assert_eq!(arguments[2], OsString::from("error"));
    }

    #[test]
    fn volume_filter_keeps_sign_and_precision() {
        assert_eq!(volume_filter(-6.0), "volume=-6dB");
        assert_eq!(volume_filter(2.25), "volume=2.25dB");
        assert_eq!(volume_filter(-26.0 - -23.4), format!("volume={}dB", -26.0 - -23.4));
    }

    #[test]
    fn from_request_copies_settings() {
        let transcoder = Transcoder::with_program("ffmpeg");
        let request = crate::config::NormalizeOptions::new()
            .with_bitrate(128)
            .with_dry_run(true)
            .request("clip.mov");
        let applier = GainApplier::from_request(&transcoder, &request, 3.0);

        assert_eq!(applier.bitrate_kbps, 128);
        assert!(applier.dry_run);
        assert_eq!(applier.gain_db, 3.0);
        assert_eq!(applier.output, PathBuf::from("./normalized_clip.mp4"));
    }
}
