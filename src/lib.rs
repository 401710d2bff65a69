//! # volnorm
//!
//! Batch-normalize the audio loudness of media files with ffmpeg.
//!
//! `volnorm` measures each file's mean and peak audio level with ffmpeg's
//! `volumedetect` filter, computes the gain that moves the chosen level onto
//! a target, and asks ffmpeg to write a copy with that gain applied: video is
//! copied untouched, audio is re-encoded to AAC. All signal processing
//! happens inside the ffmpeg process; this crate builds the commands, parses
//! the analysis output and keeps track of results.
//!
//! ## Quick Start
//!
//! ### Normalize a Batch
//!
//! ```no_run
//! use volnorm::{NormalizeOptions, Normalizer, Transcoder};
//!
//! let options = NormalizeOptions::new()
//!     .with_target_level(-23.0)
//!     .with_output_dir("normalized");
//! let normalizer = Normalizer::new(Transcoder::locate()?, options);
//!
//! let report = normalizer.run(&["interview.mov", "b-roll.mp4"]);
//! print!("{report}");
//! # Ok::<(), volnorm::NormalizeError>(())
//! ```
//!
//! ### Measure Only
//!
//! ```no_run
//! use volnorm::{Transcoder, VolumeDetect, VolumeProbe};
//!
//! let probe = VolumeDetect::new(Transcoder::locate()?);
//! let volume = probe.probe("interview.mov".as_ref())?;
//! println!("mean {} dB, peak {} dB", volume.mean_db, volume.peak_db);
//! # Ok::<(), volnorm::NormalizeError>(())
//! ```
//!
//! ### Compute a Gain
//!
//! ```
//! use volnorm::{AdjustmentResult, NormalizationMode, VolumeReport};
//!
//! let volume = VolumeReport { mean_db: -20.0, peak_db: -3.0 };
//! let adjustment = AdjustmentResult::compute(&volume, -26.0, NormalizationMode::Mean);
//! assert_eq!(adjustment.gain_db, -6.0);
//! assert!(!adjustment.would_clip);
//! ```
//!
//! ## Features
//!
//! - **Mean or peak normalization** against any target level
//! - **Clipping detection**: flags gains that push the peak above 0 dB
//! - **Overwrite protection**: existing outputs are skipped unless forced
//! - **Dry runs**: build and print commands without touching the disk
//! - **Per-file error reporting**: one bad file does not stop the batch,
//!   unless strict mode is requested
//! - **Progress callbacks** for long batches
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `rayon` | `Normalizer::run_parallel()` processes files on a bounded thread pool |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! An `ffmpeg` binary with the `volumedetect` filter and an AAC encoder must
//! be installed, either on `PATH` or passed explicitly via
//! [`Transcoder::with_program`].

pub mod analysis;
pub mod apply;
pub mod config;
pub mod error;
pub mod gain;
pub mod inputs;
pub mod normalizer;
pub mod progress;
#[cfg(feature = "rayon")]
mod rayon;
pub mod report;
pub mod transcoder;

pub use analysis::{VolumeDetect, VolumeMetric, VolumeProbe, VolumeReport};
pub use apply::{ApplyOutcome, GainApplier};
pub use config::{NormalizationRequest, NormalizeOptions, derive_output_path};
pub use error::NormalizeError;
pub use gain::{AdjustmentResult, NormalizationMode};
pub use inputs::expand_inputs;
pub use normalizer::Normalizer;
pub use progress::{ProgressCallback, ProgressInfo};
pub use report::{BatchReport, FileOutcome, FileReport};
pub use transcoder::{Transcoder, TranscoderLogLevel};
