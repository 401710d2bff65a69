//! Gain computation.
//!
//! Pure arithmetic: given a [`VolumeReport`] and a target level, work out the
//! uniform gain that moves the chosen metric onto the target and whether
//! that gain would push the peak past full scale.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::analysis::{VolumeMetric, VolumeReport};

/// Which measured level is moved onto the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizationMode {
    /// Match the mean (RMS) volume to the target. This is the default.
    #[default]
    Mean,
    /// Match the peak volume to the target.
    Peak,
}

impl NormalizationMode {
    /// The metric this mode reads from a [`VolumeReport`].
    pub fn metric(self) -> VolumeMetric {
        match self {
            NormalizationMode::Mean => VolumeMetric::Mean,
            NormalizationMode::Peak => VolumeMetric::Max,
        }
    }
}

impl Display for NormalizationMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            NormalizationMode::Mean => f.write_str("mean"),
            NormalizationMode::Peak => f.write_str("peak"),
        }
    }
}

/// Gain to apply to one file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustmentResult {
    /// Gain in dB; negative values attenuate.
    pub gain_db: f64,
    /// `true` when `peak_db + gain_db > 0`, i.e. the adjusted peak would
    /// exceed full scale.
    pub would_clip: bool,
}

impl AdjustmentResult {
    /// Compute the gain that moves the mode's metric onto `target_level_db`.
    ///
    /// # Example
    ///
    /// ```
    /// use volnorm::{AdjustmentResult, NormalizationMode, VolumeReport};
    ///
    /// let report = VolumeReport { mean_db: -20.0, peak_db: -3.0 };
    /// let adjustment = AdjustmentResult::compute(&report, -26.0, NormalizationMode::Mean);
    /// assert_eq!(adjustment.gain_db, -6.0);
    /// assert!(!adjustment.would_clip);
    /// ```
    pub fn compute(report: &VolumeReport, target_level_db: f64, mode: NormalizationMode) -> Self {
        let gain_db = target_level_db - report.level(mode.metric());
        Self {
            gain_db,
            would_clip: clipping_headroom(report.peak_db, gain_db) > 0.0,
        }
    }

    /// Peak level after the gain is applied.
    ///
    /// Positive values are the amount of clipping in dB.
    pub fn adjusted_peak_db(&self, report: &VolumeReport) -> f64 {
        clipping_headroom(report.peak_db, self.gain_db)
    }
}

fn clipping_headroom(peak_db: f64, gain_db: f64) -> f64 {
    peak_db + gain_db
}
