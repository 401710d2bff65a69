//! Volume analysis.
//!
//! This module provides [`VolumeReport`], the mean and peak levels of a
//! file's audio, and the [`VolumeProbe`] trait that produces it. The shipped
//! implementation, [`VolumeDetect`], runs ffmpeg's `volumedetect` filter and
//! scrapes its diagnostic text. That text is the only source of the values,
//! so the scraping stays behind the trait: callers only ever see a
//! [`VolumeReport`].
//!
//! # Example
//!
//! ```no_run
//! use volnorm::{Transcoder, VolumeDetect, VolumeProbe};
//!
//! let probe = VolumeDetect::new(Transcoder::locate()?);
//! let report = probe.probe("input.mp4".as_ref())?;
//! println!("mean {:.1} dB, peak {:.1} dB", report.mean_db, report.peak_db);
//! # Ok::<(), volnorm::NormalizeError>(())
//! ```

use std::ffi::OsString;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::NormalizeError;
use crate::transcoder::{Transcoder, merged_output};

static MEAN_VOLUME: LazyLock<Regex> = LazyLock::new(|| metric_pattern(VolumeMetric::Mean));
static MAX_VOLUME: LazyLock<Regex> = LazyLock::new(|| metric_pattern(VolumeMetric::Max));

/// One of the two values reported by `volumedetect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeMetric {
    /// Average level over the whole stream.
    Mean,
    /// Level of the loudest sample.
    Max,
}

impl VolumeMetric {
    /// The literal marker preceding the value in the analysis output.
    pub fn marker(self) -> &'static str {
        match self {
            VolumeMetric::Mean => "mean_volume:",
            VolumeMetric::Max => "max_volume:",
        }
    }
}

impl Display for VolumeMetric {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            VolumeMetric::Mean => f.write_str("mean"),
            VolumeMetric::Max => f.write_str("max"),
        }
    }
}

/// Measured audio levels of one file, in dB relative to full scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeReport {
    /// Mean (RMS) volume.
    pub mean_db: f64,
    /// Peak (maximum) volume.
    pub peak_db: f64,
}

impl VolumeReport {
    /// Extract both levels from `volumedetect` diagnostic text.
    ///
    /// The first occurrence of each marker wins. `source` is only used to
    /// label the error.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::AnalysisParse`] naming the first metric
    /// that has no parseable value.
    ///
    /// # Example
    ///
    /// ```
    /// use std::path::Path;
    ///
    /// use volnorm::VolumeReport;
    ///
    /// let text = "[Parsed_volumedetect_0 @ 0x1] mean_volume: -23.4 dB\n\
    ///             [Parsed_volumedetect_0 @ 0x1] max_volume: -5.1 dB\n";
    /// let report = VolumeReport::parse(text, Path::new("clip.mov"))?;
    /// assert_eq!(report.mean_db, -23.4);
    /// assert_eq!(report.peak_db, -5.1);
    /// # Ok::<(), volnorm::NormalizeError>(())
    /// ```
    pub fn parse(output: &str, source: &Path) -> Result<Self, NormalizeError> {
        let mean_db = first_value(&MEAN_VOLUME, output).ok_or_else(|| {
            NormalizeError::AnalysisParse {
                path: source.to_path_buf(),
                metric: VolumeMetric::Mean,
            }
        })?;
        let peak_db = first_value(&MAX_VOLUME, output).ok_or_else(|| {
            NormalizeError::AnalysisParse {
                path: source.to_path_buf(),
                metric: VolumeMetric::Max,
            }
        })?;
        Ok(Self { mean_db, peak_db })
    }

    /// The level of the requested metric.
    pub fn level(&self, metric: VolumeMetric) -> f64 {
        match metric {
            VolumeMetric::Mean => self.mean_db,
            VolumeMetric::Max => self.peak_db,
        }
    }
}

/// Source of [`VolumeReport`]s.
///
/// Implementations must be [`Send`] and [`Sync`] because the parallel batch
/// runner shares one probe across worker threads.
pub trait VolumeProbe: Send + Sync {
    /// Measure the audio levels of `input`.
    fn probe(&self, input: &Path) -> Result<VolumeReport, NormalizeError>;
}

/// [`VolumeProbe`] backed by ffmpeg's `volumedetect` filter.
///
/// Decodes the audio of the whole file into a null sink; video, subtitle
/// and data streams are disabled so only audio is decoded.
#[derive(Debug, Clone)]
pub struct VolumeDetect {
    transcoder: Transcoder,
}

impl VolumeDetect {
    /// Create a probe that runs `transcoder`.
    pub fn new(transcoder: Transcoder) -> Self {
        Self { transcoder }
    }

    /// Argument vector for the analysis run of `input`.
    pub fn arguments(input: &Path) -> Vec<OsString> {
        let mut arguments: Vec<OsString> = vec!["-hide_banner".into(), "-nostdin".into()];
        arguments.push("-i".into());
        arguments.push(input.as_os_str().to_owned());
        arguments.extend(
            ["-filter:a", "volumedetect", "-vn", "-sn", "-dn", "-f", "null", "-"]
                .into_iter()
                .map(OsString::from),
        );
        arguments
    }
}

impl VolumeProbe for VolumeDetect {
    fn probe(&self, input: &Path) -> Result<VolumeReport, NormalizeError> {
        log::debug!("Analyzing volume of {}", input.display());
        let output = self
            .transcoder
            .run(&Self::arguments(input))
            .map_err(|error| NormalizeError::AnalysisInvocation {
                path: input.to_path_buf(),
                reason: error.to_string(),
            })?;

        if !output.status.success() {
            // A failed run usually lacks the markers; parsing reports which.
            log::debug!(
                "Volume analysis of {} exited with {}",
                input.display(),
                output.status
            );
        }

        let report = VolumeReport::parse(&merged_output(&output), input)?;
        log::debug!(
            "mean volume: {} dB, max volume: {} dB",
            report.mean_db,
            report.peak_db
        );
        Ok(report)
    }
}

fn metric_pattern(metric: VolumeMetric) -> Regex {
    let pattern = format!(
        r"{}\s*([-+]?(?:\d+\.?\d*|\.\d+))\s*dB",
        regex::escape(metric.marker())
    );
    Regex::new(&pattern).expect("volume pattern is a valid regex")
}

fn first_value(pattern: &Regex, output: &str) -> Option<f64> {
    pattern
        .captures(output)
        .and_then(|captures| captures.get(1))
        .and_then(|value| value.as_str().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_OUTPUT: &str = "\
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'clip.mov':
  Duration: 00:00:05.00, start: 0.000000, bitrate: 1193 kb/s
[Parsed_volumedetect_0 @ 0x600000c6c000] n_samples: 441000
[Parsed_volumedetect_0 @ 0x600000c6c000] mean_volume: -23.4 dB
[Parsed_volumedetect_0 @ 0x600000c6c000] max_volume: -5.1 dB
[Parsed_volumedetect_0 @ 0x600000c6c000] histogram_5db: 12
";

    #[test]
    fn parse_sample_output() {
        let report = VolumeReport::parse(SAMPLE_OUTPUT, Path::new("clip.mov")).unwrap();
        assert_eq!(
            report,
            VolumeReport {
                mean_db: -23.4,
                peak_db: -5.1
            }
        );
    }

    #[test]
    fn missing_max_volume() {
        let text = "[Parsed_volumedetect_0 @ 0x1] mean_volume: -23.4 dB\n";
        let error = VolumeReport::parse(text, Path::new("clip.mov")).unwrap_err();
        assert!(matches!(
            error,
            NormalizeError::AnalysisParse {
                metric: VolumeMetric::Max,
                ..
            }
        ));
    }

    #[test]
    fn missing_mean_volume_reported_first() {
        let error = VolumeReport::parse("nothing useful", Path::new("clip.mov")).unwrap_err();
        assert!(matches!(
            error,
            NormalizeError::AnalysisParse {
                metric: VolumeMetric::Mean,
                ..
            }
        ));
    }

    #[test]
    fn first_match_wins() {
        let text = "mean_volume: -10.0 dB\nmax_volume: -1.0 dB\nmean_volume: -30.0 dB\nmax_volume: -9.0 dB\n";
        let report = VolumeReport::parse(text, Path::new("a.mp4")).unwrap();
        assert_eq!(report.mean_db, -10.0);
        assert_eq!(report.peak_db, -1.0);
    }

    #[test]
    fn number_forms() {
        let text = "mean_volume: -.5 dB max_volume: +0 dB";
        let report = VolumeReport::parse(text, Path::new("a.mp4")).unwrap();
        assert_eq!(report.mean_db, -0.5);
        assert_eq!(report.peak_db, 0.0);

        let text = "mean_volume: 3 dB max_volume: 12. dB";
        let report = VolumeReport::parse(text, Path::new("a.mp4")).unwrap();
        assert_eq!(report.mean_db, 3.0);
        assert_eq!(report.peak_db, 12.0);
    }

    #[test]
    fn silent_stream_is_not_parseable() {
        let text = "mean_volume: -inf dB\nmax_volume: -inf dB\n";
        assert!(VolumeReport::parse(text, Path::new("silence.wav")).is_err());
    }

    #[test]
    fn analysis_arguments_keep_path_whole() {
        let arguments = VolumeDetect::arguments(Path::new("/media/my clip.mov"));
        let input_index = arguments.iter().position(|a| a == "-i").unwrap();
        assert_eq!(arguments[input_index + 1], OsString::from("/media/my clip.mov"));
        assert!(arguments.iter().any(|a| a == "volumedetect"));
        assert_eq!(arguments.last(), Some(&OsString::from("-")));
    }

    #[test]
    fn level_selects_metric() {
        let report = VolumeReport {
            mean_db: -20.0,
            peak_db: -3.0,
        };
        assert_eq!(report.level(VolumeMetric::Mean), -20.0);
        assert_eq!(report.level(VolumeMetric::Max), -3.0);
    }
}
